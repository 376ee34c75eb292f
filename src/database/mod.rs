//! The `database` subcommand: build the reference database of genomes.
//!
//! A database is either built in one go (`--mode build`), or in two steps so
//! that the sequences can be inspected before indexing (`--mode fetch`, then
//! `--mode index`). The configuration of the first step is persisted in the
//! database directory, and later read by `index` and by `haystack analyse`.

use crate::config::{self, Config};
use crate::context::Context;
use crate::utils;
use crate::workflow::{self, Run, RunArgs, WorkflowEngine};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use indoc::formatdoc;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot written by `--mode fetch`.
pub const FETCH_CONFIG: &str = "database_fetch_config.yaml";

/// Snapshot written by `--mode build`.
pub const BUILD_CONFIG: &str = "database_build_config.yaml";

pub const SNAKEFILE: &str = "Snakefile_db";

// ----------------------------------------------------------------------------
// Arguments
// ----------------------------------------------------------------------------

/// How much of the database to build.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Download the database sequences only.
    Fetch,
    /// Index the sequences of a previous fetch.
    Index,
    /// Fetch and index.
    #[default]
    Build,
}

/// Taxonomic rank at which reads are assigned.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Genus,
    Species,
    Subspecies,
    Serotype,
}

/// Build a database of target species.
#[derive(Clone, Debug, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Database creation mode.
    #[clap(short = 'm', long, value_enum, default_value_t = Mode::default())]
    #[clap(hide_possible_values = false)]
    pub mode: Mode,

    /// Path to the database output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[clap(short = 'o', long = "output", required = true)]
    pub db_output: PathBuf,

    /// Use the prokaryotic representative species of the RefSeq DB for the species id.
    ///
    /// Cannot be used with --mtDNA.
    #[clap(short = 'R', long)]
    pub refseq_rep: bool,

    /// Use only mitochondrial DNA sequences for eukaryotic species.
    ///
    /// Cannot be used with --refseq-rep or queries for prokaryotes.
    #[clap(long = "mtDNA")]
    #[serde(rename = "mtDNA")]
    pub mtdna: bool,

    /// Actual NCBI query in the NCBI query language.
    #[clap(short = 'q', long)]
    pub query: Option<String>,

    /// File containing an NCBI query in the NCBI query language.
    #[clap(short = 'Q', long)]
    pub query_file: Option<PathBuf>,

    /// Taxonomic rank to perform the identifications on (default: species).
    #[clap(short = 'r', long, value_enum)]
    pub rank: Option<Rank>,

    /// Tab delimited file with sequences to be added to the database: <taxon> <path>.
    #[clap(short = 's', long)]
    pub sequences: Option<PathBuf>,

    /// Tab delimited file with accessions to be added to the database: <taxon> <accession>.
    #[clap(short = 'a', long)]
    pub accessions: Option<PathBuf>,

    /// Seed for the randomization of the genomes that each index chunk will include (default: 1).
    #[clap(short = 'S', long)]
    pub seed: Option<u64>,

    /// Genera to restrict the abundance calculations to.
    #[clap(short = 'g', long, num_args = 1..)]
    pub genera: Option<Vec<String>>,

    #[clap(flatten)]
    #[serde(flatten)]
    pub run: RunArgs,
}

// ----------------------------------------------------------------------------
// Plan
// ----------------------------------------------------------------------------

/// Check the arguments and resolve the workflow run of a database.
pub fn plan(args: &Args, context: &Context) -> Result<Run, Report> {
    let snakefile = context.snakefile(SNAKEFILE)?;

    let defaults = Config::defaults()?;
    let user = config::read_user(context)?;

    if !args.refseq_rep
        && args.query.is_none()
        && args.query_file.is_none()
        && args.accessions.is_none()
        && args.sequences.is_none()
    {
        return Err(eyre!("No source was given for the database sequences.")).suggestion(
            "Please provide at least one of --query, --query-file, --refseq-rep, --accessions or --sequences.",
        );
    }
    if args.mtdna && args.refseq_rep {
        return Err(eyre!("--mtDNA and --refseq-rep are mutually exclusive.")).suggestion(formatdoc!(
            "Either pick --refseq-rep for prokaryotic related queries,
             or pick --mtDNA for eukaryotic related queries."
        ));
    }
    if args.query.is_some() && args.query_file.is_some() {
        return Err(eyre!("You cannot provide both a query and a query file."))
            .suggestion("Please choose only one option, and provide only its respective flag.");
    }

    let mut args = args.clone();
    args.db_output = context.resolve(&args.db_output);
    utils::check_output_dir(&args.db_output, "database output", 1)?;

    if let Some(path) = &args.query_file {
        let path = context.resolve(path);
        args.query = Some(read_query(&path)?);
        args.query_file = Some(path);
    }
    for (flag, path) in [("--sequences", &mut args.sequences), ("--accessions", &mut args.accessions)] {
        if let Some(p) = path {
            *p = context.resolve(&*p);
            utils::check_input_file(&*p, flag)?;
        }
    }

    let flags = Config::from_serialize(&args)?;
    let mut resolved = Config::merge(&[&defaults, &user, &flags]);
    resolved.resolve_paths(context);

    let db = &args.db_output;
    let fetch_yaml = db.join(FETCH_CONFIG);
    let mut targets = Vec::new();

    match args.mode {
        Mode::Fetch => {
            let bowtie = db.join("bowtie");
            let sources = [
                (args.query.is_some(), "entrez_query.fasta.gz"),
                (args.refseq_rep, "refseq_prok.fasta.gz"),
                (args.sequences.is_some(), "custom_seqs.fasta.gz"),
                (args.accessions.is_some(), "custom_acc.fasta.gz"),
            ];
            targets.extend(sources.into_iter().filter(|(on, _)| *on).map(|(_, file)| bowtie.join(file)));

            resolved.write_new(&fetch_yaml)?;
            info!("Please run `haystack database --mode index` after this step.");
        }
        Mode::Index => {
            targets.push(db.join("bowtie").join("bowtie_index.done"));

            if !fetch_yaml.exists() {
                return Err(eyre!("No fetched database was found at {db:?}"))
                    .suggestion("Please run `haystack database --mode fetch` first, and then index the database.");
            }
            // the fetched configuration describes the database, this run only adds engine options
            resolved = Config::read(&fetch_yaml)?;
            resolved.resolve_paths(context);
            resolved.update(&Config::from_serialize(&args.run)?);
            resolved.insert("mode", args.mode)?;
        }
        Mode::Build => {
            targets.push(db.join("idx_database.done"));
            targets.push(db.join("bowtie").join("bowtie_index.done"));

            if fetch_yaml.exists() {
                return Err(eyre!("The database at {db:?} was already fetched.")).suggestion(
                    "You can not run `--mode build` after `--mode fetch`. Run `--mode index` instead.",
                );
            }
            resolved.write_new(db.join(BUILD_CONFIG))?;
        }
    }

    // the workflow expects a lowercase string
    let mtdna = resolved.get_bool("mtDNA").unwrap_or(false);
    resolved.insert("mtDNA", mtdna.to_string())?;
    resolved.insert("workflow_dir", &context.workflow_dir)?;

    Ok(Run {
        snakefile,
        config: resolved,
        targets,
        user_options: flags.non_default(&defaults),
        args: args.run,
    })
}

/// Read a query from a file, which must not be empty.
fn read_query(path: &Path) -> Result<String, Report> {
    let query = std::fs::read_to_string(path)
        .wrap_err_with(|| eyre!("Failed to read the query file: {path:?}"))
        .suggestion("Please provide a valid path to --query-file.")?;
    let query = query.trim();
    if query.is_empty() {
        return Err(eyre!("The query file you provided was empty: {path:?}"))
            .suggestion("Please provide a file with a valid query.");
    }
    Ok(query.to_string())
}

/// Build a database.
pub fn run<E: WorkflowEngine>(args: &Args, context: &Context, engine: &E) -> Result<(), Report> {
    info!("Building database: {:?}", args.db_output);
    let run = plan(args, context)?;
    workflow::launch(engine, &run)
}

#[cfg(test)]
mod tests {
    use super::{plan, run, Args, BUILD_CONFIG, FETCH_CONFIG};
    use crate::config::Config;
    use crate::tests::{configured, touch, unconfigured};
    use crate::workflow::Recorder;
    use clap::Parser;
    use serde_yaml::Value;
    use std::path::PathBuf;

    fn args(flags: &[&str]) -> Args {
        let argv = ["database", "--cores", "2"].iter().chain(flags);
        Args::parse_from(argv)
    }

    #[test]
    fn build_targets() {
        let (tmp, context) = configured();
        let run = plan(&args(&["-o", "db", "-q", "Yersinia[Organism]"]), &context).unwrap();

        let db = tmp.path().join("db");
        assert_eq!(run.targets, vec![db.join("idx_database.done"), db.join("bowtie/bowtie_index.done")]);
        assert_eq!(run.snakefile, context.workflow_dir.join("Snakefile_db"));
        assert_eq!(run.config.get_str("mtDNA"), Some("false"));
        assert_eq!(run.config.get_str("query"), Some("Yersinia[Organism]"));
        assert_eq!(run.config.get_str("email"), Some("someone@example.org"));
        assert_eq!(run.config.get_str("rank"), Some("species"));
        assert_eq!(run.config.get_str("mode"), Some("build"));
        assert!(run.config.get("workflow_dir").is_some());
        assert_eq!(run.args.cores, 2);

        let snapshot = Config::read(db.join(BUILD_CONFIG)).unwrap();
        assert_eq!(snapshot.get("batchsize"), Some(&Value::from(10)));
        assert_eq!(snapshot.get_bool("mtDNA"), Some(false));
        assert!(!db.join(FETCH_CONFIG).exists());

        assert_eq!(run.user_options.get_str("query"), Some("Yersinia[Organism]"));
        assert!(!run.user_options.contains_key("rank"));
    }

    #[test]
    fn fetch_then_index() {
        let (tmp, context) = configured();
        let sequences = touch(&context, "seqs.tsv");
        let flags = ["-m", "fetch", "-o", "db", "-R", "-s", "seqs.tsv", "-a", "/missing.tsv"];
        assert!(plan(&args(&flags), &context).is_err());

        let accessions = touch(&context, "acc.tsv");
        let flags = ["-m", "fetch", "-o", "db", "-R", "-s", "seqs.tsv", "-a", "acc.tsv", "-r", "genus"];
        let run = plan(&args(&flags), &context).unwrap();

        let bowtie = tmp.path().join("db/bowtie");
        let expected: Vec<PathBuf> = ["refseq_prok", "custom_seqs", "custom_acc"]
            .iter()
            .map(|name| bowtie.join(format!("{name}.fasta.gz")))
            .collect();
        assert_eq!(run.targets, expected);
        assert_eq!(run.config.get_str("sequences").map(PathBuf::from), Some(sequences));
        assert_eq!(run.config.get_str("accessions").map(PathBuf::from), Some(accessions));
        assert!(tmp.path().join("db").join(FETCH_CONFIG).exists());

        // building over a fetched database is not allowed
        assert!(plan(&args(&["-m", "build", "-o", "db", "-R"]), &context).is_err());

        // indexing reuses the fetched configuration
        let run = plan(&args(&["-m", "index", "-o", "db", "-R", "-r", "species", "--dry-run"]), &context).unwrap();
        assert_eq!(run.targets, vec![bowtie.join("bowtie_index.done")]);
        assert_eq!(run.config.get_str("rank"), Some("genus"));
        assert_eq!(run.config.get_str("mode"), Some("index"));
        assert_eq!(run.config.get_bool("dry_run"), Some(true));
        assert!(run.args.dry_run);
    }

    #[test]
    fn genome_cache_is_absolute() {
        let (_tmp, context) = configured();
        let run = plan(&args(&["-m", "fetch", "-o", "db", "-R"]), &context).unwrap();
        let expected = context.home.join("haystack_genomes");
        assert_eq!(run.config.get_str("genome_cache_folder").map(PathBuf::from), Some(expected.clone()));

        // a fetch snapshot written with the raw path is expanded again by index
        let snapshot = context.home.join("db").join(FETCH_CONFIG);
        let mut fetched = Config::read(&snapshot).unwrap();
        fetched.insert("genome_cache_folder", "~/haystack_genomes").unwrap();
        fetched.write(&snapshot).unwrap();
        let run = plan(&args(&["-m", "index", "-o", "db", "-R"]), &context).unwrap();
        assert_eq!(run.config.get_str("genome_cache_folder").map(PathBuf::from), Some(expected));
    }

    #[test]
    fn index_requires_fetch() {
        let (_tmp, context) = configured();
        assert!(plan(&args(&["-m", "index", "-o", "db", "-R"]), &context).is_err());
    }

    #[test]
    fn mtdna_exported_as_string() {
        let (_tmp, context) = configured();
        let run = plan(&args(&["-o", "db", "-q", "Homo sapiens[Organism]", "--mtDNA"]), &context).unwrap();
        assert_eq!(run.config.get("mtDNA"), Some(&Value::from("true")));
    }

    #[test]
    fn query_file() {
        let (_tmp, context) = configured();
        std::fs::write(context.home.join("query.txt"), "  Yersinia[Organism]\n\n").unwrap();
        let run = plan(&args(&["-o", "db", "-Q", "query.txt"]), &context).unwrap();
        assert_eq!(run.config.get_str("query"), Some("Yersinia[Organism]"));

        std::fs::write(context.home.join("empty.txt"), " \n").unwrap();
        assert!(plan(&args(&["-o", "db", "-Q", "empty.txt"]), &context).is_err());
        assert!(plan(&args(&["-o", "db", "-Q", "missing.txt"]), &context).is_err());
    }

    #[test]
    fn conflicting_flags() {
        let (_tmp, context) = configured();
        for flags in [
            vec!["-o", "db"],
            vec!["-o", "db", "-R", "--mtDNA"],
            vec!["-o", "db", "-q", "Yersinia", "-Q", "query.txt"],
            vec!["-o", "missing/parent/db", "-R"],
        ] {
            assert!(plan(&args(&flags), &context).is_err(), "{flags:?}");
        }
    }

    #[test]
    fn requires_user_config() {
        let (_tmp, context) = unconfigured();
        assert!(plan(&args(&["-o", "db", "-R"]), &context).is_err());
    }

    #[test]
    fn run_launches_engine() {
        let (_tmp, context) = configured();
        let engine = Recorder::default();
        run(&args(&["-o", "db", "-R"]), &context, &engine).unwrap();
        assert_eq!(engine.runs.borrow().len(), 1);

        let engine = Recorder { fail: true, ..Default::default() };
        assert!(run(&args(&["-o", "db2", "-R"]), &context, &engine).is_err());
    }
}
