//! The `analyse` subcommand: identify the species of a prepared sample.

use crate::config::{self, Config};
use crate::context::Context;
use crate::database::{BUILD_CONFIG, FETCH_CONFIG};
use crate::sample::{Layout, SAMPLE_CONFIG};
use crate::utils;
use crate::workflow::{self, Run, RunArgs, WorkflowEngine};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, ContextCompat, Report, Result};
use color_eyre::Help;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::Display;

pub const SNAKEFILE: &str = "Snakefile";

/// Posterior probability thresholds the workflow provides results for.
pub const READ_PROBABILITY_THRESHOLDS: [f64; 3] = [0.5, 0.75, 0.95];

/// Analysis step to run up to.
#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Filter the reads against the whole database.
    Filter,
    /// Align the filtered reads to the candidate genomes.
    Align,
    /// Likelihoods of each read belonging to each taxon.
    Likelihoods,
    /// Posterior probabilities of each read belonging to each taxon.
    Probabilities,
    /// Mean posterior abundances of each taxon.
    Abundances,
    /// Reads assigned to each taxon.
    Reads,
    /// Damage patterns of the assigned reads.
    Mapdamage,
}

impl Mode {
    /// Target of the mode, for a sample `prefix` and the `output_dir` of the analysis.
    pub fn target(&self, output_dir: &Path, prefix: &str, layout: Layout) -> PathBuf {
        let probabilities = output_dir.join("probabilities").join(prefix);
        match self {
            Mode::Filter => match layout {
                Layout::PairedModern => output_dir.join("fastq/PE").join(format!("{prefix}_mapq_pair.readlen")),
                _ => output_dir.join("fastq/SE").join(format!("{prefix}_mapq.readlen")),
            },
            Mode::Align => output_dir.join("sigma").join(format!("{prefix}_alignments.done")),
            Mode::Likelihoods => probabilities.join(format!("{prefix}_likelihood_ts_tv_matrix.csv")),
            Mode::Probabilities => probabilities.join(format!("{prefix}_posterior_probabilities.tsv")),
            Mode::Abundances => probabilities.join(format!("{prefix}_posterior_abundance.tsv")),
            Mode::Reads => output_dir.join("dirichlet_reads").join(format!("{prefix}_dirichlet_reads.done")),
            Mode::Mapdamage => output_dir.join("mapdamage").join(format!("{prefix}_mapdamage.done")),
        }
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value.parse().map_err(|e| format!("{e}"))?;
    match READ_PROBABILITY_THRESHOLDS.contains(&threshold) {
        true => Ok(threshold),
        false => Err(format!("must be one of {READ_PROBABILITY_THRESHOLDS:?}")),
    }
}

/// Analyse a sample.
#[derive(Clone, Debug, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Analysis mode for the selected sample.
    #[clap(short = 'm', long, value_enum, required = true)]
    #[clap(hide_possible_values = false)]
    pub mode: Mode,

    /// Path to the database output directory.
    #[clap(short = 'D', long, required = true)]
    pub database: PathBuf,

    /// Path to the sample output directory.
    #[clap(short = 'S', long, required = true)]
    pub sample: PathBuf,

    /// Genera the abundances should be calculated on.
    #[clap(short = 'g', long, num_args = 1..)]
    pub genera: Option<Vec<String>>,

    /// Path to the results directory.
    #[clap(short = 'o', long = "output", required = true)]
    pub analysis_output_dir: PathBuf,

    /// Posterior probability threshold for a read to belong to a certain species.
    ///
    /// Choose from 0.5, 0.75 and 0.95 (default: 0.75).
    #[clap(short = 'T', long, value_parser = parse_threshold)]
    pub read_probability_threshold: Option<f64>,

    #[clap(flatten)]
    #[serde(flatten)]
    pub run: RunArgs,
}

/// The configuration persisted by the database, which must have been built exactly once.
pub fn read_database_config(database: &Path) -> Result<Config, Report> {
    let fetch_yaml = database.join(FETCH_CONFIG);
    let build_yaml = database.join(BUILD_CONFIG);

    match (fetch_yaml.exists(), build_yaml.exists()) {
        (true, false) => Config::read(&fetch_yaml),
        (false, true) => Config::read(&build_yaml),
        (true, true) => Err(eyre!("The database has not been built correctly: {database:?}"))
            .suggestion("Please rebuild the database."),
        (false, false) => Err(eyre!("The database has not been built correctly or at all: {database:?}"))
            .suggestion("Please (re)build the database with `haystack database`."),
    }
}

/// Check the arguments and resolve the workflow run of an analysis.
pub fn plan(args: &Args, context: &Context) -> Result<Run, Report> {
    info!("The selected mode for sample analysis is {}", args.mode);

    let snakefile = context.snakefile(SNAKEFILE)?;

    let base = config::resolve_user(context)?;

    let mut args = args.clone();
    args.database = context.resolve(&args.database);
    args.sample = context.resolve(&args.sample);

    if !args.database.exists() {
        return Err(eyre!("The path you provided for the database output directory is not valid: {:?}", args.database))
            .suggestion("Please provide a valid path to --database.");
    }
    if !args.sample.exists() {
        return Err(eyre!("The path you provided for the sample output directory is not valid: {:?}", args.sample))
            .suggestion("Please provide a valid path to --sample.");
    }

    let database = read_database_config(&args.database)?;
    let sample_yaml = args.sample.join(SAMPLE_CONFIG);
    if !sample_yaml.exists() {
        return Err(eyre!("The sample config does not exist: {sample_yaml:?}"))
            .suggestion("Please make sure that the sample path is right, and that `haystack sample` was run first.");
    }
    let sample = Config::read(&sample_yaml)?;

    args.analysis_output_dir = context.resolve(&args.analysis_output_dir);
    utils::check_output_dir(&args.analysis_output_dir, "analysis output", 1)?;
    let output_dir = args.analysis_output_dir.clone();

    let flags = Config::from_serialize(&args)?;
    let mut resolved = Config::merge(&[&base, &database, &sample, &flags]);
    resolved.resolve_paths(context);

    let prefix = resolved
        .get_str("sample_prefix")
        .wrap_err_with(|| format!("The sample config has no sample prefix: {sample_yaml:?}"))?
        .to_string();
    let layout = Layout::from_config(&resolved)
        .wrap_err_with(|| format!("The sample config has no read layout: {sample_yaml:?}"))
        .suggestion("Please rerun `haystack sample` in a new output directory.")?;

    let targets = vec![args.mode.target(&output_dir, &prefix, layout)];

    resolved
        .non_default(&base)
        .write_new(output_dir.join(format!("{prefix}_config.yaml")))?;
    resolved.insert("workflow_dir", &context.workflow_dir)?;

    Ok(Run {
        snakefile,
        config: resolved,
        targets,
        user_options: flags.non_default(&base),
        args: args.run,
    })
}

/// Analyse a sample.
pub fn run<E: WorkflowEngine>(args: &Args, context: &Context, engine: &E) -> Result<(), Report> {
    let run = plan(args, context)?;
    workflow::launch(engine, &run)
}
