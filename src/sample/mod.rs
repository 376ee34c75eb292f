//! The `sample` subcommand: prepare the reads of a sample for analysis.

use crate::config::{self, Config};
use crate::context::Context;
use crate::utils;
use crate::workflow::{self, Run, RunArgs, WorkflowEngine};
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use haystack_entrez::{sra_is_paired, Client, Eutils};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use strum::{EnumIter, IntoEnumIterator};

/// Snapshot of the sample configuration, read by `haystack analyse`.
pub const SAMPLE_CONFIG: &str = "sample_config.yaml";

pub const SNAKEFILE: &str = "Snakefile_sample";

// ----------------------------------------------------------------------------
// Layout
// ----------------------------------------------------------------------------

/// How the reads of a sample were sequenced.
#[derive(Clone, Copy, Debug, EnumIter, PartialEq)]
pub enum Layout {
    /// Paired-end reads that are collapsed into single reads.
    PairedAncient,
    /// Paired-end reads, analysed as pairs.
    PairedModern,
    /// Single-end reads.
    Single,
}

impl Layout {
    /// Paired-end layout, depending on whether the mates are collapsed.
    pub fn paired(collapse: bool) -> Self {
        match collapse {
            true => Layout::PairedAncient,
            false => Layout::PairedModern,
        }
    }

    /// The config key that flags this layout in the workflow.
    pub fn key(&self) -> &'static str {
        match self {
            Layout::PairedAncient => "PE_ANCIENT",
            Layout::PairedModern => "PE_MODERN",
            Layout::Single => "SE",
        }
    }

    /// Layout recorded in a resolved config.
    pub fn from_config(config: &Config) -> Option<Self> {
        Layout::iter().find(|layout| config.get_bool(layout.key()) == Some(true))
    }

    /// Trimmed reads produced by the sample workflow.
    pub fn trimmed_reads(&self, output_dir: &Path, prefix: &str) -> PathBuf {
        let inputs = output_dir.join("fastq_inputs");
        match self {
            Layout::PairedModern => inputs.join("PE_mod").join(format!("{prefix}_R1_adRm.fastq.gz")),
            Layout::PairedAncient => inputs.join("PE_anc").join(format!("{prefix}_adRm.fastq.gz")),
            Layout::Single => inputs.join("SE").join(format!("{prefix}_adRm.fastq.gz")),
        }
    }
}

// ----------------------------------------------------------------------------
// Arguments
// ----------------------------------------------------------------------------

/// Prepare a sample for analysis.
#[derive(Clone, Debug, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Sample prefix for all the future analysis.
    ///
    /// Optional if an SRA accession is provided instead.
    #[clap(short = 'p', long)]
    pub sample_prefix: Option<String>,

    /// Path to the directory where all the sample related outputs are going to be stored.
    ///
    /// If the directory does not exist, it will be created.
    #[clap(short = 'o', long = "output", required = true)]
    pub sample_output_dir: PathBuf,

    /// Path to the fastq input file. Can be raw or with adapters removed.
    #[clap(short = 'f', long)]
    pub fastq: Option<PathBuf>,

    /// Path to the mate 1 fastq input file, if reads are paired-end.
    #[clap(long)]
    pub fastq_r1: Option<PathBuf>,

    /// Path to the mate 2 fastq input file, if reads are paired-end.
    #[clap(long)]
    pub fastq_r2: Option<PathBuf>,

    /// Fetch raw data files from the SRA using the provided accession code.
    #[clap(long)]
    pub sra: Option<String>,

    /// Collapse paired-end reads.
    #[clap(short = 'C', long)]
    pub collapse: bool,

    /// Do not remove adapters from raw fastq files.
    #[clap(short = 'T', long)]
    pub not_trim_adapters: bool,

    /// Additional flags to provide to AdapterRemoval.
    #[clap(long, allow_hyphen_values = true)]
    pub adapterremoval_flags: Option<String>,

    #[clap(flatten)]
    #[serde(flatten)]
    pub run: RunArgs,
}

// ----------------------------------------------------------------------------
// Plan
// ----------------------------------------------------------------------------

/// Check the arguments and resolve the workflow run of a sample.
///
/// The library layout of an SRA accession is looked up with `client`.
pub async fn plan<E: Eutils>(args: &Args, context: &Context, client: &E) -> Result<Run, Report> {
    let snakefile = context.snakefile(SNAKEFILE)?;

    let base = config::resolve_user(context)?;

    let mut args = args.clone();

    let mut layout = match (&args.fastq, &args.fastq_r1, &args.fastq_r2) {
        (None, None, None) => None,
        (Some(_), None, None) => Some(Layout::Single),
        (None, Some(_), Some(_)) => Some(Layout::paired(args.collapse)),
        (Some(_), _, _) => {
            return Err(eyre!("Please use a correct combination of paired-end or single-end reads."))
                .suggestion("Provide either --fastq, or both --fastq-r1 and --fastq-r2.")
        }
        (None, _, _) => {
            return Err(eyre!("Only one mate of the paired-end reads was provided."))
                .suggestion("Please provide both --fastq-r1 and --fastq-r2.")
        }
    };
    if layout.is_some() && args.sra.is_some() {
        return Err(eyre!("Fastq files and an SRA accession were both provided."))
            .suggestion("Please provide either local fastq files or --sra.");
    }
    for (flag, path) in [
        ("--fastq", &mut args.fastq),
        ("--fastq-r1", &mut args.fastq_r1),
        ("--fastq-r2", &mut args.fastq_r2),
    ] {
        if let Some(p) = path {
            *p = context.resolve(&*p);
            utils::check_input_file(&*p, flag)?;
        }
    }

    let prefix = match (&args.sra, &args.sample_prefix) {
        (Some(accession), _) => accession.clone(),
        (None, Some(prefix)) if !prefix.trim().is_empty() => prefix.trim().to_string(),
        (None, _) => {
            return Err(eyre!("No sample prefix was provided."))
                .suggestion("Please provide a prefix name (--sample-prefix) for the sample you want to analyse.")
        }
    };
    args.sample_prefix = Some(prefix.clone());

    args.sample_output_dir = context.resolve(&args.sample_output_dir);
    utils::check_output_dir(&args.sample_output_dir, "sample output", 2)?;
    let output_dir = args.sample_output_dir.clone();

    if let Some(accession) = &args.sra {
        info!("Checking the library layout of {accession}.");
        let paired = sra_is_paired(client, accession)
            .await
            .wrap_err_with(|| eyre!("Failed to look up the SRA accession: {accession}"))?;

        let sra_data = output_dir.join("sra_data");
        if paired {
            layout = Some(Layout::paired(args.collapse));
            args.fastq_r1 = Some(sra_data.join("PE").join(format!("{accession}_R1.fastq.gz")));
            args.fastq_r2 = Some(sra_data.join("PE").join(format!("{accession}_R2.fastq.gz")));
        } else {
            layout = Some(Layout::Single);
            args.fastq = Some(sra_data.join("SE").join(format!("{accession}.fastq.gz")));
        }
    }

    let layout = layout
        .ok_or_else(|| eyre!("No reads were provided for the sample."))
        .suggestion("Please provide --fastq, --fastq-r1 and --fastq-r2, or --sra.")?;
    if layout == Layout::Single && args.collapse {
        return Err(eyre!("You cannot collapse single-end reads."))
            .suggestion("Please remove the --collapse flag, or provide paired-end reads.");
    }

    let mut targets = vec![output_dir.join("fastq_inputs").join("meta").join(format!("{prefix}.size"))];
    let trim_adapters = !args.not_trim_adapters;
    if trim_adapters {
        targets.push(layout.trimmed_reads(&output_dir, &prefix));
    }

    let flags = Config::from_serialize(&args)?;
    let mut resolved = Config::merge(&[&base, &flags]);
    for other in Layout::iter() {
        resolved.insert(other.key(), other == layout)?;
    }
    resolved.insert("trim_adapters", trim_adapters)?;

    resolved.non_default(&base).write_new(output_dir.join(SAMPLE_CONFIG))?;
    resolved.insert("workflow_dir", &context.workflow_dir)?;

    Ok(Run {
        snakefile,
        config: resolved,
        targets,
        user_options: flags.non_default(&base),
        args: args.run,
    })
}

/// Prepare a sample.
pub async fn run<E: WorkflowEngine>(args: &Args, context: &Context, engine: &E) -> Result<(), Report> {
    let user = config::resolve_user(context)?;
    let client = Client::new(user.get_str("email").unwrap_or_default())?;

    let run = plan(args, context, &client).await?;
    workflow::launch(engine, &run)
}
