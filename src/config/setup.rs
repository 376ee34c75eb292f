//! The `config` subcommand: create or update the user preferences.

use crate::config::{Config, UserConfig};
use crate::context::Context;
use clap::{builder::BoolishValueParser, ArgAction, Parser};
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use indoc::formatdoc;
use log::info;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// Advanced options for the haystack configuration.
///
/// Without options, every preference is asked interactively.
#[derive(Clone, Debug, Default, Deserialize, Parser, PartialEq, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Email address for NCBI identification.
    #[clap(short = 'e', long)]
    pub email: Option<String>,

    /// Path where all the genomes that are downloaded and/or used by haystack are stored.
    ///
    /// Default: ~/haystack_genomes
    #[clap(long)]
    pub genome_cache_folder: Option<String>,

    /// Batchsize for fetching records from NCBI (default: 5).
    #[clap(short = 'b', long)]
    pub batchsize: Option<u64>,

    /// Base mismatch probability (default: 0.05).
    #[clap(long)]
    pub mismatch_probability: Option<f64>,

    /// Threads for the bowtie2 alignments (default: 1).
    #[clap(short = 't', long)]
    pub bowtie2_threads: Option<u64>,

    /// Factor to rescale/chunk the input file for the multifasta index of the filtering alignment (default: 2.5).
    #[clap(short = 's', long)]
    pub bowtie2_scaling: Option<f64>,

    /// Use conda as a package manager for the workflow (default: true).
    #[clap(long, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub use_conda: Option<bool>,
}

impl Args {
    /// Returns true if no option was given.
    pub fn is_empty(&self) -> bool {
        self == &Args::default()
    }
}

/// Run the `config` subcommand on the terminal.
pub fn run(args: &Args, context: &Context) -> Result<Config, Report> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    configure(args, context, &mut input, &mut output)
}

/// Create or update the user preferences, returning the persisted layer.
///
/// - No user config yet: only the interactive prompt is allowed, and only the
///   answers that differ from the repository defaults are persisted.
///
/// Paths are persisted absolute, see [`Config::resolve_paths`].
/// - Existing user config, no options: the interactive answers are merged in.
/// - Existing user config, with options: the options are checked and merged in.
pub fn configure<R, W>(args: &Args, context: &Context, input: &mut R, output: &mut W) -> Result<Config, Report>
where
    R: BufRead,
    W: Write,
{
    info!("Checking haystack configuration options.");

    let mut defaults = Config::defaults()?;
    defaults.resolve_paths(context);
    let path = context.user_config_path();

    let user = if !path.exists() {
        if !args.is_empty() {
            return Err(eyre!("You have not configured haystack yet.")).suggestion(formatdoc!(
                "You need to do this for all options at least once.
                 Please first run `haystack config` and follow the instructions,
                 before configuring any individual options."
            ));
        }
        let answers = prompt(&defaults, context, input, output)?;
        answers.non_default(&defaults)
    } else {
        let mut user = Config::read(&path)?;
        if args.is_empty() {
            let current = Config::merge(&[&defaults, &user]);
            user.update(&prompt(&current, context, input, output)?);
        } else {
            let mut flags = Config::from_serialize(args)?;
            flags.resolve_paths(context);
            let resolved = Config::merge(&[&defaults, &user, &flags]);
            resolved.to_typed::<UserConfig>()?.check(context)?;
            user.update(&flags);
        }
        user
    };

    user.write(&path)?;
    info!("Configuration saved: {path:?}");

    Ok(user)
}

/// Ask for all preferences, using `current` as the defaults, and check the answers.
fn prompt<R, W>(current: &Config, context: &Context, input: &mut R, output: &mut W) -> Result<Config, Report>
where
    R: BufRead,
    W: Write,
{
    let current: UserConfig = current.to_typed()?;

    let answers = UserConfig::prompt(&current, input, output)?;
    answers.check(context)?;
    let mut answers = Config::from_serialize(&answers)?;
    answers.resolve_paths(context);
    Ok(answers)
}
