//! [Command-line interface](Cli) (CLI) of the main binary.

pub mod fetch;

use crate::{analyse, config, database, sample, Verbosity};
use clap::{Parser, Subcommand};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = haystack::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// use clap::Parser;
/// use haystack::cli::Command;
///
/// let input = ["haystack", "database", "--mode", "fetch", "--output", "db", "--refseq-rep", "--cores", "4"];
/// let args = haystack::Cli::parse_from(input);
/// match args.command {
///     Command::Database(args) => {
///         assert!(args.refseq_rep);
///         assert_eq!(args.run.cores, 4);
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Parser)]
#[clap(name = "haystack", author, version)]
#[clap(about = "haystack identifies the species in a metagenomic sample, taking the ancient DNA damage into account.")]
#[clap(after_help = "Run `haystack config` first to set up the email address and the genome cache.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [config](crate::config::setup::run()) method.
    #[clap(about = "Configure the email address, genome cache and other user preferences.")]
    Config(config::setup::Args),

    /// Pass CLI arguments to the [database](crate::database::run()) method.
    #[clap(about = "Build a database of target species.")]
    Database(database::Args),

    /// Pass CLI arguments to the [sample](crate::sample::run()) method.
    #[clap(about = "Prepare a sample for analysis.")]
    Sample(sample::Args),

    /// Pass CLI arguments to the [analyse](crate::analyse::run()) method.
    #[clap(about = "Analyse a sample.")]
    Analyse(analyse::Args),

    /// Pass CLI arguments to the [Fetch](fetch::Command) subcommands.
    #[clap(about = "Download accessions or sequences from NCBI.")]
    Fetch(fetch::Args),
}
