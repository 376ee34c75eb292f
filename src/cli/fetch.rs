use crate::fetch::{AccessionsArgs, SequencesArgs};
use clap::{Parser, Subcommand};

/// CLI arguments to download records from NCBI.
#[derive(Debug, Parser)]
#[clap(about = "Download accessions or sequences from NCBI.")]
pub struct Args {
    /// Fetch command: Accessions, Sequences
    #[clap(subcommand)]
    pub command: Command,
}

/// CLI fetch [commands](#variants). Used to decide which fetch method the CLI arguments should be passed to.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the fetch [accessions](crate::fetch::accessions()) method.
    ///
    /// ```rust
    /// use clap::Parser;
    /// use haystack::cli::{fetch, Command};
    ///
    /// let input = ["haystack", "fetch", "accessions", "--query", "Yersinia[Organism]", "--output", "acc.tsv"];
    /// let args = haystack::Cli::parse_from(input);
    /// match args.command {
    ///     Command::Fetch(fetch::Args { command: fetch::Command::Accessions(args) }) => {
    ///         assert_eq!(args.query, "Yersinia[Organism]");
    ///     }
    ///     _ => unreachable!(),
    /// }
    /// ```
    #[clap(about = "Find the accessions matching an NCBI query.")]
    Accessions(AccessionsArgs),

    /// Pass CLI arguments to the fetch [sequences](crate::fetch::sequences()) method.
    #[clap(about = "Download the sequences of a list of accessions.")]
    Sequences(SequencesArgs),
}
