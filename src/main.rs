use clap::Parser;
use color_eyre::eyre::{Report, Result};
use haystack::workflow::Snakemake;
use haystack::{analyse, cli, config, database, fetch, sample};
use haystack::{Cli, Context};

#[tokio::main]
async fn main() -> Result<(), Report> {
    // ------------------------------------------------------------------------
    // CLI Setup

    // Parse CLI parameters
    let args = Cli::parse();

    // initialize color_eyre crate for colorized logs
    color_eyre::install()?;

    // Set logging/verbosity level via RUST_LOG
    std::env::set_var("RUST_LOG", args.verbosity.to_string());

    // initialize env_logger crate for logging/verbosity level
    env_logger::init();

    let context = Context::from_env()?;
    let engine = Snakemake::from_env();

    // check which CLI command we're running (config, database, sample, analyse, fetch)
    match args.command {
        cli::Command::Config(args) => _ = config::setup::run(&args, &context)?,
        cli::Command::Database(args) => database::run(&args, &context, &engine)?,
        cli::Command::Sample(args) => sample::run(&args, &context, &engine).await?,
        cli::Command::Analyse(args) => analyse::run(&args, &context, &engine)?,
        cli::Command::Fetch(args) => match args.command {
            cli::fetch::Command::Accessions(args) => fetch::run_accessions(&args, &context).await?,
            cli::fetch::Command::Sequences(args) => fetch::run_sequences(&args, &context).await?,
        },
    }

    Ok(())
}
