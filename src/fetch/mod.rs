//! The `fetch` subcommand: Entrez downloads used by the workflow rules.

use crate::config;
use crate::context::Context;
use crate::utils;
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use haystack_entrez::{fetch_records, find_accessions, Client, Database, Eutils, RetryPolicy};
use log::{info, warn};
use noodles::fasta;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header of the accessions table.
pub const ACCESSION_HEADER: &str = "GBSeq_accession-version";

/// Find the accessions matching an Entrez query.
#[derive(Clone, Debug, Parser, Serialize)]
pub struct AccessionsArgs {
    /// Query in the NCBI query language.
    #[clap(short = 'q', long, required = true)]
    pub query: String,

    /// Entrez database to search.
    #[clap(long, default_value_t = Database::default())]
    #[serde(skip)]
    pub db: Database,

    /// Output table, one accession per line.
    #[clap(short = 'o', long, required = true)]
    pub output: PathBuf,
}

/// Download the sequences of a list of accessions.
#[derive(Clone, Debug, Parser, Serialize)]
pub struct SequencesArgs {
    /// Table of accessions, the first column of each line is used.
    #[clap(short = 'a', long, required = true)]
    pub accessions: PathBuf,

    /// Entrez database to fetch from.
    #[clap(long, default_value_t = Database::default())]
    #[serde(skip)]
    pub db: Database,

    /// Records per request (default: the configured batchsize).
    #[clap(short = 'b', long)]
    pub batchsize: Option<usize>,

    /// Output FASTA file.
    #[clap(short = 'o', long, required = true)]
    pub output: PathBuf,
}

// ----------------------------------------------------------------------------
// Accessions
// ----------------------------------------------------------------------------

/// Write the accessions matching the query to a table, returning the number of accessions.
pub async fn accessions<E: Eutils>(args: &AccessionsArgs, client: &E) -> Result<usize, Report> {
    info!("Searching NCBI {} for: {}", args.db, args.query);
    let accessions = find_accessions(client, args.db, &args.query)
        .await
        .wrap_err_with(|| eyre!("Failed to search NCBI for: {}", args.query))?;

    if accessions.is_empty() {
        warn!("No records matched the query: {}", args.query);
    }

    utils::create_parent_dir(&args.output)?;
    let mut writer = File::create(&args.output)
        .map(BufWriter::new)
        .wrap_err_with(|| eyre!("Failed to create file: {:?}", args.output))?;
    writeln!(writer, "{ACCESSION_HEADER}")?;
    for accession in &accessions {
        writeln!(writer, "{accession}")?;
    }
    writer.flush()?;

    info!("Wrote {} accessions: {:?}", accessions.len(), args.output);
    Ok(accessions.len())
}

// ----------------------------------------------------------------------------
// Sequences
// ----------------------------------------------------------------------------

/// Read accessions from the first column of a table.
///
/// Blank lines, comments and the [`ACCESSION_HEADER`] are skipped.
pub fn read_accessions(path: &Path) -> Result<Vec<String>, Report> {
    let table = std::fs::read_to_string(path)
        .wrap_err_with(|| eyre!("Failed to read accessions: {path:?}"))
        .suggestion("Please provide a valid path to --accessions.")?;

    let accessions = table
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split(['\t', ',', ' ']).next())
        .filter(|a| !a.is_empty() && !a.starts_with('#') && *a != ACCESSION_HEADER)
        .map(String::from)
        .collect();
    Ok(accessions)
}

/// Download the sequences of the accessions to a FASTA file, returning the number of records.
///
/// Batches that cannot be downloaded are skipped, see [`fetch_records`].
pub async fn sequences<E: Eutils>(args: &SequencesArgs, client: &E, batchsize: usize) -> Result<usize, Report> {
    let ids = read_accessions(&args.accessions)?;
    let records = fetch_records(client, args.db, &ids, batchsize, &RetryPolicy::default())
        .await
        .wrap_err("Failed to post the accessions to NCBI.")?;

    if records.len() < ids.len() {
        warn!("Only {} of {} records could be downloaded.", records.len(), ids.len());
    }

    utils::create_parent_dir(&args.output)?;
    let file = File::create(&args.output).wrap_err_with(|| eyre!("Failed to create file: {:?}", args.output))?;
    let mut buffer = BufWriter::new(file);
    let mut writer = fasta::Writer::new(&mut buffer);
    for record in &records {
        writer.write_record(record)?;
    }
    buffer.flush()?;

    info!("Wrote {} sequences: {:?}", records.len(), args.output);
    Ok(records.len())
}

// ----------------------------------------------------------------------------
// Entry Points
// ----------------------------------------------------------------------------

/// An Entrez client identified with the configured email address.
fn client(context: &Context) -> Result<(Client, config::Config), Report> {
    let config = config::resolve_user(context)?;
    let client = Client::new(config.get_str("email").unwrap_or_default())?;
    Ok((client, config))
}

pub async fn run_accessions(args: &AccessionsArgs, context: &Context) -> Result<(), Report> {
    let (client, _) = client(context)?;
    accessions(args, &client).await?;
    Ok(())
}

pub async fn run_sequences(args: &SequencesArgs, context: &Context) -> Result<(), Report> {
    let (client, config) = client(context)?;
    let batchsize = match args.batchsize {
        Some(batchsize) => batchsize,
        None => config.get("batchsize").and_then(|v| v.as_u64()).unwrap_or(5) as usize,
    };
    sequences(args, &client, batchsize).await?;
    Ok(())
}
