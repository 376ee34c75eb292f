//! Batched download of records through the history server.

use crate::retry::{self, RetryPolicy};
use crate::{Database, EntrezError, Eutils};
use chrono::Local;
use log::{info, warn};
use noodles::fasta;

/// Parse an efetch FASTA body into records.
///
/// An empty body, or one that is not FASTA (ex. an error page), is
/// [`Malformed`](EntrezError::Malformed).
pub fn parse_fasta(body: &str) -> Result<Vec<fasta::Record>, EntrezError> {
    if body.trim().is_empty() {
        return Err(EntrezError::Malformed("empty response".to_string()));
    }
    let mut reader = fasta::Reader::new(body.as_bytes());
    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EntrezError::Malformed(e.to_string()))
}

/// Download the FASTA records of `ids` from `db` in batches of `batch_size`.
///
/// The id list is posted to the history server once, then each batch is
/// fetched with [`retry::efetch`]. A batch that cannot be fetched or parsed is
/// skipped, the remaining batches are still downloaded. Only a failure to
/// post the id list is an error.
pub async fn fetch_records<E: Eutils>(
    client: &E,
    db: Database,
    ids: &[String],
    batch_size: usize,
    policy: &RetryPolicy,
) -> Result<Vec<fasta::Record>, EntrezError> {
    let mut records = Vec::new();
    if ids.is_empty() {
        return Ok(records);
    }
    let batch_size = batch_size.max(1);

    info!(
        "Downloading {} entries from NCBI {db} database in batches of {batch_size} entries...",
        ids.len()
    );
    let session = client.epost(db, ids).await?;

    for start in (0..ids.len()).step_by(batch_size) {
        let now = Local::now().format("%a %b %e %T %Y");
        info!("\t{now}\t{start} / {}", ids.len());

        let Some(body) = retry::efetch(client, db, &session, start, batch_size, policy).await else {
            continue;
        };

        match parse_fasta(&body) {
            Ok(batch) => records.extend(batch),
            Err(e) => warn!("Ditching that batch of records: {e}"),
        }
    }

    Ok(records)
}
