//! Searches against Entrez that the workflow depends on.

use crate::{Database, EntrezError, Eutils};
use log::debug;

/// Accessions of all `db` records matching `term`.
pub async fn find_accessions<E: Eutils>(
    client: &E,
    db: Database,
    term: &str,
) -> Result<Vec<String>, EntrezError> {
    let result = client.esearch(db, term, true).await?;
    debug!("Entrez search {term:?} matched {} records", result.count);
    Ok(result.idlist)
}

/// Returns true if the library layout of an SRA run is paired-end.
pub async fn sra_is_paired<E: Eutils>(client: &E, accession: &str) -> Result<bool, EntrezError> {
    let result = client.esearch(Database::Sra, accession, false).await?;
    if result.idlist.is_empty() {
        return Err(EntrezError::Malformed(format!("No SRA record found for {accession}")));
    }
    let summary = client.esummary(Database::Sra, &result.idlist).await?;
    Ok(summary.to_string().to_lowercase().contains("paired"))
}
