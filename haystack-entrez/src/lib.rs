//! `haystack-entrez` talks to the [NCBI Entrez E-utilities](https://www.ncbi.nlm.nih.gov/books/NBK25501/).
//!
//! Records are downloaded in batches through the history server. Each batch is
//! requested with a bounded [retry policy](RetryPolicy): transient network
//! failures are repeated a fixed number of times, truncated or malformed
//! responses are abandoned straight away. A batch that fails either way is
//! skipped so that the rest of the download still completes.
//!
//! ```no_run
//! use haystack_entrez::{fetch_records, Client, Database, RetryPolicy};
//!
//! # async fn example() -> Result<(), haystack_entrez::EntrezError> {
//! let client = Client::new("someone@example.org")?;
//! let ids = vec!["NC_003143.1".to_string(), "NC_003131.1".to_string()];
//! let records = fetch_records(&client, Database::Nuccore, &ids, 5, &RetryPolicy::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
mod client;
mod error;
pub mod retry;
pub mod search;

#[doc(inline)]
pub use batch::fetch_records;
#[doc(inline)]
pub use client::{Client, Database, Eutils, SearchResult, Session, ENTREZ_RETMAX, ENTREZ_TOOL, EUTILS_URL};
#[doc(inline)]
pub use error::EntrezError;
#[doc(inline)]
pub use retry::RetryPolicy;
#[doc(inline)]
pub use search::{find_accessions, sra_is_paired};

/// Maximum number of concurrent requests the workflow may send to Entrez.
pub const MAX_ENTREZ_REQUESTS: usize = 3;

#[cfg(test)]
pub(crate) mod tests {
    use crate::{Database, EntrezError, Eutils, SearchResult, Session};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory E-utilities that serves one FASTA record per posted id.
    pub struct MockEutils {
        pub search_ids: RefCell<Vec<String>>,
        pub summary: RefCell<serde_json::Value>,
        pub posted: RefCell<Vec<String>>,
        /// `retstart` of every efetch call, in order.
        pub fetched: RefCell<Vec<usize>>,
        /// Batches (by `retstart`) that always fail.
        pub failures: RefCell<HashMap<usize, EntrezError>>,
        /// Batches (by `retstart`) with a fixed body.
        pub bodies: RefCell<HashMap<usize, String>>,
    }

    impl MockEutils {
        pub fn new() -> Self {
            MockEutils {
                search_ids: RefCell::new(vec!["NC_003143.1".to_string(), "NC_003131.1".to_string()]),
                summary: RefCell::new(serde_json::Value::Null),
                posted: RefCell::new(Vec::new()),
                fetched: RefCell::new(Vec::new()),
                failures: RefCell::new(HashMap::new()),
                bodies: RefCell::new(HashMap::new()),
            }
        }
    }

    impl Eutils for MockEutils {
        async fn esearch(&self, _db: Database, _term: &str, _accessions: bool) -> Result<SearchResult, EntrezError> {
            let idlist = self.search_ids.borrow().clone();
            Ok(SearchResult { count: idlist.len().to_string(), idlist })
        }

        async fn epost(&self, _db: Database, ids: &[String]) -> Result<Session, EntrezError> {
            *self.posted.borrow_mut() = ids.to_vec();
            Ok(Session { web_env: "MCID_mock".to_string(), query_key: "1".to_string() })
        }

        async fn efetch(
            &self,
            _db: Database,
            _session: &Session,
            retstart: usize,
            retmax: usize,
        ) -> Result<String, EntrezError> {
            self.fetched.borrow_mut().push(retstart);
            if let Some(e) = self.failures.borrow().get(&retstart) {
                return Err(e.clone());
            }
            if let Some(body) = self.bodies.borrow().get(&retstart) {
                return Ok(body.clone());
            }
            let posted = self.posted.borrow();
            let end = (retstart + retmax).min(posted.len());
            Ok(posted[retstart..end].iter().map(|id| format!(">{id} mock record\nACGTACGT\n")).collect())
        }

        async fn esummary(&self, _db: Database, _ids: &[String]) -> Result<serde_json::Value, EntrezError> {
            Ok(self.summary.borrow().clone())
        }
    }
}
