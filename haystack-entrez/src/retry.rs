//! Bounded retry of E-utilities requests.

use crate::{Database, EntrezError, Eutils, Session};
use log::{info, warn};
use std::future::Future;
use std::time::Duration;

/// The maximum number of attempts to make for a failed request.
pub const MAX_RETRY_ATTEMPTS: u32 = 2;

/// Time to wait before repeating a failed request.
pub const RETRY_WAIT_TIME: Duration = Duration::from_secs(2);

/// How often, and how patiently, a transient failure is retried.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_attempts: MAX_RETRY_ATTEMPTS, wait: RETRY_WAIT_TIME }
    }
}

impl RetryPolicy {
    /// Run `request` until it succeeds, retrying transient failures.
    ///
    /// `request` receives the 1-based attempt number. Returns [`None`] when the
    /// attempts are exhausted or when the failure is not transient (a truncated
    /// or malformed response), in which case no further attempt is made.
    pub async fn run<F, Fut, T>(&self, mut request: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, EntrezError>>,
    {
        let mut attempt = 1;
        loop {
            match request(attempt).await {
                Ok(value) => return Some(value),
                Err(e) if e.is_transient() => {
                    warn!("{e}");
                    if attempt >= self.max_attempts {
                        warn!("Exceeded maximum attempts {attempt}...");
                        return None;
                    }
                    tokio::time::sleep(self.wait).await;
                    attempt += 1;
                    info!("Starting attempt {attempt}...");
                }
                Err(e) => {
                    warn!("Ditching that batch: {e}");
                    return None;
                }
            }
        }
    }
}

/// Fetch one batch of a session, with bounded retry.
pub async fn efetch<E: Eutils>(
    client: &E,
    db: Database,
    session: &Session,
    retstart: usize,
    retmax: usize,
    policy: &RetryPolicy,
) -> Option<String> {
    policy
        .run(move |_attempt| {
            let client = client;
            let session = session;
            async move { client.efetch(db, session, retstart, retmax).await }
        })
        .await
}
