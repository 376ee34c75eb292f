use thiserror::Error;

/// Failures of a single E-utilities request.
///
/// The variants split into two classes. [`Network`](EntrezError::Network) and
/// throttling/server [`Status`](EntrezError::Status) codes are transient and the
/// same request may be repeated. Everything else means the response itself is
/// unusable and repeating the request will not help.
#[derive(Clone, Debug, Error)]
pub enum EntrezError {
    /// Connection, timeout or request transport failure.
    #[error("Network problem: {0}")]
    Network(String),

    /// The service answered with a non-success HTTP status.
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body ended before it was fully read.
    #[error("Incomplete read: {0}")]
    Truncated(String),

    /// The response body was read but could not be parsed.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl EntrezError {
    /// Returns true if repeating the identical request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EntrezError::Network(_) => true,
            EntrezError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EntrezError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_body() || e.is_decode() {
            EntrezError::Truncated(e.to_string())
        } else if e.is_builder() {
            EntrezError::Client(e.to_string())
        } else {
            EntrezError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EntrezError;

    #[test]
    fn transient_classes() {
        assert!(EntrezError::Network("reset by peer".into()).is_transient());
        let status = |status| EntrezError::Status { status, url: String::new() };
        assert!(status(429).is_transient());
        assert!(status(502).is_transient());
        assert!(!status(400).is_transient());
        assert!(!EntrezError::Truncated("eof".into()).is_transient());
        assert!(!EntrezError::Malformed("not fasta".into()).is_transient());
    }
}
