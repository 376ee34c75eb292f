use crate::EntrezError;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use strum::{Display, EnumString};

/// Base URL of the NCBI E-utilities.
pub const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Upper bound on the number of ids returned by a search.
pub const ENTREZ_RETMAX: u64 = 1_000_000_000;

/// Tool name reported to NCBI alongside the contact email.
pub const ENTREZ_TOOL: &str = "haystack";

// ----------------------------------------------------------------------------
// Entrez Types
// ----------------------------------------------------------------------------

/// Entrez databases queried by the pipeline.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Database {
    #[default]
    Nuccore,
    Assembly,
    Taxonomy,
    Sra,
}

/// History server session of a posted or searched id list.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Session {
    #[serde(rename = "WebEnv")]
    pub web_env: String,
    #[serde(rename = "QueryKey")]
    pub query_key: String,
}

/// The `esearchresult` block of an esearch JSON response.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub idlist: Vec<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

// ----------------------------------------------------------------------------
// Eutils
// ----------------------------------------------------------------------------

/// The subset of E-utilities used by the pipeline.
///
/// [`Client`] talks to NCBI; tests substitute their own implementation.
#[allow(async_fn_in_trait)]
pub trait Eutils {
    /// Search `db` for `term`, optionally returning accessions (`idtype=acc`).
    async fn esearch(&self, db: Database, term: &str, accessions: bool) -> Result<SearchResult, EntrezError>;

    /// Post `ids` to the history server.
    async fn epost(&self, db: Database, ids: &[String]) -> Result<Session, EntrezError>;

    /// Fetch `retmax` FASTA records of a session starting at `retstart`.
    async fn efetch(
        &self,
        db: Database,
        session: &Session,
        retstart: usize,
        retmax: usize,
    ) -> Result<String, EntrezError>;

    /// Document summaries of `ids` as JSON.
    async fn esummary(&self, db: Database, ids: &[String]) -> Result<serde_json::Value, EntrezError>;
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

/// HTTP client for the NCBI E-utilities.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_key: Option<String>,
}

impl Client {
    /// Create a client that identifies itself with `email`.
    ///
    /// An NCBI API key is picked up from the `NCBI_API_KEY` environment variable.
    pub fn new(email: &str) -> Result<Self, EntrezError> {
        let user_agent = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| EntrezError::Client(e.to_string()))?;

        Ok(Client {
            http,
            base_url: EUTILS_URL.to_string(),
            email: email.to_string(),
            api_key: std::env::var("NCBI_API_KEY").ok(),
        })
    }

    /// Point the client at a different E-utilities mirror.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Parameters sent with every request.
    fn common_params(&self, db: Database) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", db.to_string()),
            ("tool", ENTREZ_TOOL.to_string()),
            ("email", self.email.clone()),
        ];
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.clone()));
        }
        params
    }

    async fn request(
        &self,
        utility: &str,
        params: &[(&'static str, String)],
        post: bool,
    ) -> Result<String, EntrezError> {
        let url = format!("{}/{utility}.fcgi", self.base_url);
        debug!("Entrez {utility}: {params:?}");

        let request = match post {
            true => self.http.post(&url).form(params),
            false => self.http.get(&url).query(params),
        };
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EntrezError::Status { status: status.as_u16(), url });
        }

        // a failure while streaming the body means the response was cut short
        response.text().await.map_err(|e| EntrezError::Truncated(e.to_string()))
    }
}

impl Eutils for Client {
    async fn esearch(&self, db: Database, term: &str, accessions: bool) -> Result<SearchResult, EntrezError> {
        let mut params = self.common_params(db);
        params.push(("term", term.to_string()));
        params.push(("retmax", ENTREZ_RETMAX.to_string()));
        params.push(("retmode", "json".to_string()));
        if accessions {
            params.push(("idtype", "acc".to_string()));
        }

        let body = self.request("esearch", &params, false).await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| EntrezError::Malformed(e.to_string()))?;
        Ok(response.esearchresult)
    }

    async fn epost(&self, db: Database, ids: &[String]) -> Result<Session, EntrezError> {
        let mut params = self.common_params(db);
        params.push(("id", ids.join(",")));

        let body = self.request("epost", &params, true).await?;
        quick_xml::de::from_str(&body).map_err(|e| EntrezError::Malformed(format!("{e}: {body}")))
    }

    async fn efetch(
        &self,
        db: Database,
        session: &Session,
        retstart: usize,
        retmax: usize,
    ) -> Result<String, EntrezError> {
        let mut params = self.common_params(db);
        params.push(("WebEnv", session.web_env.clone()));
        params.push(("query_key", session.query_key.clone()));
        params.push(("retstart", retstart.to_string()));
        params.push(("retmax", retmax.to_string()));
        params.push(("rettype", "fasta".to_string()));
        params.push(("retmode", "text".to_string()));

        self.request("efetch", &params, false).await
    }

    async fn esummary(&self, db: Database, ids: &[String]) -> Result<serde_json::Value, EntrezError> {
        let mut params = self.common_params(db);
        params.push(("id", ids.join(",")));
        params.push(("retmode", "json".to_string()));

        let body = self.request("esummary", &params, false).await?;
        serde_json::from_str(&body).map_err(|e| EntrezError::Malformed(e.to_string()))
    }
}
