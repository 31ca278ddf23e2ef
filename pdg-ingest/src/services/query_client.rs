//! SPARQL query client
//!
//! Executes one painting query per call against the graph endpoint under a
//! hard timeout. There is no retry here; callers shrink the
//! query scope instead (see [`crate::services::window_fetcher`]).

use crate::reconcile::validation::ValidationRules;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Longest diagnostic payload carried in an error
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Query client errors
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("SPARQL query failed: HTTP {status}\n{body}")]
    Http { status: u16, body: String },

    #[error("Malformed SPARQL response: {message}\n{body}")]
    Protocol { message: String, body: String },
}

/// One `{ "value": ... }` cell of a result row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BindingValue {
    pub value: String,
}

impl BindingValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// One result row of the painting query
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparqlBinding {
    pub painting: Option<BindingValue>,
    pub painting_label: Option<BindingValue>,
    pub height: Option<BindingValue>,
    pub width: Option<BindingValue>,
    pub inception: Option<BindingValue>,
    pub image: Option<BindingValue>,
    pub creator_label: Option<BindingValue>,
    pub creator_death_year: Option<BindingValue>,
    pub location_label: Option<BindingValue>,
    pub inventory_number: Option<BindingValue>,
    pub medium_label: Option<BindingValue>,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

/// Executes a painting query restricted by a window predicate
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, predicate: &str) -> Result<Vec<SparqlBinding>, QueryError>;
}

/// Build the painting query for one window
///
/// The validation band and minimum size are pushed into the query so the
/// endpoint does not return rows the reconciler would reject anyway.
pub fn build_query(predicate: &str, rules: &ValidationRules) -> String {
    format!(
        r#"
SELECT DISTINCT ?painting ?paintingLabel ?height ?width ?inception ?image ?creatorLabel ?creatorDeathYear ?locationLabel ?inventoryNumber ?mediumLabel
WHERE {{
  ?painting wdt:P31/wdt:P279* wd:Q3305213 .

  ?painting p:P2048 ?heightStatement .
  ?heightStatement psv:P2048 ?heightValue .
  ?heightValue wikibase:quantityAmount ?height .
  ?heightValue wikibase:quantityUnit wd:Q174728 .

  ?painting p:P2049 ?widthStatement .
  ?widthStatement psv:P2049 ?widthValue .
  ?widthValue wikibase:quantityAmount ?width .
  ?widthValue wikibase:quantityUnit wd:Q174728 .

  FILTER(?width / ?height >= {min_ratio} && ?width / ?height <= {max_ratio})
  FILTER(?height >= {min_size} && ?width >= {min_size})

  ?painting wdt:P18 ?image .

  OPTIONAL {{
    ?painting wdt:P170 ?creator .
    OPTIONAL {{ ?creator wdt:P570 ?creatorDeath . }}
    BIND(YEAR(?creatorDeath) AS ?creatorDeathYear)
  }}

  OPTIONAL {{ ?painting wdt:P571 ?inception . }}

  {predicate}

  OPTIONAL {{ ?painting wdt:P276 ?location . }}
  OPTIONAL {{ ?painting wdt:P217 ?inventoryNumber . }}
  OPTIONAL {{ ?painting wdt:P186 ?medium . }}

  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en,de,fr,es,it,nl" . }}
}}
ORDER BY DESC(?height)
"#,
        min_ratio = rules.aspect_ratio_min,
        max_ratio = rules.aspect_ratio_max,
        min_size = rules.min_size_cm,
        predicate = predicate,
    )
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// HTTP client for the SPARQL endpoint
pub struct SparqlClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    rules: ValidationRules,
}

impl SparqlClient {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        rules: ValidationRules,
    ) -> Result<Self, QueryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| QueryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
            rules,
        })
    }

    async fn send(&self, query: &str) -> Result<Vec<SparqlBinding>, QueryError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(QueryError::Http {
                status: status.as_u16(),
                body: truncate_diagnostic(&body, MAX_DIAGNOSTIC_CHARS),
            });
        }

        let parsed: SparqlResponse =
            serde_json::from_str(&body).map_err(|e| QueryError::Protocol {
                message: e.to_string(),
                body: truncate_diagnostic(&body, MAX_DIAGNOSTIC_CHARS),
            })?;

        Ok(parsed.results.bindings)
    }
}

#[async_trait]
impl QueryExecutor for SparqlClient {
    async fn execute(&self, predicate: &str) -> Result<Vec<SparqlBinding>, QueryError> {
        let query = build_query(predicate, &self.rules);
        tracing::debug!(endpoint = %self.endpoint, predicate = %predicate, "Executing SPARQL query");

        // Dropping the request future on expiry cancels the in-flight call
        match tokio::time::timeout(self.timeout, self.send(&query)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }
}
