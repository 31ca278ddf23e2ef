//! Ingestion configuration
//!
//! Compiled defaults, overridden by the `[ingest]` section of the TOML config
//! and, for the endpoint, by the `PDG_SPARQL_ENDPOINT` environment variable.

use crate::reconcile::validation::ValidationRules;
use crate::services::record_transformer::PublicDomainPolicy;
use pdg_common::config::TomlConfig;
use pdg_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const DEFAULT_USER_AGENT: &str =
    "PublicDomainGallery/0.1 (public domain artwork catalog; https://query.wikidata.org)";
pub const SPARQL_ENDPOINT_ENV: &str = "PDG_SPARQL_ENDPOINT";

/// Fully resolved settings for one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub sparql_endpoint: String,
    pub user_agent: String,
    /// Reference year for the copyright term
    pub current_year: i32,
    pub public_domain_term_years: i32,
    /// Works created before this year are assumed public domain
    pub creation_era_cutoff: i32,
    /// Works from this year on need established public-domain status
    pub conservative_cutoff: i32,
    /// Works from this year on are dropped
    pub horizon_year: i32,
    pub min_size_cm: f64,
    pub aspect_ratio_min: f64,
    pub aspect_ratio_max: f64,
    /// Hard per-query timeout
    pub query_timeout: Duration,
    /// Pacing delay between window attempts
    pub batch_delay: Duration,
    pub max_split_depth: u32,
    pub min_split_span_years: i32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            current_year: pdg_common::time::current_year(),
            public_domain_term_years: 70,
            creation_era_cutoff: 1900,
            conservative_cutoff: 1954,
            horizon_year: 1970,
            min_size_cm: 100.0,
            aspect_ratio_min: 0.85,
            aspect_ratio_max: 1.15,
            query_timeout: Duration::from_secs(75),
            batch_delay: Duration::from_millis(5000),
            max_split_depth: 2,
            min_split_span_years: 10,
        }
    }
}

impl IngestConfig {
    /// Resolve settings from TOML and environment, then validate
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let defaults = Self::default();
        let settings = &toml_config.ingest;

        let config = Self {
            sparql_endpoint: resolve_endpoint(settings.sparql_endpoint.as_deref()),
            user_agent: settings.user_agent.clone().unwrap_or(defaults.user_agent),
            current_year: settings.current_year.unwrap_or(defaults.current_year),
            public_domain_term_years: settings
                .public_domain_term_years
                .unwrap_or(defaults.public_domain_term_years),
            creation_era_cutoff: settings
                .creation_era_cutoff
                .unwrap_or(defaults.creation_era_cutoff),
            conservative_cutoff: settings
                .conservative_cutoff
                .unwrap_or(defaults.conservative_cutoff),
            horizon_year: settings.horizon_year.unwrap_or(defaults.horizon_year),
            min_size_cm: settings.min_size_cm.unwrap_or(defaults.min_size_cm),
            aspect_ratio_min: settings.aspect_ratio_min.unwrap_or(defaults.aspect_ratio_min),
            aspect_ratio_max: settings.aspect_ratio_max.unwrap_or(defaults.aspect_ratio_max),
            query_timeout: settings
                .query_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.query_timeout),
            batch_delay: settings
                .batch_delay_ms
                .map(pdg_common::time::millis_to_duration)
                .unwrap_or(defaults.batch_delay),
            max_split_depth: settings.max_split_depth.unwrap_or(defaults.max_split_depth),
            min_split_span_years: settings
                .min_split_span_years
                .unwrap_or(defaults.min_split_span_years),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline meaningless
    pub fn validate(&self) -> Result<()> {
        if self.sparql_endpoint.trim().is_empty() {
            return Err(Error::Config("SPARQL endpoint is empty".to_string()));
        }
        if !(self.aspect_ratio_min > 0.0 && self.aspect_ratio_min <= self.aspect_ratio_max) {
            return Err(Error::Config(format!(
                "Invalid aspect ratio band [{}, {}]",
                self.aspect_ratio_min, self.aspect_ratio_max
            )));
        }
        if self.min_size_cm < 0.0 {
            return Err(Error::Config(format!(
                "Minimum size must not be negative: {}",
                self.min_size_cm
            )));
        }
        if !(self.creation_era_cutoff <= self.conservative_cutoff
            && self.conservative_cutoff <= self.horizon_year)
        {
            return Err(Error::Config(format!(
                "Cutoff years out of order: creation era {}, conservative {}, horizon {}",
                self.creation_era_cutoff, self.conservative_cutoff, self.horizon_year
            )));
        }
        if self.query_timeout.is_zero() {
            return Err(Error::Config("Query timeout must be positive".to_string()));
        }
        if self.min_split_span_years < 1 {
            return Err(Error::Config(format!(
                "Minimum split span must be at least one year: {}",
                self.min_split_span_years
            )));
        }
        Ok(())
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            min_size_cm: self.min_size_cm,
            aspect_ratio_min: self.aspect_ratio_min,
            aspect_ratio_max: self.aspect_ratio_max,
        }
    }

    pub fn public_domain_policy(&self) -> PublicDomainPolicy {
        PublicDomainPolicy {
            current_year: self.current_year,
            term_years: self.public_domain_term_years,
            creation_era_cutoff: self.creation_era_cutoff,
            conservative_cutoff: self.conservative_cutoff,
            horizon_year: self.horizon_year,
        }
    }
}

/// Resolve the SPARQL endpoint
///
/// **Priority:** ENV → TOML → compiled default
fn resolve_endpoint(toml_value: Option<&str>) -> String {
    let env_value = std::env::var(SPARQL_ENDPOINT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty());
    let toml_value = toml_value.filter(|v| !v.trim().is_empty());

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "SPARQL endpoint found in environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(endpoint) = env_value {
        info!("SPARQL endpoint loaded from environment variable");
        return endpoint;
    }

    if let Some(endpoint) = toml_value {
        info!("SPARQL endpoint loaded from TOML config");
        return endpoint.to_string();
    }

    DEFAULT_SPARQL_ENDPOINT.to_string()
}
