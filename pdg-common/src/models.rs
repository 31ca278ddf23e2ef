//! Catalog data model
//!
//! These types are the file-level contract between the ingestion stage, the
//! reconciliation stage and the downstream site build. Field names are
//! serialized in camelCase; optional fields are omitted when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Medium assigned when the source does not name one
pub const DEFAULT_MEDIUM: &str = "Oil on canvas";

/// Title assigned when the source has no label
pub const DEFAULT_TITLE: &str = "Untitled";

/// Artist assigned when the source has no creator
pub const DEFAULT_ARTIST: &str = "Unknown";

/// Museum assigned when the source has no location
pub const DEFAULT_MUSEUM: &str = "Unknown";

/// Sort rank for cities missing from the rank table
pub const DEFAULT_CITY_RANK: u32 = 999;

/// Public-domain status of a work
///
/// Serialized as `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum PublicDomain {
    /// Established as public domain
    Yes,
    /// Explicitly known to be protected
    No,
    /// Not established either way
    #[default]
    Unknown,
}

impl PublicDomain {
    pub fn is_established(self) -> bool {
        self == PublicDomain::Yes
    }
}

impl From<Option<bool>> for PublicDomain {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => PublicDomain::Yes,
            Some(false) => PublicDomain::No,
            None => PublicDomain::Unknown,
        }
    }
}

impl From<PublicDomain> for Option<bool> {
    fn from(value: PublicDomain) -> Self {
        match value {
            PublicDomain::Yes => Some(true),
            PublicDomain::No => Some(false),
            PublicDomain::Unknown => None,
        }
    }
}

/// One painting in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkRecord {
    /// Stable identifier (`wikidata-Q…` for fetched records)
    pub id: String,
    /// Source identifier, the strongest identity signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_death_year: Option<i32>,
    /// Creation year, negative for BCE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_created: Option<i32>,
    #[serde(default)]
    pub date_display: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub museum: String,
    /// Resolved by the reconciler when empty
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f64>,
    /// Width over height
    #[serde(default)]
    pub aspect_ratio: f64,
    /// Human-readable dimensions, e.g. `"120 × 118 cm"`
    #[serde(default)]
    pub dimensions_raw: String,
    #[serde(default)]
    pub public_domain: PublicDomain,
    #[serde(default)]
    pub public_domain_basis: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub museum_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_url: Option<String>,
    /// Provenance tag
    #[serde(default)]
    pub source: String,
}

/// Aggregate counts emitted alongside the final corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusSummary {
    pub total_accepted: usize,
    pub total_rejected: usize,
    pub with_images: usize,
    pub by_museum: BTreeMap<String, usize>,
    pub by_city: BTreeMap<String, usize>,
    #[serde(default)]
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub consolidated_at: DateTime<Utc>,
}

/// Final corpus document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusFile {
    pub summary: CorpusSummary,
    #[serde(alias = "artworks")]
    pub records: Vec<ArtworkRecord>,
}

/// Prior corpus as read from disk
///
/// Older corpora may lack a summary or use the `artworks` key; only the
/// records matter when seeding a merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriorCorpus {
    #[serde(default, alias = "artworks")]
    pub records: Vec<ArtworkRecord>,
}

/// Raw output of one top-level time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWindowFile {
    pub window: String,
    pub count: usize,
    pub records: Vec<ArtworkRecord>,
}

/// Outcome of one fetch attempt (top-level or derived window)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResult {
    pub name: String,
    pub count: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WindowResult {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLog {
    pub timestamp: DateTime<Utc>,
    pub windows: Vec<WindowResult>,
    pub total_unique: usize,
}
