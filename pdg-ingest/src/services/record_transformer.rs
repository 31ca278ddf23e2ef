//! Binding → ArtworkRecord transformation
//!
//! Applies the domain filters (date horizon, public-domain inference) and
//! drops bindings that cannot be turned into a usable record. A dropped
//! binding is not an error; it is simply not part of the catalog.

use crate::services::query_client::{BindingValue, SparqlBinding};
use pdg_common::models::{
    ArtworkRecord, PublicDomain, DEFAULT_ARTIST, DEFAULT_MEDIUM, DEFAULT_MUSEUM, DEFAULT_TITLE,
};

/// Provenance tag for fetched records
pub const SOURCE_TAG: &str = "wikidata";

/// Rules for inferring public-domain status
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublicDomainPolicy {
    pub current_year: i32,
    /// Copyright term after the artist's death
    pub term_years: i32,
    /// Works created before this year are assumed public domain
    pub creation_era_cutoff: i32,
    /// Works from this year on must be established public domain
    pub conservative_cutoff: i32,
    /// Works from this year on are out of scope entirely
    pub horizon_year: i32,
}

impl Default for PublicDomainPolicy {
    fn default() -> Self {
        Self {
            current_year: pdg_common::time::current_year(),
            term_years: 70,
            creation_era_cutoff: 1900,
            conservative_cutoff: 1954,
            horizon_year: 1970,
        }
    }
}

impl PublicDomainPolicy {
    /// Infer status and justification, in order: death year, creation era
    pub fn assess(&self, death_year: Option<i32>, year_created: Option<i32>) -> (PublicDomain, String) {
        if let Some(death) = death_year {
            if self.current_year - death >= self.term_years {
                return (
                    PublicDomain::Yes,
                    format!("Artist died in {}, over {} years ago.", death, self.term_years),
                );
            }
        }

        if let Some(year) = year_created {
            if year < self.creation_era_cutoff {
                return (
                    PublicDomain::Yes,
                    format!(
                        "Work created in {}. Artists from this era are typically deceased {}+ years.",
                        year, self.term_years
                    ),
                );
            }
        }

        (
            PublicDomain::Unknown,
            "Public domain status unknown. Requires manual verification.".to_string(),
        )
    }
}

/// Maps raw bindings into catalog records
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer {
    policy: PublicDomainPolicy,
}

impl RecordTransformer {
    pub fn new(policy: PublicDomainPolicy) -> Self {
        Self { policy }
    }

    /// Transform one binding, or `None` if it is unusable or out of scope
    pub fn transform(&self, binding: &SparqlBinding) -> Option<ArtworkRecord> {
        let height = parse_dimension(binding.height.as_ref().map(|v| v.value.as_str()))?;
        let width = parse_dimension(binding.width.as_ref().map(|v| v.value.as_str()))?;

        let year_created = binding
            .inception
            .as_ref()
            .and_then(|v| parse_creation_year(&v.value));

        if matches!(year_created, Some(year) if year >= self.policy.horizon_year) {
            return None;
        }

        let death_year = binding
            .creator_death_year
            .as_ref()
            .and_then(|v| parse_leading_int(&v.value));

        let (public_domain, basis) = self.policy.assess(death_year, year_created);

        if matches!(year_created, Some(year) if year >= self.policy.conservative_cutoff)
            && !public_domain.is_established()
        {
            return None;
        }

        let painting_uri = binding.painting.as_ref()?.value.as_str();
        let wikidata_id = extract_entity_id(painting_uri)?;

        Some(ArtworkRecord {
            id: format!("{}-{}", SOURCE_TAG, wikidata_id),
            wikidata_id: Some(wikidata_id.to_string()),
            title: label_or(binding.painting_label.as_ref(), DEFAULT_TITLE),
            artist: label_or(binding.creator_label.as_ref(), DEFAULT_ARTIST),
            artist_death_year: death_year,
            year_created,
            date_display: year_created
                .map(|y| y.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            medium: label_or(binding.medium_label.as_ref(), DEFAULT_MEDIUM),
            museum: label_or(binding.location_label.as_ref(), DEFAULT_MUSEUM),
            city: String::new(),
            city_rank: None,
            inventory_number: binding.inventory_number.as_ref().map(|v| v.value.clone()),
            height_cm: Some(round_to(height, 1)),
            width_cm: Some(round_to(width, 1)),
            aspect_ratio: round_to(width / height, 2),
            dimensions_raw: format!("{} × {} cm", height.round(), width.round()),
            public_domain,
            public_domain_basis: basis,
            image_url: binding
                .image
                .as_ref()
                .map(|v| v.value.clone())
                .unwrap_or_default(),
            thumbnail_url: None,
            museum_url: None,
            wikidata_url: Some(painting_uri.to_string()),
            source: SOURCE_TAG.to_string(),
        })
    }
}

fn label_or(value: Option<&BindingValue>, default: &str) -> String {
    match value {
        Some(v) if !v.value.is_empty() => v.value.clone(),
        _ => default.to_string(),
    }
}

/// Positive, finite centimetre value
fn parse_dimension(raw: Option<&str>) -> Option<f64> {
    let value: f64 = raw?.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Year from an xsd:dateTime token such as `1889-01-01T00:00:00Z` or `-0450-…`
///
/// Reads the first four digits after an optional leading minus.
pub fn parse_creation_year(raw: &str) -> Option<i32> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let year_digits = digits.get(..4)?;
    if !year_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year_digits.parse().ok()?;
    Some(if negative { -year } else { year })
}

/// Leading integer of a token, e.g. `1890` from `"1890"` or `"1890.0"`
fn parse_leading_int(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// Entity id (`Q…`) at the end of an entity URI
pub fn extract_entity_id(uri: &str) -> Option<&str> {
    let prefix = uri.trim_end_matches(|c: char| c.is_ascii_digit());
    if prefix.len() == uri.len() || !prefix.ends_with('Q') {
        return None;
    }
    uri.get(prefix.len() - 1..)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PublicDomainPolicy {
        PublicDomainPolicy {
            current_year: 2026,
            ..PublicDomainPolicy::default()
        }
    }

    fn binding(inception: Option<&str>, death: Option<&str>) -> SparqlBinding {
        SparqlBinding {
            painting: Some(BindingValue::new("http://www.wikidata.org/entity/Q19911")),
            painting_label: Some(BindingValue::new("The Starry Night")),
            height: Some(BindingValue::new("120.37")),
            width: Some(BindingValue::new("118.2")),
            inception: inception.map(BindingValue::new),
            image: Some(BindingValue::new("http://commons.wikimedia.org/wiki/Special:FilePath/x.jpg")),
            creator_label: Some(BindingValue::new("Vincent van Gogh")),
            creator_death_year: death.map(BindingValue::new),
            location_label: Some(BindingValue::new("Museum of Modern Art")),
            inventory_number: Some(BindingValue::new("472.1941")),
            medium_label: None,
        }
    }

    #[test]
    fn test_transform_full_binding() {
        let transformer = RecordTransformer::new(policy());
        let record = transformer
            .transform(&binding(Some("1889-06-01T00:00:00Z"), Some("1890")))
            .unwrap();

        assert_eq!(record.id, "wikidata-Q19911");
        assert_eq!(record.wikidata_id.as_deref(), Some("Q19911"));
        assert_eq!(record.year_created, Some(1889));
        assert_eq!(record.date_display, "1889");
        assert_eq!(record.artist_death_year, Some(1890));
        assert_eq!(record.medium, DEFAULT_MEDIUM);
        assert_eq!(record.height_cm, Some(120.4));
        assert_eq!(record.width_cm, Some(118.2));
        assert_eq!(record.aspect_ratio, 0.98);
        assert_eq!(record.dimensions_raw, "120 × 118 cm");
        assert_eq!(record.public_domain, PublicDomain::Yes);
        assert!(record.public_domain_basis.contains("1890"));
        assert_eq!(record.source, "wikidata");
        assert!(record.city.is_empty());
    }

    #[test]
    fn test_missing_or_invalid_dimensions_rejected() {
        let transformer = RecordTransformer::new(policy());

        let mut b = binding(Some("1850"), None);
        b.height = None;
        assert!(transformer.transform(&b).is_none());

        let mut b = binding(Some("1850"), None);
        b.width = Some(BindingValue::new("0"));
        assert!(transformer.transform(&b).is_none());

        let mut b = binding(Some("1850"), None);
        b.width = Some(BindingValue::new("-3"));
        assert!(transformer.transform(&b).is_none());

        let mut b = binding(Some("1850"), None);
        b.height = Some(BindingValue::new("tall"));
        assert!(transformer.transform(&b).is_none());
    }

    #[test]
    fn test_creation_year_parsing() {
        assert_eq!(parse_creation_year("1503-01-01T00:00:00Z"), Some(1503));
        assert_eq!(parse_creation_year("-0450-01-01T00:00:00Z"), Some(-450));
        assert_eq!(parse_creation_year("t1234"), None);
        assert_eq!(parse_creation_year("12"), None);
    }

    #[test]
    fn test_bce_record_is_public_domain() {
        let transformer = RecordTransformer::new(policy());
        let record = transformer
            .transform(&binding(Some("-0450-01-01T00:00:00Z"), None))
            .unwrap();
        assert_eq!(record.year_created, Some(-450));
        assert_eq!(record.public_domain, PublicDomain::Yes);
    }

    #[test]
    fn test_design_horizon_rejects_recent_work() {
        let transformer = RecordTransformer::new(policy());
        // Even with an old death year the work itself is past the horizon
        assert!(transformer
            .transform(&binding(Some("1970-01-01T00:00:00Z"), Some("1900")))
            .is_none());
    }

    #[test]
    fn test_death_year_threshold() {
        let p = policy();
        for death in 1940..=1970 {
            let (status, _) = p.assess(Some(death), None);
            assert_eq!(status.is_established(), 2026 - death >= 70, "death year {}", death);
        }
    }

    #[test]
    fn test_creation_era_heuristic() {
        let transformer = RecordTransformer::new(policy());

        let record = transformer.transform(&binding(Some("1850-01-01T00:00:00Z"), None)).unwrap();
        assert_eq!(record.public_domain, PublicDomain::Yes);
        assert!(record.public_domain_basis.contains("1850"));

        // Unknown status survives before the conservative cutoff
        let record = transformer.transform(&binding(Some("1930-01-01T00:00:00Z"), None)).unwrap();
        assert_eq!(record.public_domain, PublicDomain::Unknown);
        assert!(record.public_domain_basis.contains("manual verification"));
    }

    #[test]
    fn test_conservative_cutoff() {
        let transformer = RecordTransformer::new(policy());
        assert!(transformer.transform(&binding(Some("1965-01-01T00:00:00Z"), None)).is_none());

        // Established public domain passes the cutoff
        let record = transformer
            .transform(&binding(Some("1955-01-01T00:00:00Z"), Some("1954")))
            .unwrap();
        assert_eq!(record.public_domain, PublicDomain::Yes);
    }

    #[test]
    fn test_undated_binding_defaults() {
        let transformer = RecordTransformer::new(policy());
        let mut b = binding(None, None);
        b.painting_label = None;
        b.creator_label = None;
        b.location_label = None;
        b.medium_label = Some(BindingValue::new("tempera"));

        let record = transformer.transform(&b).unwrap();
        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.artist, DEFAULT_ARTIST);
        assert_eq!(record.museum, DEFAULT_MUSEUM);
        assert_eq!(record.medium, "tempera");
        assert_eq!(record.date_display, "Unknown");
        assert_eq!(record.public_domain, PublicDomain::Unknown);
    }

    #[test]
    fn test_unresolvable_identifier_rejected() {
        let transformer = RecordTransformer::new(policy());
        let mut b = binding(Some("1850"), None);
        b.painting = Some(BindingValue::new("http://example.org/painting/abc"));
        assert!(transformer.transform(&b).is_none());

        b.painting = None;
        assert!(transformer.transform(&b).is_none());
    }

    #[test]
    fn test_extract_entity_id() {
        assert_eq!(extract_entity_id("http://www.wikidata.org/entity/Q42"), Some("Q42"));
        assert_eq!(extract_entity_id("Q7"), Some("Q7"));
        assert_eq!(extract_entity_id("http://www.wikidata.org/entity/P42"), None);
        assert_eq!(extract_entity_id("http://www.wikidata.org/entity/"), None);
        assert_eq!(extract_entity_id("42"), None);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("1890"), Some(1890));
        assert_eq!(parse_leading_int("1890.0"), Some(1890));
        assert_eq!(parse_leading_int("-44"), Some(-44));
        assert_eq!(parse_leading_int(""), None);
    }
}
