//! Museum → city resolution and city sort ranks

use pdg_common::models::DEFAULT_CITY_RANK;
use pdg_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const BUNDLED_CITY_MAPPING: &str = include_str!("../../data/city-mapping.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityMappingFile {
    museum_cities: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    city_ranks: HashMap<String, u32>,
}

/// Static reference tables for city resolution
#[derive(Debug, Clone, Default)]
pub struct CityMapping {
    /// Museum → city in table order; the fuzzy lookup scans this
    museum_cities: Vec<(String, String)>,
    exact: HashMap<String, String>,
    city_ranks: HashMap<String, u32>,
}

impl CityMapping {
    pub fn new(
        museum_cities: impl IntoIterator<Item = (String, String)>,
        city_ranks: HashMap<String, u32>,
    ) -> Self {
        let museum_cities: Vec<(String, String)> = museum_cities.into_iter().collect();
        let mut exact = HashMap::with_capacity(museum_cities.len());
        for (museum, city) in &museum_cities {
            exact.entry(museum.clone()).or_insert_with(|| city.clone());
        }
        Self {
            museum_cities,
            exact,
            city_ranks,
        }
    }

    /// Load `{ "museumCities": {...}, "cityRanks": {...} }` from a file
    ///
    /// Failure here halts the pipeline: without the tables the corpus
    /// cannot be ordered.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read city mapping {}: {}", path.display(), e))
        })?;
        let mapping = Self::from_json(&content).map_err(|e| {
            Error::Config(format!("Invalid city mapping {}: {}", path.display(), e))
        })?;

        tracing::info!(
            museums = mapping.len(),
            cities = mapping.city_ranks.len(),
            path = %path.display(),
            "Loaded city mapping"
        );
        Ok(mapping)
    }

    /// Parse the mapping document, keeping museum entries in document order
    pub fn from_json(content: &str) -> Result<Self> {
        let file: CityMappingFile = serde_json::from_str(content)?;

        let mut museum_cities = Vec::with_capacity(file.museum_cities.len());
        for (museum, city) in file.museum_cities {
            let city = city.as_str().ok_or_else(|| {
                Error::InvalidInput(format!("City for museum '{}' is not a string", museum))
            })?;
            museum_cities.push((museum, city.to_string()));
        }

        Ok(Self::new(museum_cities, file.city_ranks))
    }

    /// Reference table shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CITY_MAPPING)
    }

    pub fn len(&self) -> usize {
        self.museum_cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.museum_cities.is_empty()
    }

    /// City for a museum name
    ///
    /// Exact match first, then case-insensitive containment in either
    /// direction. The first table entry that matches wins, even when a later
    /// entry would be a closer match.
    pub fn city_for_museum(&self, museum: &str) -> Option<&str> {
        if museum.is_empty() {
            return None;
        }
        if let Some(city) = self.exact.get(museum) {
            return Some(city.as_str());
        }

        let museum_lower = museum.to_lowercase();
        self.museum_cities
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .find(|(key, _)| {
                let key_lower = key.to_lowercase();
                museum_lower.contains(&key_lower) || key_lower.contains(&museum_lower)
            })
            .map(|(_, city)| city.as_str())
    }

    /// Sort rank for a city, 999 when unranked
    pub fn rank_for_city(&self, city: &str) -> u32 {
        self.city_ranks.get(city).copied().unwrap_or(DEFAULT_CITY_RANK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> CityMapping {
        CityMapping::new(
            vec![
                ("Louvre".to_string(), "Paris".to_string()),
                ("Musée du Louvre".to_string(), "Paris".to_string()),
                ("National Gallery".to_string(), "London".to_string()),
                ("National Gallery of Art".to_string(), "Washington".to_string()),
            ],
            HashMap::from([("Paris".to_string(), 2), ("London".to_string(), 3)]),
        )
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(mapping().city_for_museum("National Gallery of Art"), Some("Washington"));
    }

    #[test]
    fn test_substring_match_either_direction() {
        let m = mapping();
        assert_eq!(m.city_for_museum("the louvre museum"), Some("Paris"));
        assert_eq!(m.city_for_museum("LOUV"), Some("Paris"));
    }

    #[test]
    fn test_first_match_wins_over_best_match() {
        // "National Gallery" precedes the closer "National Gallery of Art"
        assert_eq!(
            mapping().city_for_museum("National Gallery of Art, East Building"),
            Some("London")
        );
    }

    #[test]
    fn test_no_match() {
        let m = mapping();
        assert_eq!(m.city_for_museum("Rijksmuseum"), None);
        assert_eq!(m.city_for_museum(""), None);
    }

    #[test]
    fn test_from_json_keeps_document_order() {
        let m = CityMapping::from_json(
            r#"{
                "museumCities": {
                    "Zeta Hall": "Rome",
                    "Alpha Hall": "Madrid"
                },
                "cityRanks": {"Rome": 4}
            }"#,
        )
        .unwrap();

        // Both keys contain "hall"; document order decides
        assert_eq!(m.city_for_museum("hall"), Some("Rome"));
        assert_eq!(m.rank_for_city("Rome"), 4);
    }

    #[test]
    fn test_from_json_rejects_non_string_city() {
        assert!(CityMapping::from_json(r#"{"museumCities": {"Louvre": 1}}"#).is_err());
    }

    #[test]
    fn test_bundled_table_parses() {
        let m = CityMapping::bundled().unwrap();
        assert!(!m.is_empty());
        assert_eq!(m.city_for_museum("Louvre Museum"), Some("Paris"));
        assert!(m.rank_for_city("Paris") < DEFAULT_CITY_RANK);
    }

    #[test]
    fn test_rank_defaults() {
        let m = mapping();
        assert_eq!(m.rank_for_city("Paris"), 2);
        assert_eq!(m.rank_for_city("Washington"), DEFAULT_CITY_RANK);
        assert_eq!(m.rank_for_city(""), DEFAULT_CITY_RANK);
    }
}
