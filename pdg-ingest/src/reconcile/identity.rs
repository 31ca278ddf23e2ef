//! Three-tier identity index
//!
//! Tier 1 is the source identifier. Tiers 2 and 3 are heuristic keys built
//! from normalized text: title + museum and title + artist. The three maps
//! always point at the same record positions and are only ever updated
//! together through [`IdentityIndex::register`].

use pdg_common::models::ArtworkRecord;
use std::collections::HashMap;

/// Which identity key matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    SourceId,
    TitleMuseum,
    TitleArtist,
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_museum_key(record: &ArtworkRecord) -> String {
    format!("{}|||{}", normalize(&record.title), normalize(&record.museum))
}

fn title_artist_key(record: &ArtworkRecord) -> String {
    format!("{}|||{}", normalize(&record.title), normalize(&record.artist))
}

/// Key → position maps over a record list
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_source_id: HashMap<String, usize>,
    by_title_museum: HashMap<String, usize>,
    by_title_artist: HashMap<String, usize>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an existing record for `record`, strongest tier first
    pub fn find(&self, record: &ArtworkRecord) -> Option<(MatchTier, usize)> {
        if let Some(idx) = record
            .wikidata_id
            .as_ref()
            .and_then(|id| self.by_source_id.get(id))
        {
            return Some((MatchTier::SourceId, *idx));
        }
        if let Some(idx) = self.by_title_museum.get(&title_museum_key(record)) {
            return Some((MatchTier::TitleMuseum, *idx));
        }
        if let Some(idx) = self.by_title_artist.get(&title_artist_key(record)) {
            return Some((MatchTier::TitleArtist, *idx));
        }
        None
    }

    /// Register all keys of the record at `position`
    ///
    /// Keys already present keep their original position.
    pub fn register(&mut self, record: &ArtworkRecord, position: usize) {
        if let Some(id) = &record.wikidata_id {
            self.by_source_id.entry(id.clone()).or_insert(position);
        }
        self.by_title_museum
            .entry(title_museum_key(record))
            .or_insert(position);
        self.by_title_artist
            .entry(title_artist_key(record))
            .or_insert(position);
    }
}
