//! Corpus reconciliation
//!
//! Merges freshly ingested records into the prior corpus, resolves cities,
//! validates, sorts and summarizes. The prior corpus always wins ties: its
//! records are never replaced, only enriched.

pub mod city;
pub mod identity;
pub mod validation;

use crate::reconcile::city::CityMapping;
use crate::reconcile::identity::{IdentityIndex, MatchTier};
use crate::reconcile::validation::ValidationRules;
use pdg_common::models::{
    ArtworkRecord, CorpusFile, CorpusSummary, PriorCorpus, RawWindowFile, DEFAULT_MEDIUM,
    DEFAULT_MUSEUM,
};
use pdg_common::persist::{read_json, read_json_optional};
use pdg_common::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Unmapped museums listed in the log
const UNMAPPED_REPORT_LIMIT: usize = 30;

/// Counters from one merge pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStats {
    pub prior: usize,
    pub incoming: usize,
    pub added_new: usize,
    pub duplicates_source_id: usize,
    pub duplicates_title_museum: usize,
    pub duplicates_title_artist: usize,
    /// Prior records whose medium was backfilled
    pub updated_existing: usize,
    pub cities_mapped: usize,
    /// Museums left without a city, most frequent first
    pub unmapped_museums: Vec<(String, usize)>,
}

impl MergeStats {
    pub fn duplicates(&self) -> usize {
        self.duplicates_source_id + self.duplicates_title_museum + self.duplicates_title_artist
    }
}

/// Output of [`Reconciler::reconcile`]
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub corpus: CorpusFile,
    pub stats: MergeStats,
}

/// Three-tier merge, city resolution, validation and ordering
pub struct Reconciler {
    cities: CityMapping,
    rules: ValidationRules,
}

impl Reconciler {
    pub fn new(cities: CityMapping, rules: ValidationRules) -> Self {
        Self { cities, rules }
    }

    /// Merge `incoming` into `prior` and produce the final corpus
    pub fn reconcile(&self, prior: Vec<ArtworkRecord>, incoming: Vec<ArtworkRecord>) -> Reconciliation {
        let mut stats = MergeStats {
            prior: prior.len(),
            incoming: incoming.len(),
            ..MergeStats::default()
        };

        let mut merged = self.merge(prior, incoming, &mut stats);
        self.assign_cities(&mut merged, &mut stats);

        let mut accepted = Vec::with_capacity(merged.len());
        let mut rejected_by_reason: BTreeMap<String, usize> = BTreeMap::new();
        for record in merged {
            match self.rules.check(&record) {
                Ok(()) => accepted.push(record),
                Err(reason) => {
                    debug!(id = %record.id, reason = %reason, "Record rejected");
                    *rejected_by_reason.entry(reason.kind().to_string()).or_default() += 1;
                }
            }
        }
        let total_rejected = rejected_by_reason.values().sum();

        sort_records(&mut accepted);

        let mut by_museum = BTreeMap::new();
        let mut by_city = BTreeMap::new();
        for record in &accepted {
            *by_museum.entry(label_or_unknown(&record.museum)).or_insert(0) += 1;
            *by_city.entry(label_or_unknown(&record.city)).or_insert(0) += 1;
        }

        let summary = CorpusSummary {
            total_accepted: accepted.len(),
            total_rejected,
            with_images: accepted.len(),
            by_museum,
            by_city,
            rejected_by_reason,
            consolidated_at: pdg_common::time::now(),
        };

        Reconciliation {
            corpus: CorpusFile {
                summary,
                records: accepted,
            },
            stats,
        }
    }

    fn merge(
        &self,
        prior: Vec<ArtworkRecord>,
        incoming: Vec<ArtworkRecord>,
        stats: &mut MergeStats,
    ) -> Vec<ArtworkRecord> {
        let mut index = IdentityIndex::new();
        let mut merged = Vec::with_capacity(prior.len() + incoming.len());

        for record in prior {
            index.register(&record, merged.len());
            merged.push(record);
        }

        for record in incoming {
            match index.find(&record) {
                Some((MatchTier::SourceId, idx)) => {
                    if backfill_medium(&mut merged[idx], &record) {
                        stats.updated_existing += 1;
                    }
                    stats.duplicates_source_id += 1;
                }
                Some((MatchTier::TitleMuseum, _)) => stats.duplicates_title_museum += 1,
                Some((MatchTier::TitleArtist, _)) => stats.duplicates_title_artist += 1,
                None => {
                    index.register(&record, merged.len());
                    merged.push(record);
                    stats.added_new += 1;
                }
            }
        }

        merged
    }

    fn assign_cities(&self, records: &mut [ArtworkRecord], stats: &mut MergeStats) {
        let mut unmapped: HashMap<String, usize> = HashMap::new();

        for record in records.iter_mut() {
            if record.city.is_empty() {
                if let Some(city) = self.cities.city_for_museum(&record.museum) {
                    record.city = city.to_string();
                    stats.cities_mapped += 1;
                }
            }
            record.city_rank = Some(self.cities.rank_for_city(&record.city));

            if record.city.is_empty() && !record.museum.is_empty() && record.museum != DEFAULT_MUSEUM {
                *unmapped.entry(record.museum.clone()).or_insert(0) += 1;
            }
        }

        let mut unmapped: Vec<(String, usize)> = unmapped.into_iter().collect();
        unmapped.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats.unmapped_museums = unmapped;
    }
}

/// Copy a specific medium over the generic placeholder
fn backfill_medium(existing: &mut ArtworkRecord, incoming: &ArtworkRecord) -> bool {
    let existing_generic = existing.medium.is_empty() || existing.medium == DEFAULT_MEDIUM;
    let incoming_specific = !incoming.medium.is_empty() && incoming.medium != DEFAULT_MEDIUM;
    if existing_generic && incoming_specific {
        existing.medium = incoming.medium.clone();
        true
    } else {
        false
    }
}

fn label_or_unknown(label: &str) -> String {
    if label.is_empty() {
        DEFAULT_MUSEUM.to_string()
    } else {
        label.to_string()
    }
}

/// Order by city rank, museum, creation year (missing year sorts as 0)
pub fn sort_records(records: &mut [ArtworkRecord]) {
    records.sort_by(|a, b| {
        let rank_a = a.city_rank.unwrap_or(pdg_common::models::DEFAULT_CITY_RANK);
        let rank_b = b.city_rank.unwrap_or(pdg_common::models::DEFAULT_CITY_RANK);
        rank_a
            .cmp(&rank_b)
            .then_with(|| a.museum.cmp(&b.museum))
            .then_with(|| a.year_created.unwrap_or(0).cmp(&b.year_created.unwrap_or(0)))
    });
}

/// Read every `*.json` raw window file in `raw_dir`, in file-name order
pub fn load_raw_records(raw_dir: &Path) -> Result<Vec<ArtworkRecord>> {
    let entries = std::fs::read_dir(raw_dir)?.collect::<std::io::Result<Vec<_>>>()?;
    let mut files: Vec<_> = entries
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    info!(files = files.len(), dir = %raw_dir.display(), "Reading raw window files");

    let mut records = Vec::new();
    for path in files {
        let raw: RawWindowFile = read_json(&path)?;
        info!(window = %raw.window, count = raw.records.len(), "Loaded raw window");
        records.extend(raw.records);
    }

    info!(total = records.len(), "Records from raw windows");
    Ok(records)
}

/// Read the prior corpus; absent on a first run
pub fn load_prior_corpus(path: &Path) -> Result<Vec<ArtworkRecord>> {
    match read_json_optional::<PriorCorpus>(path)? {
        Some(prior) => {
            info!(records = prior.records.len(), "Loaded prior corpus");
            Ok(prior.records)
        }
        None => {
            info!(path = %path.display(), "No prior corpus found, starting fresh");
            Ok(Vec::new())
        }
    }
}

/// Log merge counters and the most frequent unmapped museums
pub fn log_merge_stats(stats: &MergeStats) {
    info!(
        prior = stats.prior,
        incoming = stats.incoming,
        added_new = stats.added_new,
        duplicates = stats.duplicates(),
        by_source_id = stats.duplicates_source_id,
        by_title_museum = stats.duplicates_title_museum,
        by_title_artist = stats.duplicates_title_artist,
        updated_existing = stats.updated_existing,
        "Deduplication complete"
    );
    info!(cities_mapped = stats.cities_mapped, "City mapping applied");

    if !stats.unmapped_museums.is_empty() {
        info!("Unmapped museums ({}):", stats.unmapped_museums.len());
        for (museum, count) in stats.unmapped_museums.iter().take(UNMAPPED_REPORT_LIMIT) {
            info!("  {}: {}", museum, count);
        }
        if stats.unmapped_museums.len() > UNMAPPED_REPORT_LIMIT {
            info!("  ... and {} more", stats.unmapped_museums.len() - UNMAPPED_REPORT_LIMIT);
        }
    }
}
