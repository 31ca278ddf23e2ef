//! Ingestion run driver
//!
//! Walks the top-level windows strictly in order, merges each window's
//! records into a run-global set keyed by source identifier, and persists a
//! raw file per window plus a run log at the end.

use crate::planner::{TimeWindow, WindowPlanner};
use crate::services::query_client::QueryExecutor;
use crate::services::record_transformer::RecordTransformer;
use crate::services::window_fetcher::WindowFetcher;
use pdg_common::models::{ArtworkRecord, RawWindowFile, RunLog, WindowResult};
use pdg_common::persist::write_json_atomic;
use pdg_common::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Output locations of an ingestion run
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Directory receiving one `<window>.json` per top-level window
    pub raw_dir: PathBuf,
    /// Run log file
    pub run_log: PathBuf,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// Globally deduplicated records, in first-seen order
    pub records: Vec<ArtworkRecord>,
    pub log: RunLog,
}

impl IngestionReport {
    pub fn failed_windows(&self) -> impl Iterator<Item = &WindowResult> {
        self.log.windows.iter().filter(|w| w.is_failure())
    }
}

/// State of one ingestion run
///
/// The dedup set and the result log belong to the run; a new run starts
/// from scratch.
pub struct IngestionRun<'a, Q: QueryExecutor> {
    client: &'a Q,
    transformer: RecordTransformer,
    planner: WindowPlanner,
    pacing: Duration,
    max_depth: u32,
    paths: RunPaths,
    seen: HashSet<String>,
    records: Vec<ArtworkRecord>,
    results: Vec<WindowResult>,
}

impl<'a, Q: QueryExecutor> IngestionRun<'a, Q> {
    pub fn new(
        client: &'a Q,
        transformer: RecordTransformer,
        planner: WindowPlanner,
        pacing: Duration,
        max_depth: u32,
        paths: RunPaths,
    ) -> Self {
        Self {
            client,
            transformer,
            planner,
            pacing,
            max_depth,
            paths,
            seen: HashSet::new(),
            records: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Fetch every initial window in order
    ///
    /// Only local I/O failures (raw files, run log) abort the run. Query
    /// failures end up in the run log.
    pub async fn run(mut self) -> Result<IngestionReport> {
        let windows = self.planner.initial_windows();
        info!(windows = windows.len(), "Starting ingestion run");

        std::fs::create_dir_all(&self.paths.raw_dir)?;

        for (i, window) in windows.iter().enumerate() {
            self.ingest_window(window).await?;

            if i + 1 < windows.len() && !self.pacing.is_zero() {
                info!(delay_ms = self.pacing.as_millis() as u64, "Waiting before next window");
                tokio::time::sleep(self.pacing).await;
            }
        }

        let log = RunLog {
            timestamp: pdg_common::time::now(),
            windows: self.results,
            total_unique: self.records.len(),
        };
        write_json_atomic(&log, &self.paths.run_log)?;

        info!(total_unique = log.total_unique, "Fetch summary");
        for result in &log.windows {
            match &result.error {
                Some(error) => info!(
                    window = %result.name,
                    error = %crate::services::query_client::truncate_diagnostic(error, 80),
                    "Window FAILED"
                ),
                None => info!(window = %result.name, count = result.count, "Window ok"),
            }
        }
        info!(
            path = %self.paths.raw_dir.display(),
            "Saved {} records across {} windows",
            log.total_unique,
            log.windows.len()
        );

        Ok(IngestionReport {
            records: self.records,
            log,
        })
    }

    async fn ingest_window(&mut self, window: &TimeWindow) -> Result<()> {
        let fetcher = WindowFetcher::new(
            self.client,
            &self.transformer,
            &self.planner,
            self.pacing,
            self.max_depth,
        );
        let window_records = fetcher.fetch_with_retry(window, 0, &mut self.results).await;

        for record in &window_records {
            if let Some(id) = &record.wikidata_id {
                if self.seen.insert(id.clone()) {
                    self.records.push(record.clone());
                }
            }
        }

        let raw = RawWindowFile {
            window: window.name.clone(),
            count: window_records.len(),
            records: window_records,
        };
        write_json_atomic(&raw, &self.paths.raw_dir.join(format!("{}.json", window.name)))?;

        Ok(())
    }
}
