//! Window fetching with retry-by-decomposition
//!
//! A failed window is never re-sent as-is. It is split into smaller windows
//! (see [`WindowPlanner::split`]) and each part is fetched after a pacing
//! delay, down to a bounded depth. A window that still fails is recorded and
//! contributes nothing; the run carries on.

use crate::planner::{TimeWindow, WindowPlanner};
use crate::services::query_client::{
    truncate_diagnostic, QueryError, QueryExecutor, MAX_DIAGNOSTIC_CHARS,
};
use crate::services::record_transformer::RecordTransformer;
use futures::future::BoxFuture;
use pdg_common::models::{ArtworkRecord, WindowResult};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Fetches windows, splitting the ones that fail
pub struct WindowFetcher<'a, Q: QueryExecutor> {
    client: &'a Q,
    transformer: &'a RecordTransformer,
    planner: &'a WindowPlanner,
    pacing: Duration,
    max_depth: u32,
}

impl<'a, Q: QueryExecutor> WindowFetcher<'a, Q> {
    pub fn new(
        client: &'a Q,
        transformer: &'a RecordTransformer,
        planner: &'a WindowPlanner,
        pacing: Duration,
        max_depth: u32,
    ) -> Self {
        Self {
            client,
            transformer,
            planner,
            pacing,
            max_depth,
        }
    }

    /// Query one window and transform its bindings
    ///
    /// Records are deduplicated by source identifier, first occurrence wins.
    pub async fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<ArtworkRecord>, QueryError> {
        let bindings = self.client.execute(&window.predicate).await?;

        let mut seen = HashSet::new();
        let records = bindings
            .iter()
            .filter_map(|b| self.transformer.transform(b))
            .filter(|r| match &r.wikidata_id {
                Some(id) => seen.insert(id.clone()),
                None => false,
            })
            .collect();

        Ok(records)
    }

    /// Fetch a window, splitting and recursing on failure
    ///
    /// Every terminal attempt (success, or failure that cannot be split
    /// further) appends one entry to `results`.
    pub fn fetch_with_retry<'b>(
        &'b self,
        window: &'b TimeWindow,
        depth: u32,
        results: &'b mut Vec<WindowResult>,
    ) -> BoxFuture<'b, Vec<ArtworkRecord>> {
        Box::pin(async move {
            info!(window = %window.name, depth, "Fetching window");
            let start = Instant::now();

            let error = match self.fetch_window(window).await {
                Ok(records) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    info!(
                        window = %window.name,
                        count = records.len(),
                        duration_ms,
                        "Window fetched"
                    );
                    results.push(WindowResult {
                        name: window.name.clone(),
                        count: records.len(),
                        duration_ms,
                        error: None,
                    });
                    return records;
                }
                Err(e) => e,
            };

            let duration_ms = start.elapsed().as_millis() as u64;
            let message = error.to_string();
            warn!(
                window = %window.name,
                duration_ms,
                error = %truncate_diagnostic(&message, 200),
                "Window fetch failed"
            );

            let parts = self.planner.split(window);
            if parts.len() <= 1 || depth >= self.max_depth {
                warn!(window = %window.name, depth, "Cannot split window further, skipping");
                results.push(WindowResult {
                    name: window.name.clone(),
                    count: 0,
                    duration_ms,
                    error: Some(truncate_diagnostic(&message, MAX_DIAGNOSTIC_CHARS)),
                });
                return Vec::new();
            }

            info!(
                window = %window.name,
                parts = parts.len(),
                "Retrying window as smaller windows"
            );

            let mut records = Vec::new();
            for part in &parts {
                tokio::time::sleep(self.pacing).await;
                records.extend(self.fetch_with_retry(part, depth + 1, results).await);
            }
            records
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query_client::{BindingValue, SparqlBinding};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails every predicate in `failing`, returns `rows` otherwise
    struct ScriptedClient {
        failing: Vec<String>,
        rows: Vec<SparqlBinding>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryExecutor for ScriptedClient {
        async fn execute(&self, predicate: &str) -> Result<Vec<SparqlBinding>, QueryError> {
            self.calls.lock().unwrap().push(predicate.to_string());
            if self.failing.iter().any(|p| p == predicate) {
                return Err(QueryError::Timeout(Duration::from_secs(75)));
            }
            Ok(self.rows.clone())
        }
    }

    fn row(qid: &str) -> SparqlBinding {
        SparqlBinding {
            painting: Some(BindingValue::new(format!("http://www.wikidata.org/entity/{}", qid))),
            height: Some(BindingValue::new("150")),
            width: Some(BindingValue::new("150")),
            inception: Some(BindingValue::new("1850-01-01T00:00:00Z")),
            image: Some(BindingValue::new("http://example.org/a.jpg")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dedup_within_window() {
        let client = ScriptedClient {
            failing: vec![],
            rows: vec![row("Q1"), row("Q2"), row("Q1")],
            calls: Mutex::new(Vec::new()),
        };
        let transformer = RecordTransformer::default();
        let planner = WindowPlanner::default();
        let fetcher = WindowFetcher::new(&client, &transformer, &planner, Duration::ZERO, 2);

        let records = fetcher.fetch_window(&TimeWindow::years(1800, 1899)).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["wikidata-Q1", "wikidata-Q2"]);
    }

    #[tokio::test]
    async fn test_unsplittable_failure_recorded() {
        let undated = TimeWindow::undated();
        let client = ScriptedClient {
            failing: vec![undated.predicate.clone()],
            rows: vec![row("Q1")],
            calls: Mutex::new(Vec::new()),
        };
        let transformer = RecordTransformer::default();
        let planner = WindowPlanner::default();
        let fetcher = WindowFetcher::new(&client, &transformer, &planner, Duration::ZERO, 2);

        let mut results = Vec::new();
        let records = fetcher.fetch_with_retry(&undated, 0, &mut results).await;

        assert!(records.is_empty());
        assert_eq!(results.len(), 1);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }
}
