//! Pipeline stages as invoked by the binary
//!
//! `fetch` talks to the endpoint and leaves raw window files behind; `merge`
//! only reads local files. They can run separately, e.g. to re-merge after
//! editing the city table without re-querying.

use crate::config::IngestConfig;
use crate::planner::WindowPlanner;
use crate::reconcile::city::CityMapping;
use crate::reconcile::{self, Reconciler, Reconciliation};
use crate::services::ingestion_run::{IngestionReport, IngestionRun, RunPaths};
use crate::services::query_client::QueryExecutor;
use crate::services::record_transformer::RecordTransformer;
use pdg_common::persist::write_json_atomic;
use pdg_common::Result;
use std::path::PathBuf;
use tracing::info;

/// Input and output files of the merge stage
#[derive(Debug, Clone)]
pub struct MergePaths {
    pub raw_dir: PathBuf,
    pub prior_corpus: PathBuf,
    /// Reference table; the bundled one when `None`
    pub city_mapping: Option<PathBuf>,
    pub output: PathBuf,
}

/// Run the ingestion stage against `client`
pub async fn fetch<Q: QueryExecutor>(
    client: &Q,
    config: &IngestConfig,
    paths: RunPaths,
) -> Result<IngestionReport> {
    info!(
        min_size_cm = config.min_size_cm,
        aspect_min = config.aspect_ratio_min,
        aspect_max = config.aspect_ratio_max,
        current_year = config.current_year,
        "Fetching paintings"
    );

    let run = IngestionRun::new(
        client,
        RecordTransformer::new(config.public_domain_policy()),
        WindowPlanner::new(config.min_split_span_years),
        config.batch_delay,
        config.max_split_depth,
        paths,
    );
    run.run().await
}

/// Run the reconciliation stage and write the final corpus
pub fn merge(config: &IngestConfig, paths: &MergePaths) -> Result<Reconciliation> {
    let cities = match &paths.city_mapping {
        Some(path) => CityMapping::load(path)?,
        None => {
            info!("Using bundled city mapping");
            CityMapping::bundled()?
        }
    };
    let incoming = reconcile::load_raw_records(&paths.raw_dir)?;
    let prior = reconcile::load_prior_corpus(&paths.prior_corpus)?;

    let reconciler = Reconciler::new(cities, config.validation_rules());
    let result = reconciler.reconcile(prior, incoming);

    reconcile::log_merge_stats(&result.stats);
    let summary = &result.corpus.summary;
    info!(
        passed = summary.total_accepted,
        rejected = summary.total_rejected,
        museums = summary.by_museum.len(),
        "Validation complete"
    );

    write_json_atomic(&result.corpus, &paths.output)?;
    info!(
        path = %paths.output.display(),
        "Saved {} records",
        summary.total_accepted
    );

    Ok(result)
}
