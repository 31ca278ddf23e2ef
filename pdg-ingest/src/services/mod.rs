//! Ingestion services
//!
//! Leaves first: the query client and record transformer are composed by
//! the window fetcher, which the ingestion run drives over all windows.

pub mod ingestion_run;
pub mod query_client;
pub mod record_transformer;
pub mod window_fetcher;

pub use ingestion_run::{IngestionReport, IngestionRun, RunPaths};
pub use query_client::{QueryError, QueryExecutor, SparqlBinding, SparqlClient};
pub use record_transformer::{PublicDomainPolicy, RecordTransformer};
pub use window_fetcher::WindowFetcher;
