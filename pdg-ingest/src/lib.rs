//! pdg-ingest library interface
//!
//! Ingestion (windowed SPARQL fetch with retry-by-decomposition) and
//! reconciliation (three-tier merge, city resolution, validation) of the
//! public-domain painting catalog.

pub mod config;
pub mod pipeline;
pub mod planner;
pub mod reconcile;
pub mod services;

pub use crate::config::IngestConfig;
pub use crate::planner::{TimeWindow, WindowPlanner};
pub use crate::reconcile::{Reconciler, Reconciliation};
