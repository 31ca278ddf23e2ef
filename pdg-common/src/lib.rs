//! # Public-Domain Gallery Common Library
//!
//! Shared code for the catalog pipeline:
//! - Corpus data model (records, raw window files, run log)
//! - Configuration loading and root folder layout
//! - Error types
//! - Atomic JSON persistence
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod time;

pub use error::{Error, Result};
pub use models::{ArtworkRecord, CorpusFile, PublicDomain};
