//! Brand-mention monitoring pipeline: ingest, filter and dedupe, classify,
//! aggregate, alert, persist and export.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod intelligence;
pub mod llm;
pub mod models;
pub mod processing;
pub mod services;
pub mod sources;
pub mod state;

pub use error::{PulseError, Result};
