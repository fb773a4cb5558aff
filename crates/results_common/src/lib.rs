//! Shared types for the exam results service.
//!
//! Holds the record model, the three-way view state, configuration loading
//! and the read-only SQLite store used by `resultsd`.

pub mod config;
pub mod record;
pub mod store;

pub use config::{Config, ConfigError, DataConfig, ProvisionConfig, ServerConfig};
pub use record::{Degree, Record, ViewState};
pub use store::{LookupError, ResultsStore, SchemaReport};
