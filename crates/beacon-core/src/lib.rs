//! Beacon Core - Shared data types for beacon signals
//!
//! This crate provides the plain data that flows through signals:
//! - `SignalData` - immutable value + metadata envelope
//! - `Params` - type-erased metadata with checked retrieval
//! - `SignalConfig` - per-signal tunables, loadable from TOML
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod data;
pub mod error;
pub mod params;

// Re-exports for convenience
pub use config::{SignalConfig, DEFAULT_CAPACITY};
pub use data::SignalData;
pub use error::{ConfigError, ConfigResult};
pub use params::{ParamValue, Params};
