//! # bcdx-gateway
//!
//! User-facing surfaces of the bcdx tumor diagnosis service.
//!
//! This crate provides:
//! - The `bcdx` binary: interactive form, one-shot and JSON modes
//! - Input collection (terminal prompts, presets, JSON records)
//! - Configuration management
//! - HTTP prediction endpoint, Prometheus metrics and health checks

#![warn(missing_docs, rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod collector;
pub mod config;
pub mod metrics;
pub mod server;

pub use config::AppConfig;
pub use metrics::MetricsRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collector::{collect, PresetValues, TerminalPrompt, ValuePrompt};
    pub use crate::config::AppConfig;
    pub use crate::metrics::MetricsRegistry;
}
