//! # bcdx-core
//!
//! Core types, traits, and the canonical feature table for the bcdx tumor
//! diagnosis service.
//!
//! This crate provides:
//! - The 30-entry feature table mapping form identifiers to trained names
//! - `FeatureRecord`, one patient's measurements keyed by identifier
//! - `Scaler` and `Classifier` traits implemented by the model artifacts
//! - The shared `Error` type
//!
//! ## Example
//!
//! ```rust
//! use bcdx_core::features;
//! use bcdx_core::record::FeatureRecord;
//!
//! let record = FeatureRecord::defaults();
//! assert_eq!(record.get("radius_mean"), Some(14.0));
//! assert_eq!(features::trained_name("radius_mean"), Some("mean radius"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod error;
pub mod features;
pub mod record;
pub mod traits;

pub use constants::*;
pub use error::{Error, Result};
pub use features::FeatureSpec;
pub use record::{FeatureRecord, FeatureRecordBuilder};
pub use traits::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::constants::*;
    pub use crate::error::{Error, Result};
    pub use crate::features::{self, FeatureSpec};
    pub use crate::record::{FeatureRecord, FeatureRecordBuilder};
    pub use crate::traits::*;
}
