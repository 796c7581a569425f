//! # bcdx-model
//!
//! Model artifacts and the inference pipeline for tumor diagnosis.
//!
//! This crate provides:
//! - `StandardScaler`, the fitted feature standardization
//! - `DenseNetwork` (and `OnnxModel` with the `onnx` feature) classifiers
//! - `Artifacts`, the validated scaler/classifier pair loaded at startup
//! - The rename, reorder, scale, classify pipeline and the 0.5 decision rule
//!
//! ## Example
//!
//! ```rust,ignore
//! use bcdx_core::record::FeatureRecord;
//! use bcdx_model::artifacts::{Artifacts, ModelFormat};
//!
//! let artifacts = Artifacts::load("scaler.json", "model.json", ModelFormat::DenseJson)?;
//! let diagnosis = artifacts.diagnose(&FeatureRecord::defaults())?;
//! println!("{}", diagnosis.decision);
//! ```

#![warn(missing_docs, rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

pub mod artifacts;
pub mod decision;
pub mod inference;
pub mod pipeline;
pub mod preprocessing;

pub use artifacts::{Artifacts, Diagnosis, ModelFormat};
pub use decision::{render, Decision, Label};
pub use inference::{Activation, DenseLayer, DenseNetwork, InferenceStats};
#[cfg(feature = "onnx")]
pub use inference::OnnxModel;
pub use preprocessing::StandardScaler;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifacts::{Artifacts, Diagnosis, ModelFormat};
    pub use crate::decision::{render, Decision, Label};
    pub use crate::inference::{DenseNetwork, InferenceStats};
    pub use crate::preprocessing::StandardScaler;
}
