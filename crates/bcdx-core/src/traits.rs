//! Traits implemented by the model artifacts.
//!
//! The inference pipeline only talks to these traits, so any fitted scaler or
//! trained classifier (or a test double) can be plugged in.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::Result;

/// A fitted feature transform
pub trait Scaler: Send + Sync {
    /// Trained feature names in the exact order `transform` expects
    fn feature_names(&self) -> &[String];

    /// Transform one correctly ordered row into a normalized row of the same length
    fn transform(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>>;
}

/// A trained binary classifier
pub trait Classifier: Send + Sync {
    /// Human-readable model name for logging
    fn name(&self) -> &str;

    /// Number of input features the model was trained on
    fn input_dim(&self) -> usize;

    /// Forward pass over a batch of normalized rows.
    ///
    /// Returns one output row per input row, with one column per output unit.
    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}
