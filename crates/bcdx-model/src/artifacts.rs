//! Startup artifact loading and validation.
//!
//! [`Artifacts`] is built once before any prediction is served and is
//! read-only afterwards, so it can be shared behind an `Arc` by any number of
//! concurrent requests without locking.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use bcdx_core::constants::NUM_FEATURES;
use bcdx_core::error::{Error, Result};
use bcdx_core::features;
use bcdx_core::record::FeatureRecord;
use bcdx_core::traits::{Classifier, Scaler};
use serde::{Deserialize, Serialize};

use crate::decision::{render, Decision};
use crate::inference::{DenseNetwork, InferenceStats};
use crate::pipeline;
use crate::preprocessing::StandardScaler;

/// On-disk classifier format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFormat {
    /// Dense network JSON evaluated with `ndarray`
    #[default]
    DenseJson,
    /// ONNX graph evaluated with ONNX Runtime (requires the `onnx` feature)
    Onnx,
}

impl std::str::FromStr for ModelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dense-json" | "json" => Ok(ModelFormat::DenseJson),
            "onnx" => Ok(ModelFormat::Onnx),
            other => Err(Error::ConfigError(format!("unknown model format {other:?}"))),
        }
    }
}

/// Result of one diagnosis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    /// Label, probability and display text
    #[serde(flatten)]
    pub decision: Decision,
    /// Time spent in the pipeline (nanoseconds)
    pub latency_ns: u64,
}

/// The fitted scaler and trained classifier, validated against each other
/// and against the feature table
pub struct Artifacts {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    stats: InferenceStats,
}

impl fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifacts")
            .field("features", &self.scaler.feature_names().len())
            .field("classifier", &self.classifier.name())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Artifacts {
    /// Pair a scaler with a classifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureOrderMismatch`] if the scaler's feature order
    /// is not a permutation of the feature table, or
    /// [`Error::ShapeMismatch`] if the classifier's input width is not
    /// [`NUM_FEATURES`].
    pub fn new(
        scaler: impl Scaler + 'static,
        classifier: impl Classifier + 'static,
    ) -> Result<Self> {
        Self::from_boxed(Box::new(scaler), Box::new(classifier))
    }

    /// Same as [`Artifacts::new`] for already boxed artifacts
    ///
    /// # Errors
    ///
    /// See [`Artifacts::new`].
    pub fn from_boxed(scaler: Box<dyn Scaler>, classifier: Box<dyn Classifier>) -> Result<Self> {
        features::validate_order(scaler.feature_names())?;

        if classifier.input_dim() != NUM_FEATURES {
            return Err(Error::ShapeMismatch {
                expected: format!("classifier with {NUM_FEATURES} inputs"),
                actual: format!(
                    "{} with {} inputs",
                    classifier.name(),
                    classifier.input_dim()
                ),
            });
        }

        Ok(Self {
            scaler,
            classifier,
            stats: InferenceStats::default(),
        })
    }

    /// Load and validate both artifacts from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactLoad`] naming the offending file for a
    /// missing or corrupt artifact or an artifact pair that does not match
    /// the feature table.
    pub fn load(
        scaler_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
        format: ModelFormat,
    ) -> Result<Self> {
        let scaler_path = scaler_path.as_ref();
        let model_path = model_path.as_ref();

        let scaler = StandardScaler::load(scaler_path)?;
        let classifier: Box<dyn Classifier> = match format {
            ModelFormat::DenseJson => Box::new(DenseNetwork::load(model_path)?),
            ModelFormat::Onnx => load_onnx(model_path)?,
        };

        let artifacts = Self::from_boxed(Box::new(scaler), classifier).map_err(|e| match e {
            Error::FeatureOrderMismatch(_) => Error::artifact(scaler_path, e),
            other => Error::artifact(model_path, other),
        })?;

        tracing::info!(
            scaler = %scaler_path.display(),
            model = %model_path.display(),
            classifier = artifacts.classifier.name(),
            "Artifacts ready"
        );
        Ok(artifacts)
    }

    /// The fitted scaler
    #[must_use]
    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    /// The trained classifier
    #[must_use]
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Inference counters
    #[must_use]
    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    /// Probability of malignancy for one record.
    ///
    /// # Errors
    ///
    /// See [`pipeline::predict`].
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64> {
        pipeline::predict(record, self.scaler.as_ref(), self.classifier.as_ref())
    }

    /// Predict, apply the decision rule and time the whole request.
    ///
    /// # Errors
    ///
    /// See [`pipeline::predict`]. Failures are counted, never replaced by a
    /// default prediction.
    #[allow(clippy::cast_possible_truncation)]
    pub fn diagnose(&self, record: &FeatureRecord) -> Result<Diagnosis> {
        let start = Instant::now();
        match self.predict(record) {
            Ok(probability) => {
                let latency_ns = start.elapsed().as_nanos() as u64;
                self.stats.record(latency_ns);
                let decision = render(probability);
                tracing::debug!(
                    label = %decision.label,
                    probability,
                    latency_ns,
                    "Diagnosis"
                );
                Ok(Diagnosis {
                    decision,
                    latency_ns,
                })
            }
            Err(e) => {
                self.stats.record_error();
                tracing::warn!(error = %e, "Prediction failed");
                Err(e)
            }
        }
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<Box<dyn Classifier>> {
    Ok(Box::new(crate::inference::OnnxModel::load(path, NUM_FEATURES)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<Box<dyn Classifier>> {
    Err(Error::artifact(
        path,
        "ONNX models require building with the `onnx` feature",
    ))
}
