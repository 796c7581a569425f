//! Feature standardization.

use std::path::Path;

use bcdx_core::error::{Error, Result};
use bcdx_core::traits::Scaler;
use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Fitted standardization transform: `(x - mean) / scale` per feature.
///
/// The on-disk form mirrors the attributes of a fitted scikit-learn
/// `StandardScaler` (`feature_names_in_`, `mean_`, `scale_`). Every
/// deserialization goes through [`StandardScaler::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerFile")]
pub struct StandardScaler {
    /// Feature names in transform order
    #[serde(rename = "feature_names_in")]
    feature_names: Vec<String>,
    /// Per-feature means
    mean: Vec<f64>,
    /// Per-feature scales (standard deviations)
    scale: Vec<f64>,
}

/// Unvalidated scaler statistics as read from disk
#[derive(Deserialize)]
struct ScalerFile {
    #[serde(rename = "feature_names_in", alias = "feature_names_in_")]
    feature_names: Vec<String>,
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

impl TryFrom<ScalerFile> for StandardScaler {
    type Error = Error;

    fn try_from(file: ScalerFile) -> Result<Self> {
        Self::new(file.feature_names, file.mean, file.scale)
    }
}

impl StandardScaler {
    /// Create a scaler from pre-computed statistics.
    ///
    /// Zero scales are replaced by 1 so constant features pass through
    /// centred but unscaled.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ShapeMismatch`] if the three vectors differ in
    /// length, or [`Error::SerializationError`] for non-finite statistics or
    /// repeated names.
    pub fn new(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let n = feature_names.len();
        if mean.len() != n || scale.len() != n {
            return Err(Error::ShapeMismatch {
                expected: format!("{n} means and scales"),
                actual: format!("{} means, {} scales", mean.len(), scale.len()),
            });
        }

        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(Error::SerializationError(format!(
                    "feature {name:?} listed twice"
                )));
            }
        }

        if let Some(bad) = mean.iter().chain(&scale).find(|v| !v.is_finite()) {
            return Err(Error::SerializationError(format!(
                "non-finite scaler statistic {bad}"
            )));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    /// Scaler that leaves values untouched
    #[must_use]
    pub fn identity(feature_names: Vec<String>) -> Self {
        let n = feature_names.len();
        Self {
            feature_names,
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    /// Parse a scaler from its JSON form.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or inconsistent statistics.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a scaler artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactLoad`] naming `path` for any read or parse failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let scaler = Self::from_json(&json).map_err(|e| Error::artifact(path, e))?;
        tracing::info!(
            path = %path.display(),
            features = scaler.feature_names.len(),
            "Loaded scaler"
        );
        Ok(scaler)
    }

    /// Get means
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.mean
    }

    /// Get scales
    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scale
    }
}

impl Scaler for StandardScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if row.len() != self.mean.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} features", self.mean.len()),
                actual: format!("{} features", row.len()),
            });
        }

        let mean = ArrayView1::from(&self.mean[..]);
        let scale = ArrayView1::from(&self.scale[..]);
        Ok(Zip::from(&row)
            .and(&mean)
            .and(&scale)
            .map_collect(|&x, &m, &s| (x - m) / s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(names(3), vec![1.0, 2.0, 3.0], vec![2.0, 0.5, 1.0]).unwrap();
        let out = scaler.transform(array![3.0, 2.0, 0.0].view()).unwrap();
        assert_eq!(out, array![1.0, 0.0, -3.0]);
    }

    #[test]
    fn test_zero_scale_passes_through() {
        let scaler = StandardScaler::new(names(2), vec![1.0, 1.0], vec![0.0, 2.0]).unwrap();
        assert_eq!(scaler.scales(), &[1.0, 2.0]);
        let out = scaler.transform(array![4.0, 5.0].view()).unwrap();
        assert_eq!(out, array![3.0, 2.0]);
    }

    #[test]
    fn test_transform_wrong_length() {
        let scaler = StandardScaler::identity(names(3));
        assert!(matches!(
            scaler.transform(array![1.0, 2.0].view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_new_rejects_inconsistent_stats() {
        assert!(StandardScaler::new(names(2), vec![0.0], vec![1.0, 1.0]).is_err());
        assert!(StandardScaler::new(names(1), vec![f64::NAN], vec![1.0]).is_err());
        assert!(
            StandardScaler::new(vec!["a".into(), "a".into()], vec![0.0; 2], vec![1.0; 2]).is_err()
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let zero_scale = r#"{"feature_names_in": ["a"], "mean": [1.0], "scale": [0.0]}"#;
        let scaler: StandardScaler = serde_json::from_str(zero_scale).unwrap();
        assert_eq!(scaler.scales(), &[1.0]);
        let out = scaler.transform(array![3.0].view()).unwrap();
        assert_eq!(out, array![2.0]);

        let ragged = r#"{"feature_names_in": ["a", "b"], "mean": [1.0], "scale": [1.0, 1.0]}"#;
        assert!(serde_json::from_str::<StandardScaler>(ragged).is_err());

        let repeated = r#"{"feature_names_in": ["a", "a"], "mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#;
        assert!(serde_json::from_str::<StandardScaler>(repeated).is_err());
    }

    #[test]
    fn test_json_accepts_sklearn_attribute_names() {
        let json = r#"{
            "feature_names_in_": ["a", "b"],
            "mean_": [0.5, 1.5],
            "scale_": [2.0, 4.0]
        }"#;
        let scaler = StandardScaler::from_json(json).unwrap();
        assert_eq!(scaler.feature_names(), &["a".to_string(), "b".to_string()]);

        let reparsed = StandardScaler::from_json(&scaler.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, scaler);
    }

    #[test]
    fn test_load_missing_file() {
        let err = StandardScaler::load("/nonexistent/scaler.json").unwrap_err();
        assert!(matches!(err, Error::ArtifactLoad { .. }));
        assert!(err.to_string().contains("/nonexistent/scaler.json"));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, b"\x80\x04\x95 pickle bytes").unwrap();

        assert!(matches!(
            StandardScaler::load(&path),
            Err(Error::ArtifactLoad { .. })
        ));
    }
}
