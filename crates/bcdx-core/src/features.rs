//! Canonical feature table.
//!
//! Every measurement has three names in play: the identifier shown on the
//! input form, the name the scaler and classifier were fitted with, and a
//! reference default that doubles as a plausible baseline case. The table is
//! ordered mean block, error block, worst block, which is also the training
//! order of the bundled artifacts.

use serde::Serialize;

use crate::constants::NUM_FEATURES;
use crate::error::{Error, Result};

/// One row of the feature table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    /// Identifier used by the input form and in records
    pub ui_name: &'static str,
    /// Name the scaler and classifier were trained on
    pub trained_name: &'static str,
    /// Reference value used when the user supplies none
    pub default: f64,
}

const fn spec(ui_name: &'static str, trained_name: &'static str, default: f64) -> FeatureSpec {
    FeatureSpec {
        ui_name,
        trained_name,
        default,
    }
}

/// The 30 recognized features in training order
pub static FEATURES: [FeatureSpec; NUM_FEATURES] = [
    spec("radius_mean", "mean radius", 14.0),
    spec("texture_mean", "mean texture", 20.0),
    spec("perimeter_mean", "mean perimeter", 90.0),
    spec("area_mean", "mean area", 600.0),
    spec("smoothness_mean", "mean smoothness", 0.10),
    spec("compactness_mean", "mean compactness", 0.15),
    spec("concavity_mean", "mean concavity", 0.20),
    spec("concave points_mean", "mean concave points", 0.10),
    spec("symmetry_mean", "mean symmetry", 0.20),
    spec("fractal_dimension_mean", "mean fractal dimension", 0.06),
    spec("radius_se", "radius error", 0.20),
    spec("texture_se", "texture error", 1.00),
    spec("perimeter_se", "perimeter error", 1.50),
    spec("area_se", "area error", 20.00),
    spec("smoothness_se", "smoothness error", 0.01),
    spec("compactness_se", "compactness error", 0.02),
    spec("concavity_se", "concavity error", 0.03),
    spec("concave points_se", "concave points error", 0.01),
    spec("symmetry_se", "symmetry error", 0.03),
    spec("fractal_dimension_se", "fractal dimension error", 0.004),
    spec("radius_worst", "worst radius", 16.00),
    spec("texture_worst", "worst texture", 25.00),
    spec("perimeter_worst", "worst perimeter", 105.00),
    spec("area_worst", "worst area", 800.00),
    spec("smoothness_worst", "worst smoothness", 0.12),
    spec("compactness_worst", "worst compactness", 0.20),
    spec("concavity_worst", "worst concavity", 0.30),
    spec("concave points_worst", "worst concave points", 0.15),
    spec("symmetry_worst", "worst symmetry", 0.25),
    spec("fractal_dimension_worst", "worst fractal dimension", 0.08),
];

/// Look up the table row for a form identifier
#[must_use]
pub fn feature_spec(ui_name: &str) -> Option<&'static FeatureSpec> {
    FEATURES.iter().find(|f| f.ui_name == ui_name)
}

/// Trained name for a form identifier
#[must_use]
pub fn trained_name(ui_name: &str) -> Option<&'static str> {
    feature_spec(ui_name).map(|f| f.trained_name)
}

/// Form identifier for a trained name
#[must_use]
pub fn ui_name(trained_name: &str) -> Option<&'static str> {
    FEATURES
        .iter()
        .find(|f| f.trained_name == trained_name)
        .map(|f| f.ui_name)
}

/// Reference default for a form identifier
#[must_use]
pub fn default_value(ui_name: &str) -> Option<f64> {
    feature_spec(ui_name).map(|f| f.default)
}

/// Rename a form identifier to its trained name.
///
/// # Errors
///
/// Returns [`Error::UnmappedFeature`] for identifiers outside the table.
pub fn map(ui_name: &str) -> Result<&'static str> {
    trained_name(ui_name).ok_or_else(|| Error::UnmappedFeature(ui_name.to_string()))
}

/// Form identifiers in training order
pub fn ui_names() -> impl DoubleEndedIterator<Item = &'static str> + ExactSizeIterator {
    FEATURES.iter().map(|f| f.ui_name)
}

/// Trained names in training order
pub fn trained_names() -> impl DoubleEndedIterator<Item = &'static str> + ExactSizeIterator {
    FEATURES.iter().map(|f| f.trained_name)
}

/// Check that `order` is exactly a permutation of the trained names.
///
/// # Errors
///
/// Returns [`Error::FeatureOrderMismatch`] describing the first problem found:
/// wrong length, a duplicated name, or a name outside the table.
pub fn validate_order<S: AsRef<str>>(order: &[S]) -> Result<()> {
    if order.len() != NUM_FEATURES {
        return Err(Error::FeatureOrderMismatch(format!(
            "expected {NUM_FEATURES} features, artifact declares {}",
            order.len()
        )));
    }

    let mut seen = [false; NUM_FEATURES];
    for name in order {
        let name = name.as_ref();
        let idx = FEATURES
            .iter()
            .position(|f| f.trained_name == name)
            .ok_or_else(|| {
                Error::FeatureOrderMismatch(format!("unknown feature name {name:?}"))
            })?;
        if seen[idx] {
            return Err(Error::FeatureOrderMismatch(format!(
                "feature name {name:?} listed twice"
            )));
        }
        seen[idx] = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_size() {
        assert_eq!(FEATURES.len(), NUM_FEATURES);
        assert_eq!(ui_names().count(), NUM_FEATURES);
    }

    #[test]
    fn test_name_iterators_run_both_ways() {
        assert_eq!(trained_names().len(), NUM_FEATURES);
        assert_eq!(ui_names().len(), NUM_FEATURES);

        let reversed: Vec<&str> = trained_names().rev().collect();
        assert_eq!(reversed[0], "worst fractal dimension");
        assert_eq!(reversed[NUM_FEATURES - 1], "mean radius");
        assert!(validate_order(&reversed).is_ok());

        assert_eq!(ui_names().next_back(), Some("fractal_dimension_worst"));
    }

    #[test]
    fn test_mapping_is_bijection() {
        let uis: HashSet<_> = ui_names().collect();
        let trained: HashSet<_> = trained_names().collect();
        assert_eq!(uis.len(), NUM_FEATURES);
        assert_eq!(trained.len(), NUM_FEATURES);

        for f in &FEATURES {
            assert_eq!(map(f.ui_name).unwrap(), f.trained_name);
            assert_eq!(ui_name(f.trained_name), Some(f.ui_name));
        }
    }

    #[test]
    fn test_identifiers_kept_verbatim() {
        assert_eq!(trained_name("concave points_mean"), Some("mean concave points"));
        assert_eq!(trained_name("concave_points_mean"), None);
        assert_eq!(trained_name("fractal_dimension_se"), Some("fractal dimension error"));
        assert_eq!(trained_name("area_worst"), Some("worst area"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_value("radius_mean"), Some(14.0));
        assert_eq!(default_value("fractal_dimension_se"), Some(0.004));
        assert_eq!(default_value("fractal_dimension_worst"), Some(0.08));
        assert_eq!(default_value("unknown"), None);
    }

    #[test]
    fn test_unmapped() {
        assert_eq!(
            map("tumor_size"),
            Err(Error::UnmappedFeature("tumor_size".to_string()))
        );
    }

    #[test]
    fn test_validate_order() {
        let mut order: Vec<&str> = trained_names().collect();
        assert!(validate_order(&order).is_ok());

        order.reverse();
        assert!(validate_order(&order).is_ok());

        order[0] = order[1];
        assert!(matches!(
            validate_order(&order),
            Err(Error::FeatureOrderMismatch(_))
        ));

        order[0] = "mean tumor size";
        assert!(validate_order(&order).is_err());

        assert!(validate_order(&order[..29]).is_err());
    }
}
