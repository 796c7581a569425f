//! Inference pipeline: rename, reorder, scale, classify.

use std::collections::HashMap;

use bcdx_core::constants::{POSITIVE_CLASS_INDEX, SIGMOID_OUTPUT_UNITS, SOFTMAX_OUTPUT_UNITS};
use bcdx_core::error::{Error, Result};
use bcdx_core::features;
use bcdx_core::record::FeatureRecord;
use bcdx_core::traits::{Classifier, Scaler};
use ndarray::{Array1, ArrayView2, Axis};

/// Rename every record key from its form identifier to its trained name.
///
/// # Errors
///
/// Returns [`Error::UnmappedFeature`] for a key outside the feature table.
pub fn rename(record: &FeatureRecord) -> Result<HashMap<&'static str, f64>> {
    record
        .iter()
        .map(|(name, value)| features::map(name).map(|trained| (trained, value)))
        .collect()
}

/// Arrange renamed values in exactly the order given.
///
/// # Errors
///
/// Returns [`Error::MissingFeature`] for the first name in `order` that has
/// no value.
pub fn reorder<S: AsRef<str>>(renamed: &HashMap<&str, f64>, order: &[S]) -> Result<Array1<f64>> {
    order
        .iter()
        .map(|name| {
            let name = name.as_ref();
            renamed
                .get(name)
                .copied()
                .ok_or_else(|| Error::MissingFeature(name.to_string()))
        })
        .collect()
}

/// Reduce raw classifier output to the positive-class probability of the
/// first row.
///
/// A one-unit head is the probability itself; a two-unit head is a softmax
/// over (benign, malignant).
///
/// # Errors
///
/// Fails on an empty output, an unsupported head width, or a value outside
/// [0, 1].
pub fn positive_class_probability(output: ArrayView2<'_, f64>) -> Result<f64> {
    if output.nrows() == 0 {
        return Err(Error::ModelError("classifier returned no rows".to_string()));
    }

    let probability = match output.ncols() {
        SIGMOID_OUTPUT_UNITS => output[[0, 0]],
        SOFTMAX_OUTPUT_UNITS => output[[0, POSITIVE_CLASS_INDEX]],
        units => {
            return Err(Error::ShapeMismatch {
                expected: format!("{SIGMOID_OUTPUT_UNITS} or {SOFTMAX_OUTPUT_UNITS} output units"),
                actual: format!("{units} output units"),
            })
        }
    };

    if !(0.0..=1.0).contains(&probability) {
        return Err(Error::InvalidProbability(probability));
    }
    Ok(probability)
}

/// Run one record through the scaler and classifier.
///
/// # Errors
///
/// Any failure of the four steps is returned unchanged; nothing is retried
/// or defaulted.
pub fn predict(record: &FeatureRecord, scaler: &dyn Scaler, model: &dyn Classifier) -> Result<f64> {
    let renamed = rename(record)?;
    let ordered = reorder(&renamed, scaler.feature_names())?;

    let scaled = scaler.transform(ordered.view())?;
    if scaled.len() != ordered.len() {
        return Err(Error::ShapeMismatch {
            expected: format!("{} scaled features", ordered.len()),
            actual: format!("{} scaled features", scaled.len()),
        });
    }

    let batch = scaled.insert_axis(Axis(0));
    let output = model.predict(batch.view())?;
    let probability = positive_class_probability(output.view())?;

    tracing::debug!(model = model.name(), probability, "Pipeline complete");
    Ok(probability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::StandardScaler;
    use bcdx_core::constants::NUM_FEATURES;
    use ndarray::{array, Array2};

    /// Classifier returning a fixed output matrix
    struct Fixed(Array2<f64>);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn input_dim(&self) -> usize {
            NUM_FEATURES
        }

        fn predict(&self, _batch: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            Ok(self.0.clone())
        }
    }

    /// Classifier echoing its first input column
    struct Echo;

    impl Classifier for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn input_dim(&self) -> usize {
            NUM_FEATURES
        }

        fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            Ok(batch.slice(ndarray::s![.., 0..1]).to_owned())
        }
    }

    fn reversed_order() -> Vec<String> {
        features::trained_names().rev().map(String::from).collect()
    }

    #[test]
    fn test_rename() {
        let renamed = rename(&FeatureRecord::defaults()).unwrap();
        assert_eq!(renamed.len(), NUM_FEATURES);
        assert_eq!(renamed["mean radius"], 14.0);
        assert_eq!(renamed["worst concave points"], 0.15);
    }

    #[test]
    fn test_rename_unmapped() {
        let record = FeatureRecord::defaults().with("tumor_size", 1.0).unwrap();
        assert_eq!(
            rename(&record),
            Err(Error::UnmappedFeature("tumor_size".to_string()))
        );
    }

    #[test]
    fn test_reorder_follows_scaler_order() {
        let record = FeatureRecord::defaults();
        let order = reversed_order();
        let vector = reorder(&rename(&record).unwrap(), &order).unwrap();

        assert_eq!(vector.len(), NUM_FEATURES);
        for (i, trained) in order.iter().enumerate() {
            let ui = features::ui_name(trained).unwrap();
            assert_eq!(vector[i], record.get(ui).unwrap(), "position {i} ({trained})");
        }
        assert_eq!(vector[0], 0.08); // worst fractal dimension
        assert_eq!(vector[NUM_FEATURES - 1], 14.0); // mean radius
    }

    #[test]
    fn test_missing_radius_mean() {
        let record = FeatureRecord::defaults().without("radius_mean");
        let scaler = StandardScaler::identity(features::trained_names().map(String::from).collect());
        let model = Fixed(array![[0.9]]);

        assert_eq!(
            predict(&record, &scaler, &model),
            Err(Error::MissingFeature("mean radius".to_string()))
        );
    }

    #[test]
    fn test_predict_uses_scaled_values_in_scaler_order() {
        let order = reversed_order();
        let n = order.len();
        // worst fractal dimension is first: (0.08 - 0.0) / 0.16 = 0.5
        let mut scale = vec![1.0; n];
        scale[0] = 0.16;
        let scaler = StandardScaler::new(order, vec![0.0; n], scale).unwrap();

        let p = predict(&FeatureRecord::defaults(), &scaler, &Echo).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_head_takes_positive_class() {
        let scaler = StandardScaler::identity(features::trained_names().map(String::from).collect());
        let model = Fixed(array![[0.3, 0.7]]);
        let p = predict(&FeatureRecord::defaults(), &scaler, &model).unwrap();
        assert_eq!(p, 0.7);
    }

    #[test]
    fn test_positive_class_probability_batched() {
        let output = array![[0.25], [0.75]];
        assert_eq!(positive_class_probability(output.view()).unwrap(), 0.25);
    }

    #[test]
    fn test_positive_class_probability_rejects() {
        assert!(matches!(
            positive_class_probability(array![[0.1, 0.2, 0.7]].view()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert_eq!(
            positive_class_probability(array![[1.5]].view()),
            Err(Error::InvalidProbability(1.5))
        );
        assert!(matches!(
            positive_class_probability(array![[f64::NAN]].view()),
            Err(Error::InvalidProbability(_))
        ));
        assert!(positive_class_probability(Array2::<f64>::zeros((0, 1)).view()).is_err());
    }
}
