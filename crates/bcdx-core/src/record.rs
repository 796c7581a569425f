//! Feature records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{self, FEATURES};

/// One patient's measurements keyed by form identifier.
///
/// Records are immutable once built; use [`FeatureRecordBuilder`] or the
/// `with`/`without` helpers, which return a new record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: BTreeMap<String, f64>,
}

impl FeatureRecord {
    /// Start building a record
    #[must_use]
    pub fn builder() -> FeatureRecordBuilder {
        FeatureRecordBuilder::default()
    }

    /// Record with every feature at its reference default
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            values: FEATURES
                .iter()
                .map(|f| (f.ui_name.to_string(), f.default))
                .collect(),
        }
    }

    /// Parse a record from JSON (an object of identifier to number).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Value for a form identifier
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Whether the record has a value for `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record holds no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(identifier, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Recognized identifiers with no value in this record, in training order
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        features::ui_names()
            .filter(|name| !self.values.contains_key(*name))
            .collect()
    }

    /// Identifiers in this record that the feature table does not know
    #[must_use]
    pub fn unknown_fields(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|name| features::feature_spec(name).is_none())
            .collect()
    }

    /// Whether the record has exactly the 30 recognized identifiers
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty() && self.unknown_fields().is_empty()
    }

    /// Copy of this record with `name` set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumericConversion`] if `value` is not finite.
    pub fn with(&self, name: &str, value: f64) -> Result<Self> {
        let mut values = self.values.clone();
        values.insert(name.to_string(), check_finite(name, value)?);
        Ok(Self { values })
    }

    /// Copy of this record without `name`
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut values = self.values.clone();
        values.remove(name);
        Self { values }
    }
}

/// Builder for [`FeatureRecord`]
#[derive(Debug, Default)]
pub struct FeatureRecordBuilder {
    values: BTreeMap<String, f64>,
}

impl FeatureRecordBuilder {
    /// Set a value, rejecting NaN and infinities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumericConversion`] if `value` is not finite.
    pub fn set(mut self, name: &str, value: f64) -> Result<Self> {
        self.values
            .insert(name.to_string(), check_finite(name, value)?);
        Ok(self)
    }

    /// Parse `text` and set it as the value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumericConversion`] if `text` is not a finite number.
    pub fn set_text(self, name: &str, text: &str) -> Result<Self> {
        let value = parse_value(name, text)?;
        self.set(name, value)
    }

    /// Fill every recognized identifier not yet set with its default
    #[must_use]
    pub fn fill_defaults(mut self) -> Self {
        for f in &FEATURES {
            self.values
                .entry(f.ui_name.to_string())
                .or_insert(f.default);
        }
        self
    }

    /// Finish the record
    #[must_use]
    pub fn build(self) -> FeatureRecord {
        FeatureRecord {
            values: self.values,
        }
    }
}

/// Parse user text into a finite number for `field`.
///
/// # Errors
///
/// Returns [`Error::NumericConversion`] if the text does not parse or parses
/// to NaN or an infinity.
pub fn parse_value(field: &str, text: &str) -> Result<f64> {
    let value: f64 = text.trim().parse().map_err(|_| Error::NumericConversion {
        field: field.to_string(),
        value: text.to_string(),
    })?;
    check_finite(field, value)
}

fn check_finite(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NumericConversion {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUM_FEATURES;
    use test_case::test_case;

    #[test]
    fn test_defaults_complete() {
        let record = FeatureRecord::defaults();
        assert_eq!(record.len(), NUM_FEATURES);
        assert!(record.is_complete());
        assert_eq!(record.get("texture_mean"), Some(20.0));
        assert_eq!(record.get("concave points_worst"), Some(0.15));
    }

    #[test]
    fn test_without_is_a_copy() {
        let record = FeatureRecord::defaults();
        let partial = record.without("radius_mean");

        assert!(record.contains("radius_mean"));
        assert!(!partial.contains("radius_mean"));
        assert_eq!(partial.missing_fields(), vec!["radius_mean"]);
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_unknown_fields() {
        let record = FeatureRecord::defaults().with("tumor_size", 3.0).unwrap();
        assert_eq!(record.unknown_fields(), vec!["tumor_size"]);
        assert!(!record.is_complete());
    }

    #[test]
    fn test_builder_fill_defaults() {
        let record = FeatureRecord::builder()
            .set("radius_mean", 17.99)
            .unwrap()
            .set_text("area_mean", " 1001.0 ")
            .unwrap()
            .fill_defaults()
            .build();

        assert!(record.is_complete());
        assert_eq!(record.get("radius_mean"), Some(17.99));
        assert_eq!(record.get("area_mean"), Some(1001.0));
        assert_eq!(record.get("texture_mean"), Some(20.0));
    }

    #[test]
    fn test_builder_rejects_non_finite() {
        let err = FeatureRecord::builder().set("area_mean", f64::NAN).unwrap_err();
        assert!(matches!(err, Error::NumericConversion { .. }));
    }

    #[test_case("abc" ; "letters")]
    #[test_case("" ; "empty")]
    #[test_case("1.2.3" ; "two dots")]
    #[test_case("NaN" ; "nan")]
    #[test_case("inf" ; "infinity")]
    fn test_parse_value_rejects(text: &str) {
        assert!(matches!(
            parse_value("radius_mean", text),
            Err(Error::NumericConversion { .. })
        ));
    }

    #[test]
    fn test_parse_value_accepts_negative() {
        assert_eq!(parse_value("area_mean", "-5.5").unwrap(), -5.5);
        assert_eq!(parse_value("area_mean", "1e2").unwrap(), 100.0);
    }

    #[test]
    fn test_json() {
        let record =
            FeatureRecord::from_json(r#"{"radius_mean": 12.5, "concave points_se": 0.02}"#)
                .unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("concave points_se"), Some(0.02));

        assert!(matches!(
            FeatureRecord::from_json(r#"{"radius_mean": "big"}"#),
            Err(Error::SerializationError(_))
        ));
    }
}
