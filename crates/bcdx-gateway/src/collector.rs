//! Input collection.
//!
//! The collector walks the feature table in order and asks a [`ValuePrompt`]
//! for one value per field, offering the field's reference default. The
//! terminal prompt re-asks on text that is not a finite number, so only
//! clean values ever reach the pipeline.

use std::collections::HashMap;
use std::path::Path;

use bcdx_core::error::{Error, Result};
use bcdx_core::features::{self, FEATURES};
use bcdx_core::record::{self, FeatureRecord};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

/// Source of one numeric value per form field
pub trait ValuePrompt {
    /// Obtain the value for `label`, offering `default`
    fn value(&mut self, label: &str, default: f64) -> Result<f64>;
}

/// Collect a complete record, one prompt per recognized field.
///
/// # Errors
///
/// Propagates prompt failures and rejects non-finite values.
pub fn collect<P: ValuePrompt + ?Sized>(prompt: &mut P) -> Result<FeatureRecord> {
    let mut builder = FeatureRecord::builder();
    for f in &FEATURES {
        let value = prompt.value(f.ui_name, f.default)?;
        builder = builder.set(f.ui_name, value)?;
    }
    Ok(builder.build())
}

/// Interactive terminal prompt
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompt {
    /// Create a terminal prompt
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl ValuePrompt for TerminalPrompt {
    fn value(&mut self, label: &str, default: f64) -> Result<f64> {
        Input::<f64>::with_theme(&self.theme)
            .with_prompt(label)
            .default(default)
            .validate_with(|v: &f64| -> std::result::Result<(), &'static str> {
                if v.is_finite() {
                    Ok(())
                } else {
                    Err("enter a finite number")
                }
            })
            .interact_text()
            .map_err(|e| Error::IoError(e.to_string()))
    }
}

/// Non-interactive prompt answering from explicit overrides, else defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetValues {
    overrides: HashMap<String, f64>,
}

impl PresetValues {
    /// Parse `name=value` assignments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmappedFeature`] for an unknown field name and
    /// [`Error::NumericConversion`] for a missing `=` or a value that is not
    /// a finite number.
    pub fn parse<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut overrides = HashMap::with_capacity(assignments.len());
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, text) =
                assignment
                    .split_once('=')
                    .ok_or_else(|| Error::NumericConversion {
                        field: assignment.to_string(),
                        value: String::new(),
                    })?;
            let name = name.trim();
            if features::feature_spec(name).is_none() {
                return Err(Error::UnmappedFeature(name.to_string()));
            }
            overrides.insert(name.to_string(), record::parse_value(name, text)?);
        }
        Ok(Self { overrides })
    }

    /// Number of explicit overrides
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Whether no override was given
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl ValuePrompt for PresetValues {
    fn value(&mut self, label: &str, default: f64) -> Result<f64> {
        Ok(self.overrides.get(label).copied().unwrap_or(default))
    }
}

/// Read a record from a JSON file, optionally filling absent fields with
/// their defaults.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a JSON object of numbers.
pub fn load_record<P: AsRef<Path>>(path: P, fill_defaults: bool) -> Result<FeatureRecord> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let record = FeatureRecord::from_json(&json)?;
    if !fill_defaults {
        return Ok(record);
    }

    let mut builder = FeatureRecord::builder();
    for (name, value) in record.iter() {
        builder = builder.set(name, value)?;
    }
    Ok(builder.fill_defaults().build())
}
