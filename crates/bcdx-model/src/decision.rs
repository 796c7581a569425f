//! Decision rule and result rendering.

use std::fmt;

use bcdx_core::constants::{DECISION_THRESHOLD, PROBABILITY_DECIMALS};
use serde::{Deserialize, Serialize};

/// Diagnosis label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Probability strictly above the threshold
    Malignant,
    /// Probability at or below the threshold
    Benign,
}

impl Label {
    /// Apply the decision rule. Exactly 0.5 is benign.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            Label::Malignant
        } else {
            Label::Benign
        }
    }

    /// Label text
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Malignant => "Malignant",
            Label::Benign => "Benign",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendered prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Categorical label
    pub label: Label,
    /// Classifier probability of malignancy
    pub probability: f64,
    /// Text shown to the user
    pub display: String,
}

impl Decision {
    /// Probability with the display precision
    #[must_use]
    pub fn formatted_probability(&self) -> String {
        format_probability(self.probability)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Format a probability to the display precision
#[must_use]
pub fn format_probability(probability: f64) -> String {
    format!("{:.*}", PROBABILITY_DECIMALS, probability)
}

/// Threshold a probability and build the text shown to the user
#[must_use]
pub fn render(probability: f64) -> Decision {
    let label = Label::from_probability(probability);
    let display = format!(
        "Prediction: {label}\nPrediction Probability: {}",
        format_probability(probability)
    );
    Decision {
        label,
        probability,
        display,
    }
}
