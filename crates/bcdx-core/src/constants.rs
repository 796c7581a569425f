//! Constants used throughout the bcdx service.

/// Number of tumor measurements in a complete record (10 base measurements x 3 aggregates)
pub const NUM_FEATURES: usize = 30;

/// Probability above which a tumor is labelled malignant (strictly greater)
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Decimal digits used when displaying a probability
pub const PROBABILITY_DECIMALS: usize = 4;

/// Output width of a single-unit sigmoid classifier head
pub const SIGMOID_OUTPUT_UNITS: usize = 1;

/// Output width of a two-unit softmax classifier head
pub const SOFTMAX_OUTPUT_UNITS: usize = 2;

/// Index of the positive (malignant) class in a softmax head
pub const POSITIVE_CLASS_INDEX: usize = 1;

/// Default Prometheus/HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "BCDX_CONFIG";
