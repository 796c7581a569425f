//! Classifier artifacts.
//!
//! Two runtimes are supported: a dense feed-forward network exported as JSON
//! (layer kernels, biases and activations, the layout a Keras sequential model
//! stores), evaluated with `ndarray`; and, behind the `onnx` feature, any ONNX
//! graph evaluated with ONNX Runtime.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bcdx_core::constants::{SIGMOID_OUTPUT_UNITS, SOFTMAX_OUTPUT_UNITS};
use bcdx_core::error::{Error, Result};
use bcdx_core::traits::Classifier;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity
    #[default]
    Linear,
    /// max(0, x)
    Relu,
    /// Logistic function
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Row-wise softmax
    Softmax,
}

impl Activation {
    /// Apply in place to a `[rows, units]` pre-activation matrix
    pub fn apply(self, z: &mut Array2<f64>) {
        match self {
            Activation::Linear => {}
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Tanh => z.mapv_inplace(f64::tanh),
            Activation::Softmax => {
                for mut row in z.rows_mut() {
                    let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|v| v / sum);
                }
            }
        }
    }
}

/// Serialized form of one dense layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Kernel, one row per input unit
    pub weights: Vec<Vec<f64>>,
    /// One bias per output unit
    pub bias: Vec<f64>,
    /// Activation applied after the affine map
    #[serde(default)]
    pub activation: Activation,
}

/// Serialized form of a dense network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Model name
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Layers from input to output
    pub layers: Vec<LayerSpec>,
}

fn default_model_name() -> String {
    "dense".to_string()
}

/// Fully connected layer
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Create a layer from a `[inputs, units]` kernel and `[units]` bias
    ///
    /// # Errors
    ///
    /// Fails if the bias length differs from the kernel width or any
    /// parameter is non-finite.
    pub fn new(weights: Array2<f64>, bias: Array1<f64>, activation: Activation) -> Result<Self> {
        if bias.len() != weights.ncols() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} biases", weights.ncols()),
                actual: format!("{} biases", bias.len()),
            });
        }
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(Error::SerializationError(
                "non-finite layer parameter".to_string(),
            ));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    /// Number of input units
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of output units
    #[must_use]
    pub fn units(&self) -> usize {
        self.weights.ncols()
    }

    /// Activation function
    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut z = x.dot(&self.weights);
        z += &self.bias;
        self.activation.apply(&mut z);
        z
    }
}

impl TryFrom<LayerSpec> for DenseLayer {
    type Error = Error;

    fn try_from(spec: LayerSpec) -> Result<Self> {
        let rows = spec.weights.len();
        let cols = spec.weights.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(Error::ShapeMismatch {
                expected: "non-empty kernel".to_string(),
                actual: format!("{rows}x{cols}"),
            });
        }
        if let Some(bad) = spec.weights.iter().find(|r| r.len() != cols) {
            return Err(Error::ShapeMismatch {
                expected: format!("kernel rows of width {cols}"),
                actual: format!("row of width {}", bad.len()),
            });
        }

        let flat: Vec<f64> = spec.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, cols), flat)?;
        Self::new(weights, Array1::from(spec.bias), spec.activation)
    }
}

/// Feed-forward network evaluated with `ndarray`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseNetwork {
    name: String,
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Create a network, checking that layer shapes chain and that the
    /// output layer is a binary classification head.
    ///
    /// # Errors
    ///
    /// Fails on an empty layer list, when a layer's input width differs
    /// from the previous layer's unit count, or when the output layer is
    /// neither one probability unit nor two class units. A one-unit softmax
    /// is rejected since it always yields 1.
    pub fn new(name: impl Into<String>, layers: Vec<DenseLayer>) -> Result<Self> {
        let Some(head) = layers.last() else {
            return Err(Error::ShapeMismatch {
                expected: "at least one layer".to_string(),
                actual: "0 layers".to_string(),
            });
        };
        match (head.units(), head.activation()) {
            (SIGMOID_OUTPUT_UNITS, Activation::Softmax) => {
                return Err(Error::ShapeMismatch {
                    expected: format!("{SOFTMAX_OUTPUT_UNITS} softmax output units"),
                    actual: format!("{SIGMOID_OUTPUT_UNITS} softmax output unit"),
                });
            }
            (SIGMOID_OUTPUT_UNITS | SOFTMAX_OUTPUT_UNITS, _) => {}
            (units, _) => {
                return Err(Error::ShapeMismatch {
                    expected: format!(
                        "{SIGMOID_OUTPUT_UNITS} or {SOFTMAX_OUTPUT_UNITS} output units"
                    ),
                    actual: format!("{units} output units"),
                });
            }
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].units() != pair[1].inputs() {
                return Err(Error::ShapeMismatch {
                    expected: format!("layer {} with {} inputs", i + 1, pair[0].units()),
                    actual: format!("{} inputs", pair[1].inputs()),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            layers,
        })
    }

    /// Build from the serialized form
    ///
    /// # Errors
    ///
    /// Fails on any malformed layer.
    pub fn from_spec(spec: NetworkSpec) -> Result<Self> {
        let layers = spec
            .layers
            .into_iter()
            .map(DenseLayer::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(spec.name, layers)
    }

    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or layer shapes.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_spec(serde_json::from_str(json)?)
    }

    /// Load a network artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactLoad`] naming `path` for any read or parse failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let network = Self::from_json(&json).map_err(|e| Error::artifact(path, e))?;
        tracing::info!(
            path = %path.display(),
            name = %network.name,
            layers = network.layers.len(),
            inputs = network.input_dim(),
            outputs = network.output_units(),
            "Loaded dense network"
        );
        Ok(network)
    }

    /// Layers from input to output
    #[must_use]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Width of the output layer
    #[must_use]
    pub fn output_units(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::units)
    }
}

impl Classifier for DenseNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if batch.ncols() != self.input_dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} inputs", self.input_dim()),
                actual: format!("{} inputs", batch.ncols()),
            });
        }

        let mut x = batch.to_owned();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x)
    }
}

/// ONNX Runtime model wrapper
#[cfg(feature = "onnx")]
pub struct OnnxModel {
    name: String,
    session: ort::Session,
    input_name: String,
    output_name: String,
    input_dim: usize,
}

#[cfg(feature = "onnx")]
impl OnnxModel {
    /// Load a model from an ONNX file whose input is `[batch, input_dim]` floats
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactLoad`] if the session cannot be built.
    pub fn load<P: AsRef<Path>>(path: P, input_dim: usize) -> Result<Self> {
        use ort::{GraphOptimizationLevel, Session};

        let path = path.as_ref();
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| Error::artifact(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| Error::artifact(path, "model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| Error::artifact(path, "model declares no outputs"))?;

        let name = path
            .file_stem()
            .map_or_else(|| "onnx".to_string(), |s| s.to_string_lossy().into_owned());

        tracing::info!(path = %path.display(), %input_name, %output_name, "Loaded ONNX model");

        Ok(Self {
            name,
            session,
            input_name,
            output_name,
            input_dim,
        })
    }
}

#[cfg(feature = "onnx")]
impl Classifier for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[allow(clippy::cast_possible_truncation)]
    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        use ort::Value;

        let rows = batch.nrows();
        let input = batch.mapv(|v| v as f32);
        let input_tensor =
            Value::from_array(input).map_err(|e| Error::ModelError(e.to_string()))?;

        let outputs = self
            .session
            .run(
                ort::inputs![self.input_name.as_str() => input_tensor]
                    .map_err(|e| Error::ModelError(e.to_string()))?,
            )
            .map_err(|e| Error::ModelError(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| Error::ModelError("No output from model".to_string()))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::ModelError(e.to_string()))?;

        let values: Vec<f64> = tensor.iter().map(|&v| f64::from(v)).collect();
        if rows == 0 || values.len() % rows != 0 {
            return Err(Error::ShapeMismatch {
                expected: format!("output divisible into {rows} rows"),
                actual: format!("{} values", values.len()),
            });
        }
        let units = values.len() / rows;
        Ok(Array2::from_shape_vec((rows, units), values)?)
    }
}

/// Running inference counters, safe to share across requests
#[derive(Debug, Default)]
pub struct InferenceStats {
    inference_count: AtomicU64,
    error_count: AtomicU64,
    total_inference_time_ns: AtomicU64,
}

impl InferenceStats {
    /// Record a successful inference
    pub fn record(&self, latency_ns: u64) {
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.total_inference_time_ns
            .fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Record a failed inference
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get inference count
    #[must_use]
    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }

    /// Get failed inference count
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Get average inference latency in nanoseconds
    #[must_use]
    pub fn avg_latency_ns(&self) -> u64 {
        let count = self.inference_count();
        if count == 0 {
            0
        } else {
            self.total_inference_time_ns.load(Ordering::Relaxed) / count
        }
    }
}
