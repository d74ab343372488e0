//! Feed-forward neural-network inference.
//!
//! A [`ForwardPropagator`] is configured once from a layer description and a
//! flat, pre-trained weight vector, and then propagates batches of feature
//! vectors to batches of output vectors. Weights are opaque: training is out
//! of scope, the engine only runs them.
//!
//! The batched activation matrix is row-major with one example per row. A
//! constant bias column (value 1.0) is prepended before every layer multiply,
//! matching the one bias unit per layer the weight-count formula assumes.
//! Computation order is fixed, so results are reproducible bit-for-bit for a
//! given configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, SensingError};

/// Bias units prepended to each layer's input.
pub const BIAS_UNITS: usize = 1;

/// Element-wise activation applied to a layer's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    /// Pass values through unchanged.
    Identity,
    /// Logistic function `1 / (1 + e^-x)`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectifier `max(0, x)`.
    Relu,
    /// Normalized exponential over one example's outputs, max-subtracted
    /// before exponentiating for numeric stability.
    Softmax,
}

impl ActivationFunction {
    /// Apply in place over one example's contiguous output run.
    pub fn apply(&self, run: &mut [f32]) {
        match self {
            ActivationFunction::Identity => {}
            ActivationFunction::Sigmoid => {
                for v in run {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            ActivationFunction::Tanh => {
                for v in run {
                    *v = v.tanh();
                }
            }
            ActivationFunction::Relu => {
                for v in run {
                    *v = v.max(0.0);
                }
            }
            ActivationFunction::Softmax => {
                let max = run.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.0;
                for v in run.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                if sum > 0.0 {
                    for v in run {
                        *v /= sum;
                    }
                }
            }
        }
    }
}

/// One layer of the network: its unit count and the activation applied to
/// its output. The first layer describes the feature vector and its
/// activation is never applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Number of units in this layer.
    pub size: usize,
    /// Activation applied to this layer's output.
    pub activation: ActivationFunction,
}

/// Dense row-major matrix over `f32`.
///
/// Kept deliberately small: the propagator needs shape-checked storage,
/// row access, and one multiply, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// A zero-filled matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major vector of exactly `rows * cols` elements.
    fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    fn row_mut(&mut self, r: usize) -> &mut [f32] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Reshape in place to `rows × cols`, zero-filled, keeping the
    /// allocation when it already fits.
    fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, 0.0);
    }

    /// `out = self × rhs`, accumulating in deterministic i-k-j order.
    fn mul_into(&self, rhs: &Matrix, out: &mut Matrix) {
        debug_assert_eq!(self.cols, rhs.rows);
        out.reset(self.rows, rhs.cols);
        for i in 0..self.rows {
            let lhs_row = self.row(i);
            let out_begin = i * rhs.cols;
            for (k, &a) in lhs_row.iter().enumerate() {
                let rhs_row = rhs.row(k);
                let out_row = &mut out.data[out_begin..out_begin + rhs.cols];
                for (o, &b) in out_row.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
    }
}

/// Batched feed-forward inference engine.
///
/// Scratch matrices are owned by the propagator and reused across calls;
/// `predict` allocates only the returned output vector.
#[derive(Debug, Clone)]
pub struct ForwardPropagator {
    layers: Vec<Layer>,
    boundaries: Vec<Matrix>,
    biased: Matrix,
    activations: Matrix,
}

impl ForwardPropagator {
    /// Validate the configuration and reshape the flat weight vector into
    /// one `(in + 1) × out` row-major matrix per layer boundary, bias row
    /// first.
    ///
    /// Fails with [`SensingError::InvalidWeightsForLayerConfiguration`] when
    /// the weight count does not match the layer sizes exactly.
    pub fn configure(layers: Vec<Layer>, weights: &[f32]) -> CoreResult<Self> {
        if layers.len() < 2 {
            return Err(SensingError::InvalidLayerConfiguration(
                "a network needs an input and an output layer",
            ));
        }
        if layers.iter().any(|l| l.size == 0) {
            return Err(SensingError::InvalidLayerConfiguration(
                "layer sizes must be non-zero",
            ));
        }
        let expected: usize = layers
            .windows(2)
            .map(|pair| (pair[0].size + BIAS_UNITS) * pair[1].size)
            .sum();
        if weights.len() != expected {
            return Err(SensingError::InvalidWeightsForLayerConfiguration {
                expected,
                actual: weights.len(),
            });
        }

        let mut boundaries = Vec::with_capacity(layers.len() - 1);
        let mut offset = 0;
        for pair in layers.windows(2) {
            let rows = pair[0].size + BIAS_UNITS;
            let cols = pair[1].size;
            boundaries.push(Matrix::from_vec(
                rows,
                cols,
                weights[offset..offset + rows * cols].to_vec(),
            ));
            offset += rows * cols;
        }

        Ok(Self {
            layers,
            boundaries,
            biased: Matrix::zeros(0, 0),
            activations: Matrix::zeros(0, 0),
        })
    }

    /// Size of the input layer (the feature vector length).
    pub fn input_size(&self) -> usize {
        self.layers[0].size
    }

    /// Size of the output layer (the number of classes).
    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].size
    }

    /// Propagate one or more stacked feature vectors through the network.
    ///
    /// `features` must be a non-zero multiple of the input layer size; each
    /// consecutive run of `input_size` values is one example. The result
    /// holds `output_size` values per example, concatenated in example
    /// order.
    pub fn predict(&mut self, features: &[f32]) -> CoreResult<Vec<f32>> {
        let input_size = self.input_size();
        if features.is_empty() || features.len() % input_size != 0 {
            return Err(SensingError::InvalidFeatureMatrixSize {
                length: features.len(),
                input_size,
            });
        }
        let examples = features.len() / input_size;

        self.activations.reset(examples, input_size);
        self.activations.data.copy_from_slice(features);

        for (boundary, layer) in self.boundaries.iter().zip(&self.layers[1..]) {
            // Bias column first, then the previous layer's output.
            let current = self.activations.cols();
            self.biased.reset(examples, current + BIAS_UNITS);
            for r in 0..examples {
                let source = self.activations.row(r);
                let target = self.biased.row_mut(r);
                target[0] = 1.0;
                target[BIAS_UNITS..].copy_from_slice(source);
            }

            self.biased.mul_into(boundary, &mut self.activations);
            for run in self.activations.data.chunks_mut(layer.size) {
                layer.activation.apply(run);
            }
        }

        Ok(self.activations.as_slice().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(size: usize, activation: ActivationFunction) -> Layer {
        Layer { size, activation }
    }

    fn sigmoid_net(layers: Vec<Layer>, weights: &[f32]) -> ForwardPropagator {
        ForwardPropagator::configure(layers, weights).expect("valid configuration")
    }

    #[test]
    fn test_weight_count_is_validated() {
        let layers = vec![
            layer(2, ActivationFunction::Identity),
            layer(1, ActivationFunction::Sigmoid),
        ];
        let result = ForwardPropagator::configure(layers, &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(SensingError::InvalidWeightsForLayerConfiguration {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_feature_matrix_size_is_validated() {
        let mut net = sigmoid_net(
            vec![
                layer(2, ActivationFunction::Identity),
                layer(1, ActivationFunction::Sigmoid),
            ],
            &[-30.0, 20.0, 20.0],
        );
        assert!(matches!(
            net.predict(&[1.0]),
            Err(SensingError::InvalidFeatureMatrixSize {
                length: 1,
                input_size: 2
            })
        ));
        assert!(matches!(
            net.predict(&[]),
            Err(SensingError::InvalidFeatureMatrixSize {
                length: 0,
                input_size: 2
            })
        ));
    }

    #[test]
    fn test_and_gate() {
        let mut net = sigmoid_net(
            vec![
                layer(2, ActivationFunction::Identity),
                layer(1, ActivationFunction::Sigmoid),
            ],
            &[-30.0, 20.0, 20.0],
        );
        let output = net
            .predict(&[1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
            .expect("four stacked examples");
        assert!((output[0] - 1.0).abs() < 1e-4);
        assert!(output[1].abs() < 1e-4);
        assert!(output[2].abs() < 1e-4);
        assert!(output[3].abs() < 1e-4);
    }

    #[test]
    fn test_xnor_network() {
        // Hidden units compute AND and NOR; the output unit ORs them.
        let weights = [
            -30.0, 10.0, // bias row
            20.0, -20.0, // x1
            20.0, -20.0, // x2
            -10.0, 20.0, 20.0, // output boundary
        ];
        let mut net = sigmoid_net(
            vec![
                layer(2, ActivationFunction::Identity),
                layer(2, ActivationFunction::Sigmoid),
                layer(1, ActivationFunction::Sigmoid),
            ],
            &weights,
        );
        let output = net
            .predict(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0])
            .expect("four stacked examples");
        assert!((output[0] - 1.0).abs() < 1e-4);
        assert!(output[1].abs() < 1e-4);
        assert!(output[2].abs() < 1e-4);
        assert!((output[3] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_batched_equals_per_example() {
        // (3 + 1) × 4 + (4 + 1) × 2 weights
        let weights: Vec<f32> = (0..26).map(|i| (i as f32 * 0.37).sin()).collect();
        let mut net = sigmoid_net(
            vec![
                layer(3, ActivationFunction::Identity),
                layer(4, ActivationFunction::Tanh),
                layer(2, ActivationFunction::Softmax),
            ],
            &weights,
        );
        let features = [0.5, -1.0, 2.0, 0.0, 0.25, -0.75];

        let batched = net.predict(&features).expect("two examples");
        let first = net.predict(&features[..3]).expect("one example");
        let second = net.predict(&features[3..]).expect("one example");

        assert_eq!(&batched[..2], &first[..]);
        assert_eq!(&batched[2..], &second[..]);
    }

    #[test]
    fn test_sigmoid_boundary_values() {
        let mut run = [-1e5, -1.0, 0.0, 1.0, 1e5];
        ActivationFunction::Sigmoid.apply(&mut run);
        assert_eq!(run[0], 0.0);
        assert!((run[1] - 0.26894).abs() < 1e-4);
        assert_eq!(run[2], 0.5);
        assert!((run[3] - 0.73106).abs() < 1e-4);
        assert_eq!(run[4], 1.0);
    }

    #[test]
    fn test_relu_boundary_values() {
        let mut run = [-2.0, -1.0, 0.0, 1.0, 2.0];
        ActivationFunction::Relu.apply(&mut run);
        assert_eq!(run, [0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_softmax_is_stable_and_normalized() {
        let mut run = [1e5, 1.0, 0.0];
        ActivationFunction::Softmax.apply(&mut run);
        let sum: f32 = run.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((run[0] - 1.0).abs() < 1e-6);

        let mut identity = [0.3, 0.3];
        ActivationFunction::Softmax.apply(&mut identity);
        assert_eq!(identity, [0.5, 0.5]);
    }
}
