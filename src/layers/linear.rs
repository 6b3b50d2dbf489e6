use ndarray::{Array2, Axis};
use rand::Rng;
use crate::utils::uniform_array;

/// Holds gradients for linear layer parameters during backpropagation
#[derive(Clone, Debug)]
pub struct LinearGradients {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

impl LinearGradients {
    pub fn accumulate(&mut self, other: &LinearGradients) {
        self.weight += &other.weight;
        self.bias += &other.bias;
    }

    /// Gradients in the same order as `LinearLayer::parameters`
    pub fn tensors(&self) -> [&Array2<f64>; 2] {
        [&self.weight, &self.bias]
    }
}

/// A fully connected (linear/dense) layer
///
/// Performs the transformation: output = weight * input + bias
/// where weight has shape (output_size, input_size) and bias has shape (output_size, 1)
#[derive(Clone, Debug)]
pub struct LinearLayer {
    pub weight: Array2<f64>,     // (output_size, input_size)
    pub bias: Array2<f64>,       // (output_size, 1)
    pub input_size: usize,
    pub output_size: usize,
}

impl LinearLayer {
    /// Create a new linear layer with weight and bias drawn from U(-1/√in, 1/√in)
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (input_size as f64).sqrt();

        Self {
            weight: uniform_array((output_size, input_size), bound, rng),
            bias: uniform_array((output_size, 1), bound, rng),
            input_size,
            output_size,
        }
    }

    /// Create a new linear layer with zero initialization
    pub fn new_zeros(input_size: usize, output_size: usize) -> Self {
        Self {
            weight: Array2::zeros((output_size, input_size)),
            bias: Array2::zeros((output_size, 1)),
            input_size,
            output_size,
        }
    }

    /// Create a new linear layer with custom initialization
    pub fn from_weights(weight: Array2<f64>, bias: Array2<f64>) -> Self {
        let (output_size, input_size) = weight.dim();
        assert_eq!(bias.shape(), &[output_size, 1], "Bias shape must be (output_size, 1)");

        Self {
            weight,
            bias,
            input_size,
            output_size,
        }
    }

    /// Forward pass: input (input_size, batch_size) -> output (output_size, batch_size)
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        assert_eq!(input.nrows(), self.input_size,
                   "Input size {} doesn't match layer input size {}",
                   input.nrows(), self.input_size);

        self.weight.dot(input) + &self.bias
    }

    /// Backward pass given the input that produced `grad_output`
    ///
    /// Returns (gradients, input_gradient). The bias gradient is summed over the batch.
    pub fn backward(&self, grad_output: &Array2<f64>, input: &Array2<f64>) -> (LinearGradients, Array2<f64>) {
        assert_eq!(grad_output.nrows(), self.output_size, "Gradient output size mismatch");
        assert_eq!(grad_output.ncols(), input.ncols(), "Batch size mismatch");

        let gradients = LinearGradients {
            weight: grad_output.dot(&input.t()),
            bias: grad_output.sum_axis(Axis(1)).insert_axis(Axis(1)),
        };
        let input_grad = self.weight.t().dot(grad_output);

        (gradients, input_grad)
    }

    /// Initialize zero gradients for accumulation
    pub fn zero_gradients(&self) -> LinearGradients {
        LinearGradients {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array2::zeros(self.bias.raw_dim()),
        }
    }

    pub fn parameters(&self) -> [&Array2<f64>; 2] {
        [&self.weight, &self.bias]
    }

    pub fn parameters_mut(&mut self) -> [&mut Array2<f64>; 2] {
        [&mut self.weight, &mut self.bias]
    }

    /// Get the number of parameters in this layer
    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    /// Get layer dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.input_size, self.output_size)
    }
}
