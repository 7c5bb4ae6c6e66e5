use ndarray::Array2;
use ndarray_rand::rand::{thread_rng, Rng};

use crate::{
    activation::Activation,
    ops::{backward_bias, forward_bias, random_matrix},
};

/// A trainable stage of a network.
///
/// The network drives every layer through the same cycle: `forward` caches
/// what `backward` needs, `backward` accumulates gradients and propagates the
/// error signal one layer back, `update` folds the accumulated gradients into
/// the parameters.
pub trait Layer {
    fn inputs(&self) -> usize;

    fn outputs(&self) -> usize;

    /// Run the layer on `input` and return its output.
    fn forward(&mut self, input: Array2<f64>) -> Array2<f64>;

    /// Propagate the error held in this layer's error slot.
    /// `prev_error` is the error slot of the layer behind this one, or `None` for
    /// the first layer.
    fn backward(&mut self, prev_error: Option<&mut Array2<f64>>);

    fn update(&mut self, rate: f64, momentum: f64, decay: f64);

    /// The buffer that receives this layer's output error during the next
    /// backward pass. `None` until the layer has run forward.
    fn error_mut(&mut self) -> Option<&mut Array2<f64>>;

    /// Trainable parameters, in the order they are persisted.
    fn parameters(&self) -> Vec<&Array2<f64>>;

    fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>>;

    /// Gradient accumulators, matching `parameters` one to one.
    fn gradients(&self) -> Vec<&Array2<f64>>;

    /// Drop the cached buffers of the last pass.
    fn release(&mut self);
}

/// Fully connected layer computing `f(x·W + b)`.
#[derive(Debug)]
pub struct Dense {
    weights: Array2<f64>,
    bias: Array2<f64>,
    weight_grad: Array2<f64>,
    bias_grad: Array2<f64>,
    last_input: Option<Array2<f64>>,
    last_output: Option<Array2<f64>>,
    last_error: Option<Array2<f64>>,
    activation: Activation,
}

impl Dense {
    pub fn new(inputs: usize, outputs: usize, activation: Activation) -> Self {
        Dense::new_using(inputs, outputs, activation, &mut thread_rng())
    }

    /// Weights are drawn from `[-s, s]` with `s = sqrt(2 / inputs)`.
    pub fn new_using<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        assert!(inputs > 0 && outputs > 0, "layer dimensions must be positive");
        let scale = (2.0 / inputs as f64).sqrt();
        let weights = random_matrix(inputs, outputs, scale, rng);
        Dense::with_parameters(weights, Array2::zeros((1, outputs)), activation)
    }

    pub fn with_parameters(weights: Array2<f64>, bias: Array2<f64>, activation: Activation) -> Self {
        assert_eq!(bias.nrows(), 1, "bias must have exactly one row");
        assert_eq!(weights.ncols(), bias.ncols());
        let weight_grad = Array2::zeros(weights.raw_dim());
        let bias_grad = Array2::zeros(bias.raw_dim());
        Self {
            weights,
            bias,
            weight_grad,
            bias_grad,
            last_input: None,
            last_output: None,
            last_error: None,
            activation,
        }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    pub fn weight_grad(&self) -> &Array2<f64> {
        &self.weight_grad
    }

    pub fn bias_grad(&self) -> &Array2<f64> {
        &self.bias_grad
    }
}

impl Layer for Dense {
    fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    fn forward(&mut self, input: Array2<f64>) -> Array2<f64> {
        assert_eq!(
            input.ncols(),
            self.inputs(),
            "input width does not match layer inputs"
        );
        let mut output = input.dot(&self.weights);
        forward_bias(&mut output, &self.bias);
        self.activation.apply(&mut output);

        self.last_error = Some(Array2::zeros(output.raw_dim()));
        self.last_input = Some(input);
        self.last_output = Some(output.clone());
        output
    }

    fn backward(&mut self, prev_error: Option<&mut Array2<f64>>) {
        let (input, output, error) = match (
            &self.last_input,
            &self.last_output,
            self.last_error.as_mut(),
        ) {
            (Some(input), Some(output), Some(error)) => (input, output, error),
            _ => {
                log::warn!("backward called on a dense layer that has not run forward");
                return;
            }
        };

        // dL/d(output) -> dL/d(x·W + b)
        self.activation.gradient(output.view(), error);

        backward_bias(error.view(), &mut self.bias_grad);
        let weight_grad = input.t().dot(&*error);
        self.weight_grad.scaled_add(-1.0, &weight_grad);

        if let Some(prev_error) = prev_error {
            let input_grad = error.dot(&self.weights.t());
            *prev_error += &input_grad;
        }
    }

    fn update(&mut self, rate: f64, momentum: f64, decay: f64) {
        self.weight_grad.scaled_add(-decay, &self.weights);

        self.weights.scaled_add(rate, &self.weight_grad);
        self.bias.scaled_add(rate, &self.bias_grad);

        self.weight_grad *= momentum;
        self.bias_grad *= momentum;
    }

    fn error_mut(&mut self) -> Option<&mut Array2<f64>> {
        self.last_error.as_mut()
    }

    fn parameters(&self) -> Vec<&Array2<f64>> {
        vec![&self.bias, &self.weights]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>> {
        vec![&mut self.bias, &mut self.weights]
    }

    fn gradients(&self) -> Vec<&Array2<f64>> {
        vec![&self.bias_grad, &self.weight_grad]
    }

    fn release(&mut self) {
        self.last_input = None;
        self.last_output = None;
        self.last_error = None;
    }
}
