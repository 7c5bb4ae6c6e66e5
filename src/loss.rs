use ndarray::{Array2, ArrayView2, Zip};

/// A loss over a batch, used to seed the error slot of the output layer.
///
/// `grad` is the gradient of the summed (not averaged) loss, so the trainer is
/// expected to divide the learning rate by the batch size.
pub trait LossCriterion {
    fn compute(output: ArrayView2<f64>, target: ArrayView2<f64>) -> Self;

    /// Mean loss per row.
    fn value(&self) -> f64;

    fn grad(&self) -> Array2<f64>;
}

/// Half the squared error, summed over columns and averaged over rows.
pub struct MeanSquaredError {
    output: Array2<f64>,
    target: Array2<f64>,
    value: f64,
}

impl LossCriterion for MeanSquaredError {
    fn compute(output: ArrayView2<f64>, target: ArrayView2<f64>) -> Self {
        assert_eq!(output.shape(), target.shape());

        let rows = output.nrows().max(1);
        let loss = Zip::from(&output)
            .and(&target)
            .fold(0.0, |loss, &p, &t| loss + (p - t).powi(2))
            / (2 * rows) as f64;

        Self {
            output: output.to_owned(),
            target: target.to_owned(),
            value: loss,
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn grad(&self) -> Array2<f64> {
        &self.output - &self.target
    }
}

/// Cross entropy of softmax probabilities against one-hot targets.
///
/// The gradient is taken with respect to the softmax input (`p - t`); the
/// softmax activation passes it through unchanged.
pub struct CrossEntropy {
    output: Array2<f64>,
    target: Array2<f64>,
    value: f64,
}

impl LossCriterion for CrossEntropy {
    fn compute(output: ArrayView2<f64>, target: ArrayView2<f64>) -> Self {
        assert_eq!(output.shape(), target.shape());

        let rows = output.nrows().max(1);
        let loss = Zip::from(&output)
            .and(&target)
            .fold(0.0, |loss, &p, &t| {
                // 0 · ln 0 counts as 0
                if t == 0.0 {
                    loss
                } else {
                    loss - t * p.ln()
                }
            })
            / rows as f64;

        Self {
            output: output.to_owned(),
            target: target.to_owned(),
            value: loss,
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn grad(&self) -> Array2<f64> {
        &self.output - &self.target
    }
}
