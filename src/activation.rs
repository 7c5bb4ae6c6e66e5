use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Pointwise nonlinearity applied at the end of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Logistic,
    Relu,
    LeakyRelu,
    /// Row-wise softmax. Meant to be paired with `CrossEntropy`, whose gradient
    /// is already taken with respect to the softmax input.
    Softmax,
}

const LEAKY_SLOPE: f64 = 0.1;

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Activation {
    /// Apply the activation to `m` in place.
    pub fn apply(self, m: &mut Array2<f64>) {
        match self {
            Self::Linear => {}
            Self::Logistic => m.mapv_inplace(logistic),
            Self::Relu => m.mapv_inplace(|v| if v > 0.0 { v } else { 0.0 }),
            Self::LeakyRelu => m.mapv_inplace(|v| if v > 0.0 { v } else { LEAKY_SLOPE * v }),
            Self::Softmax => {
                for mut row in m.axis_iter_mut(Axis(0)) {
                    let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|v| v / sum);
                }
            }
        }
    }

    /// Multiply `delta` in place by the derivative of the activation, evaluated at
    /// the activated `output`.
    pub fn gradient(self, output: ArrayView2<f64>, delta: &mut Array2<f64>) {
        assert_eq!(output.shape(), delta.shape());
        match self {
            Self::Linear | Self::Softmax => {}
            Self::Logistic => Zip::from(delta)
                .and(output)
                .for_each(|d, &y| *d *= y * (1.0 - y)),
            Self::Relu => Zip::from(delta)
                .and(output)
                .for_each(|d, &y| *d *= if y > 0.0 { 1.0 } else { 0.0 }),
            Self::LeakyRelu => Zip::from(delta)
                .and(output)
                .for_each(|d, &y| *d *= if y > 0.0 { 1.0 } else { LEAKY_SLOPE }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_rel_eq_arr2;

    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn logistic_apply() {
        let mut x = arr2(&[[-2.0, -1.0, 0.0, 1.0, 2.0]]);
        Activation::Logistic.apply(&mut x);
        let expected = arr2(&[[
            0.1192029220221175,
            0.2689414213699951,
            0.5000000000000000,
            0.7310585786300049,
            0.8807970779778823,
        ]]);
        assert_rel_eq_arr2!(x, expected, epsilon = 1e-12);
    }

    #[test]
    fn logistic_gradient_at_output() {
        let mut output = arr2(&[[-2.0, -1.0, 0.0, 1.0, 2.0]]);
        Activation::Logistic.apply(&mut output);
        let mut delta = Array2::ones((1, 5));
        Activation::Logistic.gradient(output.view(), &mut delta);
        let expected = arr2(&[[
            0.1049935854035065,
            0.1966119332414819,
            0.2500000000000000,
            0.1966119332414819,
            0.1049935854035066,
        ]]);
        assert_rel_eq_arr2!(delta, expected, epsilon = 1e-12);
    }

    #[test]
    fn relu_apply_and_gradient() {
        let mut x = arr2(&[[-2.0, -1.0, 0.0, 1.0, 2.0]]);
        Activation::Relu.apply(&mut x);
        assert_rel_eq_arr2!(x, arr2(&[[0.0, 0.0, 0.0, 1.0, 2.0]]));

        let mut delta = arr2(&[[3.0, 3.0, 3.0, 3.0, 3.0]]);
        Activation::Relu.gradient(x.view(), &mut delta);
        assert_rel_eq_arr2!(delta, arr2(&[[0.0, 0.0, 0.0, 3.0, 3.0]]));
    }

    #[test]
    fn leaky_relu_keeps_small_slope() {
        let mut x = arr2(&[[-2.0, 4.0]]);
        Activation::LeakyRelu.apply(&mut x);
        assert_rel_eq_arr2!(x, arr2(&[[-0.2, 4.0]]));

        let mut delta = arr2(&[[1.0, 1.0]]);
        Activation::LeakyRelu.gradient(x.view(), &mut delta);
        assert_rel_eq_arr2!(delta, arr2(&[[0.1, 1.0]]));
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let mut x = arr2(&[[1.0, 0.5, -0.1, 0.5, 0.2, 3.0], [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        Activation::Softmax.apply(&mut x);
        assert_rel_eq_arr2!(
            x.row(0).to_owned().insert_axis(Axis(0)),
            arr2(&[[
                0.0962990589663384,
                0.058408331764559,
                0.0320551721172303,
                0.058408331764559,
                0.0432699564108081,
                0.7115591489765052
            ]]),
            epsilon = 1e-12
        );
        assert_relative_eq!(x.row(1).sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn linear_gradient_is_identity() {
        let output = arr2(&[[-5.0, 5.0]]);
        let mut delta = arr2(&[[0.3, -0.7]]);
        Activation::Linear.gradient(output.view(), &mut delta);
        assert_rel_eq_arr2!(delta, arr2(&[[0.3, -0.7]]));
    }

    #[test]
    fn deserialize_from_snake_case() {
        let a: Activation = serde_json::from_str("\"leaky_relu\"").unwrap();
        assert_eq!(a, Activation::LeakyRelu);
    }
}
