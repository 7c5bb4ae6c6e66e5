use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use ndarray::Array2;
use ndarray_rand::rand::{thread_rng, Rng};

use crate::{
    config::NetworkConfig,
    error::{Error, Result},
    layer::{Dense, Layer},
    weights::{read_matrix, write_matrix},
};

/// An ordered stack of layers trained together.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl Network {
    /// Panics if the output width of a layer differs from the input width of the
    /// layer after it.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        for (i, pair) in layers.windows(2).enumerate() {
            assert_eq!(
                pair[0].outputs(),
                pair[1].inputs(),
                "layer {} outputs {} values but layer {} expects {}",
                i,
                pair[0].outputs(),
                i + 1,
                pair[1].inputs()
            );
        }
        log::debug!(
            "built network: {}",
            layers
                .iter()
                .map(|l| format!("{}->{}", l.inputs(), l.outputs()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self { layers }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Network::from_config_using(config, &mut thread_rng())
    }

    pub fn from_config_using<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> Self {
        let layers = config
            .layers
            .iter()
            .map(|l| {
                let layer = Dense::new_using(l.inputs, l.outputs, l.activation, &mut *rng);
                Box::new(layer) as Box<dyn Layer>
            })
            .collect();
        Network::new(layers)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn forward(&mut self, x: Array2<f64>) -> Array2<f64> {
        self.layers.iter_mut().fold(x, |x, layer| layer.forward(x))
    }

    /// Error slot of the last layer. The loss gradient with respect to the
    /// network output has to be written here before calling `backward`.
    pub fn output_error_mut(&mut self) -> Option<&mut Array2<f64>> {
        self.layers.last_mut().and_then(|l| l.error_mut())
    }

    /// Backpropagate from the last layer to the first. Each layer adds the error it
    /// propagates into the error slot of the layer behind it.
    pub fn backward(&mut self) {
        for i in (0..self.layers.len()).rev() {
            let (behind, rest) = self.layers.split_at_mut(i);
            let prev_error = behind.last_mut().and_then(|l| l.error_mut());
            rest[0].backward(prev_error);
        }
    }

    pub fn update(&mut self, rate: f64, momentum: f64, decay: f64) {
        for layer in self.layers.iter_mut() {
            layer.update(rate, momentum, decay);
        }
    }

    /// Release every cache and drop all layers. Calling it again is a no-op.
    pub fn teardown(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.release();
        }
        self.layers.clear();
    }

    pub fn write_weights<W: Write>(&self, writer: &mut W) -> Result<()> {
        for layer in &self.layers {
            for param in layer.parameters() {
                write_matrix(param, writer)?;
            }
        }
        Ok(())
    }

    /// Read every layer's parameters from `reader`. On error the network is left
    /// unchanged.
    pub fn read_weights<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let mut staged = Vec::new();
        for layer in &self.layers {
            for param in layer.parameters() {
                let mut buf = Array2::zeros(param.raw_dim());
                read_matrix(&mut buf, reader)?;
                staged.push(buf);
            }
        }
        let mut staged = staged.into_iter();
        for layer in self.layers.iter_mut() {
            for (param, buf) in layer.parameters_mut().into_iter().zip(staged.by_ref()) {
                *param = buf;
            }
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::open(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_weights(&mut writer)?;
        writer.flush()?;
        log::info!("saved weights of {} layers to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        self.read_weights(&mut BufReader::new(file))?;
        log::info!("loaded weights of {} layers from {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{activation::Activation, assert_rel_eq_arr2};

    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;
    use ndarray_rand::rand::{rngs::StdRng, SeedableRng};

    fn dense(weights: Array2<f64>, bias: Array2<f64>) -> Box<dyn Layer> {
        Box::new(Dense::with_parameters(weights, bias, Activation::Linear))
    }

    fn two_layer() -> Network {
        Network::new(vec![
            dense(arr2(&[[1.0, -1.0, 0.5], [2.0, 0.0, 1.0]]), arr2(&[[0.1, 0.2, 0.3]])),
            dense(arr2(&[[1.0], [2.0], [-1.0]]), arr2(&[[0.5]])),
        ])
    }

    #[test]
    fn forward_chains_layers() {
        let mut net = two_layer();
        let out = net.forward(arr2(&[[1.0, 1.0], [0.0, 2.0]]));
        // hidden: [[3.1, -0.8, 1.8], [4.1, 0.2, 2.3]]
        assert_rel_eq_arr2!(out, arr2(&[[0.2], [2.7]]), epsilon = 1e-12);
    }

    #[test]
    #[should_panic]
    fn mismatched_layers_are_rejected() {
        Network::new(vec![
            dense(Array2::zeros((2, 3)), Array2::zeros((1, 3))),
            dense(Array2::zeros((4, 1)), Array2::zeros((1, 1))),
        ]);
    }

    #[test]
    fn backward_hands_error_to_previous_layer() {
        let mut net = two_layer();
        net.forward(arr2(&[[1.0, 1.0]]));
        net.output_error_mut().unwrap().fill(1.0);
        net.backward();

        // Output layer: dW -= hidden^T · 1, db -= 1
        let grads = net.layers()[1].gradients();
        assert_rel_eq_arr2!(grads[0].clone(), arr2(&[[-1.0]]));
        assert_rel_eq_arr2!(
            grads[1].clone(),
            arr2(&[[-3.1], [0.8], [-1.8]]),
            epsilon = 1e-12
        );

        // Hidden layer received 1 · W2^T = [1, 2, -1] as its error.
        let grads = net.layers()[0].gradients();
        assert_rel_eq_arr2!(grads[0].clone(), arr2(&[[-1.0, -2.0, 1.0]]));
        assert_rel_eq_arr2!(
            grads[1].clone(),
            arr2(&[[-1.0, -2.0, 1.0], [-1.0, -2.0, 1.0]])
        );
    }

    #[test]
    fn update_moves_every_layer() {
        let mut net = two_layer();
        net.forward(arr2(&[[1.0, 1.0]]));
        net.output_error_mut().unwrap().fill(1.0);
        net.backward();
        net.update(0.1, 0.0, 0.0);

        let bias = net.layers()[1].parameters()[0].clone();
        assert_relative_eq!(bias[[0, 0]], 0.4, epsilon = 1e-12);
        let bias = net.layers()[0].parameters()[0].clone();
        assert_rel_eq_arr2!(bias, arr2(&[[0.0, 0.0, 0.4]]), epsilon = 1e-12);
        assert!(net.layers()[0].gradients()[1].iter().all(|&g| g == 0.0));
    }

    #[test]
    fn weights_round_trip_through_stream() {
        let mut rng = StdRng::seed_from_u64(42);
        let config: NetworkConfig = serde_json::from_str(
            r#"{"layers": [
                {"inputs": 4, "outputs": 3, "activation": "relu"},
                {"inputs": 3, "outputs": 2, "activation": "softmax"}
            ]}"#,
        )
        .unwrap();
        let source = Network::from_config_using(&config, &mut rng);
        let mut bytes = Vec::new();
        source.write_weights(&mut bytes).unwrap();
        assert_eq!(bytes.len(), (3 + 12 + 2 + 6) * 8);

        let mut target = Network::from_config_using(&config, &mut rng);
        target.read_weights(&mut bytes.as_slice()).unwrap();
        for (a, b) in source.layers().iter().zip(target.layers()) {
            assert_eq!(a.parameters(), b.parameters());
        }
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let mut net = two_layer();
        let bytes = vec![0u8; 12];
        assert!(matches!(
            net.read_weights(&mut bytes.as_slice()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn failed_read_leaves_parameters_untouched() {
        let mut rng = StdRng::seed_from_u64(7);
        let config: NetworkConfig = serde_json::from_str(
            r#"{"layers": [
                {"inputs": 2, "outputs": 2, "activation": "logistic"},
                {"inputs": 2, "outputs": 1, "activation": "linear"}
            ]}"#,
        )
        .unwrap();
        let source = Network::from_config_using(&config, &mut rng);
        let mut bytes = Vec::new();
        source.write_weights(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 8);

        let mut target = Network::from_config_using(&config, &mut rng);
        let before = target
            .layers()
            .iter()
            .map(|l| l.parameters().into_iter().cloned().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert!(target.read_weights(&mut bytes.as_slice()).is_err());
        for (layer, params) in target.layers().iter().zip(&before) {
            for (param, old) in layer.parameters().into_iter().zip(params) {
                assert_eq!(param, old);
            }
        }
    }

    #[test]
    fn open_failure_names_the_path() {
        let mut net = two_layer();
        let err = net.load("/nonexistent/dir/weights.bin").unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/dir/weights.bin"));
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut net = two_layer();
        net.forward(arr2(&[[1.0, 1.0]]));
        net.teardown();
        assert!(net.is_empty());
        net.teardown();

        let mut empty = Network::new(Vec::new());
        empty.teardown();
        assert!(empty.output_error_mut().is_none());
        empty.backward();
    }
}
