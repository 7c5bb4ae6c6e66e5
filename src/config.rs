use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    activation::Activation,
    error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub inputs: usize,
    pub outputs: usize,
    pub activation: Activation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub layers: Vec<LayerConfig>,
}

/// Hyperparameters for a training run, usually read from a JSON file:
///
/// ```json
/// {
///   "network": {"layers": [
///     {"inputs": 784, "outputs": 32, "activation": "leaky_relu"},
///     {"inputs": 32, "outputs": 10, "activation": "softmax"}
///   ]},
///   "rate": 0.01,
///   "momentum": 0.9,
///   "decay": 0.0005,
///   "batch_size": 128,
///   "epochs": 5
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub network: NetworkConfig,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[serde(default = "default_decay")]
    pub decay: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Seed for weight initialization and shuffling. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_rate() -> f64 {
    0.01
}

fn default_momentum() -> f64 {
    0.9
}

fn default_decay() -> f64 {
    0.0005
}

fn default_batch_size() -> usize {
    128
}

fn default_epochs() -> usize {
    10
}

impl TrainConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::open(path, e))?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}
