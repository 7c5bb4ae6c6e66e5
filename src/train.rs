use ndarray::Array2;

use crate::{config::TrainConfig, data::DataLoader, loss::LossCriterion, network::Network};

/// One training step on a minibatch: forward, seed the output error with the
/// loss gradient, backward, update. `rate` is divided by the number of rows.
/// Returns the mean loss of the batch before the update.
pub fn train_step<L: LossCriterion>(
    net: &mut Network,
    x: Array2<f64>,
    y: Array2<f64>,
    rate: f64,
    momentum: f64,
    decay: f64,
) -> f64 {
    let rows = x.nrows().max(1);
    let output = net.forward(x);
    let loss = L::compute(output.view(), y.view());

    match net.output_error_mut() {
        Some(error) => error.assign(&loss.grad()),
        None => return loss.value(),
    }
    net.backward();
    net.update(rate / rows as f64, momentum, decay);
    loss.value()
}

/// Train for `config.epochs` epochs. Returns the mean batch loss of each epoch.
pub fn train<L: LossCriterion>(
    net: &mut Network,
    loader: &mut DataLoader,
    config: &TrainConfig,
) -> Vec<f64> {
    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        let mut total_loss = 0.0;
        let mut n_batches = 0usize;
        for (x, y) in loader.batch(config.batch_size) {
            total_loss += train_step::<L>(net, x, y, config.rate, config.momentum, config.decay);
            n_batches += 1;
        }
        let mean_loss = total_loss / n_batches.max(1) as f64;
        log::info!("epoch {}: loss = {:.6}", epoch, mean_loss);
        history.push(mean_loss);
    }
    history
}
