use ndarray::{Array2, Axis};

use crate::{data::Dataset, encoding::argmax, network::Network};

/// Class index (row argmax) of every row of `scores`.
pub fn classes(scores: &Array2<f64>) -> Vec<usize> {
    scores.axis_iter(Axis(0)).map(argmax).collect()
}

/// Fraction of rows whose predicted class matches the one-hot target.
/// Runs a forward pass, so the layer caches are overwritten.
pub fn accuracy(net: &mut Network, dataset: &Dataset) -> f64 {
    if dataset.is_empty() {
        return 0.0;
    }
    let predicted = classes(&net.forward(dataset.x.clone()));
    let expected = classes(&dataset.y);
    let n_corrects = predicted
        .iter()
        .zip(expected.iter())
        .filter(|(p, t)| p == t)
        .count();
    n_corrects as f64 / dataset.len() as f64
}

/// Item at row `i`, column `j` counts the samples of true class `i` predicted as
/// class `j`.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    assert_eq!(y_true.len(), y_pred.len());
    let mut matrix = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[t][p] += 1;
    }
    matrix
}
