use std::{collections::HashMap, hash::Hash};

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Error, Result};

/// Encode labels to one-hot rows and decode them back.
pub struct OneHotEncoder<Label>
where
    Label: Hash + Eq + Clone,
{
    label_to_id: HashMap<Label, usize>,
    id_to_label: Vec<Label>,
}

impl<Label> OneHotEncoder<Label>
where
    Label: Hash + Eq + Clone,
{
    /// The position of a label in `label_kinds` is its column in the encoding.
    pub fn new(label_kinds: &[Label]) -> Self {
        let label_to_id = label_kinds
            .iter()
            .cloned()
            .enumerate()
            .map(|(id, label)| (label, id))
            .collect();
        Self {
            label_to_id,
            id_to_label: label_kinds.to_vec(),
        }
    }

    pub fn n_labels(&self) -> usize {
        self.id_to_label.len()
    }

    pub fn labels(&self) -> &[Label] {
        &self.id_to_label
    }

    pub fn id(&self, label: &Label) -> Option<usize> {
        self.label_to_id.get(label).copied()
    }

    /// Matrix of shape `(labels.len(), n_labels)`.
    pub fn encode(&self, labels: &[Label]) -> Result<Array2<f64>>
    where
        Label: ToString,
    {
        let mut one_hot = Array2::zeros((labels.len(), self.n_labels()));
        for (row, label) in labels.iter().enumerate() {
            let id = self
                .id(label)
                .ok_or_else(|| Error::UnknownLabel(label.to_string()))?;
            one_hot[[row, id]] = 1.0;
        }
        Ok(one_hot)
    }

    /// The decoded label of each row is the one with the largest score.
    pub fn decode(&self, scores: &Array2<f64>) -> Vec<Label> {
        scores
            .axis_iter(Axis(0))
            .map(|row| self.id_to_label[argmax(row)].clone())
            .collect()
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}
