use std::{fs::File, path::Path, vec};

use ndarray::{Array2, ArrayView2, Axis};
use ndarray_rand::rand::{rngs::StdRng, seq::index::sample, SeedableRng};

use crate::{
    encoding::OneHotEncoder,
    error::{Error, Result},
};

/// Features `x` of shape `(n, features)` with targets `y` of shape `(n, outputs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Self {
        assert_eq!(x.nrows(), y.nrows(), "features and targets differ in length");
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a CSV file whose last column is the label and whose other columns
    /// are numeric features. The first row is treated as a header.
    pub fn from_csv(path: impl AsRef<Path>, encoder: &OneHotEncoder<String>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        let mut reader = csv::Reader::from_reader(file);
        let width = reader.headers()?.len().saturating_sub(1);

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            for value in record.iter().take(width) {
                let parsed = value.trim().parse::<f64>().map_err(|_| Error::Parse {
                    line,
                    value: value.to_string(),
                })?;
                features.push(parsed);
            }
            let label = record.get(width).ok_or_else(|| Error::Parse {
                line,
                value: "<missing label>".to_string(),
            })?;
            labels.push(label.trim().to_string());
        }

        let x = Array2::from_shape_vec((labels.len(), width), features)
            .expect("every record has the header's width");
        let y = encoder.encode(&labels)?;
        log::info!("loaded {} rows from {}", labels.len(), path.display());
        Ok(Dataset::new(x, y))
    }
}

/// Sampler produces the order in which rows are visited in one epoch.
pub enum Sampler {
    Sequential(usize),
    Random(usize, StdRng),
}

impl Sampler {
    pub fn sample(&mut self) -> Vec<usize> {
        match self {
            Self::Sequential(size) => (0..*size).collect(),
            Self::Random(size, rng) => sample(rng, *size, *size).into_vec(),
        }
    }
}

/// Batch yields a minibatch each time `Iterator::next()` is called.
/// This struct is created in each epoch in a train phase.
pub struct Batch<'a> {
    indices: vec::IntoIter<usize>,
    batch_size: usize,
    drop_last: bool,
    x: ArrayView2<'a, f64>,
    y: ArrayView2<'a, f64>,
}

impl<'a> Batch<'a> {
    pub fn new(
        indices: Vec<usize>,
        batch_size: usize,
        x: ArrayView2<'a, f64>,
        y: ArrayView2<'a, f64>,
    ) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            indices: indices.into_iter(),
            batch_size,
            drop_last: false,
            x,
            y,
        }
    }

    /// If `drop_last` is true, discard last minibatch whose size is smaller than
    /// `self.batch_size`.
    pub fn drop_last(self, drop_last: bool) -> Self {
        Self { drop_last, ..self }
    }
}

impl<'a> Iterator for Batch<'a> {
    type Item = (Array2<f64>, Array2<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self
            .indices
            .by_ref()
            .take(self.batch_size)
            .collect::<Vec<_>>();

        if indices.is_empty() || (self.drop_last && indices.len() != self.batch_size) {
            None
        } else {
            Some((
                self.x.select(Axis(0), &indices),
                self.y.select(Axis(0), &indices),
            ))
        }
    }
}

/// DataLoader wraps a training set and hands out per-epoch minibatches.
pub struct DataLoader {
    sampler: Sampler,
    dataset: Dataset,
}

impl DataLoader {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            sampler: Sampler::Sequential(dataset.len()),
            dataset,
        }
    }

    pub fn size(&self) -> usize {
        self.dataset.len()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Visit rows in a random order every epoch.
    pub fn shuffle(mut self, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.sampler = Sampler::Random(self.size(), rng);
        self
    }

    /// Create a minibatch generator. This is intended to be called each epoch.
    pub fn batch(&mut self, batch_size: usize) -> Batch<'_> {
        Batch::new(
            self.sampler.sample(),
            batch_size,
            self.dataset.x.view(),
            self.dataset.y.view(),
        )
    }
}
