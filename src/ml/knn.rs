//! k-nearest-neighbour classifier with uniform votes.

use serde::{Deserialize, Serialize};

use super::{Classifier, MlError, TrainSet, normalize};
use crate::dataset::{Features, N_CLASSES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    pub k: usize,
    pub x: Vec<Features>,
    pub y: Vec<usize>,
}

impl KNearestNeighbors {
    pub fn fit(data: &TrainSet<'_>, k: usize) -> Result<Self, MlError> {
        if k == 0 {
            return Err(MlError::InvalidOption("k must be > 0".to_string()));
        }
        Ok(Self {
            k: k.min(data.len()),
            x: data.x.to_vec(),
            y: data.y.to_vec(),
        })
    }

    /// Training-row indices of the `k` nearest neighbours; distance ties keep row order.
    pub fn neighbors(&self, features: &Features) -> Vec<usize> {
        let mut distances: Vec<(f64, usize)> = self
            .x
            .iter()
            .enumerate()
            .map(|(idx, row)| (squared_distance(row, features), idx))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        distances.into_iter().take(self.k).map(|(_, idx)| idx).collect()
    }
}

impl Classifier for KNearestNeighbors {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        let mut votes = [0.0f64; N_CLASSES];
        for idx in self.neighbors(features) {
            votes[self.y[idx]] += 1.0;
        }
        normalize(votes)
    }
}

fn squared_distance(a: &Features, b: &Features) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_become_probabilities() {
        let x = vec![
            [0.0, 0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0, 0.0],
            [0.2, 0.0, 0.0, 0.0],
            [5.0, 0.0, 0.0, 0.0],
            [5.1, 0.0, 0.0, 0.0],
        ];
        let y = vec![0, 0, 1, 2, 2];
        let data = TrainSet::new(&x, &y).unwrap();
        let model = KNearestNeighbors::fit(&data, 3).unwrap();
        let proba = model.predict_proba(&[0.05, 0.0, 0.0, 0.0]);
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((proba[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.predict(&[4.9, 0.0, 0.0, 0.0]), 2);
    }

    #[test]
    fn k_is_clamped_to_training_size() {
        let x = vec![[0.0; 4], [1.0; 4]];
        let y = vec![0, 1];
        let data = TrainSet::new(&x, &y).unwrap();
        let model = KNearestNeighbors::fit(&data, 5).unwrap();
        assert_eq!(model.k, 2);
        assert!(KNearestNeighbors::fit(&data, 0).is_err());
    }
}
