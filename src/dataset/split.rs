//! Deterministic stratified train/test partitioning.

use std::collections::BTreeMap;

use super::{FlowerRow, Species};

/// Minimum rows a species needs to appear on both sides of a split.
pub const MIN_ROWS_PER_CLASS: usize = 2;

/// Errors returned when a split cannot be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplitError {
    #[error("Test fraction must be within (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("Species {species} has {count} rows; at least {MIN_ROWS_PER_CLASS} are required")]
    ClassTooSmall { species: Species, count: usize },
    #[error("Test fraction {fraction} leaves the {side} split empty")]
    EmptySplit { fraction: f64, side: &'static str },
    #[error("No rows to split")]
    NoRows,
}

/// Disjoint train/test partition of a row set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSplit {
    pub train: Vec<FlowerRow>,
    pub test: Vec<FlowerRow>,
    /// Original row indices of `train`, ascending.
    pub train_indices: Vec<usize>,
    /// Original row indices of `test`, ascending.
    pub test_indices: Vec<usize>,
}

/// Partition `rows` so each species keeps its proportion in both subsets.
///
/// Rows of each species are ordered by a `blake3` key of
/// `(seed, species, row index)`; the first `round(n * test_fraction)` keys go
/// to the test side. Both outputs keep the input row order, so identical
/// inputs and seed always produce identical partitions.
pub fn stratified_split(
    rows: &[FlowerRow],
    test_fraction: f64,
    seed: u64,
) -> Result<DataSplit, SplitError> {
    if !test_fraction.is_finite() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    if rows.is_empty() {
        return Err(SplitError::NoRows);
    }

    let mut by_class: BTreeMap<Species, Vec<(u128, usize)>> =
        Species::ALL.iter().map(|&species| (species, Vec::new())).collect();
    for (idx, row) in rows.iter().enumerate() {
        by_class
            .entry(row.species)
            .or_default()
            .push((split_key(seed, row.species, idx), idx));
    }

    let mut is_test = vec![false; rows.len()];
    for (species, mut entries) in by_class {
        let n = entries.len();
        if n < MIN_ROWS_PER_CLASS {
            return Err(SplitError::ClassTooSmall { species, count: n });
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        let test_n = ((n as f64) * test_fraction).round() as usize;
        for (_key, idx) in entries.into_iter().take(test_n.min(n)) {
            is_test[idx] = true;
        }
    }

    let mut split = DataSplit {
        train: Vec::new(),
        test: Vec::new(),
        train_indices: Vec::new(),
        test_indices: Vec::new(),
    };
    for (idx, row) in rows.iter().enumerate() {
        if is_test[idx] {
            split.test.push(*row);
            split.test_indices.push(idx);
        } else {
            split.train.push(*row);
            split.train_indices.push(idx);
        }
    }
    if split.test.is_empty() {
        return Err(SplitError::EmptySplit {
            fraction: test_fraction,
            side: "test",
        });
    }
    if split.train.is_empty() {
        return Err(SplitError::EmptySplit {
            fraction: test_fraction,
            side: "train",
        });
    }
    Ok(split)
}

fn split_key(seed: u64, species: Species, idx: usize) -> u128 {
    let hash = blake3::hash(format!("{seed}|{}|{idx}", species.as_str()).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    u128::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::reference::reference_flowers;
    use crate::dataset::species_counts;

    #[test]
    fn reference_split_is_stratified() {
        let rows = reference_flowers();
        let split = stratified_split(&rows, 0.2, 42).unwrap();
        assert_eq!(split.train.len(), 120);
        assert_eq!(split.test.len(), 30);
        assert_eq!(species_counts(&split.test), [10, 10, 10]);
        assert_eq!(species_counts(&split.train), [40, 40, 40]);
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let rows = reference_flowers();
        let first = stratified_split(&rows, 0.2, 42).unwrap();
        let second = stratified_split(&rows, 0.2, 42).unwrap();
        assert_eq!(first, second);
        for idx in &first.test_indices {
            assert!(!first.train_indices.contains(idx));
        }
        assert_eq!(first.train_indices.len() + first.test_indices.len(), rows.len());
    }

    #[test]
    fn different_seeds_change_the_partition() {
        let rows = reference_flowers();
        let a = stratified_split(&rows, 0.2, 1).unwrap();
        let b = stratified_split(&rows, 0.2, 2).unwrap();
        assert_ne!(a.test_indices, b.test_indices);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let rows = reference_flowers();
        assert_eq!(
            stratified_split(&rows, 0.0, 42),
            Err(SplitError::InvalidFraction(0.0))
        );
        assert_eq!(
            stratified_split(&rows, 1.0, 42),
            Err(SplitError::InvalidFraction(1.0))
        );
        assert!(matches!(
            stratified_split(&rows, 0.001, 42),
            Err(SplitError::EmptySplit { side: "test", .. })
        ));
        assert!(matches!(
            stratified_split(&rows, 0.999, 42),
            Err(SplitError::EmptySplit { side: "train", .. })
        ));
        let tiny = vec![rows[0], rows[1], rows[50], rows[51], rows[100]];
        assert_eq!(
            stratified_split(&tiny, 0.5, 42),
            Err(SplitError::ClassTooSmall {
                species: Species::Virginica,
                count: 1
            })
        );
        assert_eq!(stratified_split(&[], 0.5, 42), Err(SplitError::NoRows));
    }

    #[test]
    fn absent_species_is_too_small() {
        let rows = reference_flowers();
        assert_eq!(
            stratified_split(&rows[..100], 0.2, 42),
            Err(SplitError::ClassTooSmall {
                species: Species::Virginica,
                count: 0
            })
        );
    }
}
