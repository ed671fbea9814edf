//! Label-stratified train/test splitting

use crate::error::{PredMaintError, Result};
use crate::schema::MachineRecord;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Split configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of each class held out for testing, in (0, 1)
    pub test_size: f64,
    /// Seed for the per-class shuffles
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl SplitConfig {
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PredMaintError::invalid_parameter(
                "test_size",
                self.test_size,
                "must lie strictly between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// Row indices of the two partitions, each in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified splitter: each label class is split separately with the same
/// test fraction, so both partitions keep the dataset's class ratio.
#[derive(Debug, Clone, Default)]
pub struct StratifiedSplitter {
    config: SplitConfig,
}

impl StratifiedSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Split row positions by label. Same labels and seed give the same split.
    pub fn split(&self, labels: &[u8]) -> Result<SplitIndices> {
        self.config.validate()?;
        if labels.is_empty() {
            return Err(PredMaintError::InvalidInput(
                "cannot split an empty dataset".to_string(),
            ));
        }

        // Ordered map so classes are always visited in the same order
        let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::new();

        for indices in by_class.values_mut() {
            let n_test = (indices.len() as f64 * self.config.test_size).round() as usize;
            indices.shuffle(&mut rng);
            test.extend_from_slice(&indices[..n_test]);
            train.extend_from_slice(&indices[n_test..]);
        }

        if train.is_empty() || test.is_empty() {
            return Err(PredMaintError::InvalidInput(format!(
                "stratified split of {} rows at test_size {} leaves an empty partition",
                labels.len(),
                self.config.test_size
            )));
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok(SplitIndices { train, test })
    }

    /// Split canonical records into (train, test)
    pub fn split_records(
        &self,
        records: &[MachineRecord],
    ) -> Result<(Vec<MachineRecord>, Vec<MachineRecord>)> {
        let labels: Vec<u8> = records.iter().map(|r| r.machine_failure).collect();
        let SplitIndices { train, test } = self.split(&labels)?;

        let train: Vec<MachineRecord> = train.iter().map(|&i| records[i].clone()).collect();
        let test: Vec<MachineRecord> = test.iter().map(|&i| records[i].clone()).collect();

        info!(
            n_train = train.len(),
            n_test = test.len(),
            train_positives = train.iter().filter(|r| r.is_failure()).count(),
            test_positives = test.iter().filter(|r| r.is_failure()).count(),
            "Stratified split"
        );
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize, positives: usize) -> Vec<u8> {
        // Spread positives through the sequence
        (0..n).map(|i| u8::from(i % (n / positives) == 0)).collect()
    }

    #[test]
    fn test_stratified_counts() {
        let y = labels(1000, 100);
        let split = StratifiedSplitter::default().split(&y).unwrap();

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 20);
        assert_eq!(split.test.len(), 200);
        assert_eq!(split.train.len(), 800);
    }

    #[test]
    fn test_deterministic_and_disjoint() {
        let y = labels(500, 25);
        let splitter = StratifiedSplitter::new(SplitConfig::default().with_random_state(7));
        let a = splitter.split(&y).unwrap();
        let b = splitter.split(&y).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_changes_partition() {
        let y = labels(500, 25);
        let a = StratifiedSplitter::new(SplitConfig::default().with_random_state(1)).split(&y).unwrap();
        let b = StratifiedSplitter::new(SplitConfig::default().with_random_state(2)).split(&y).unwrap();
        assert_ne!(a.test, b.test);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(StratifiedSplitter::default().split(&[]).is_err());
        let bad = StratifiedSplitter::new(SplitConfig::default().with_test_size(1.0));
        assert!(bad.split(&[0, 1, 0, 1]).is_err());
        // one row per class rounds to an empty test partition
        let tiny = StratifiedSplitter::new(SplitConfig::default().with_test_size(0.2));
        assert!(tiny.split(&[0, 1]).is_err());
    }
}
