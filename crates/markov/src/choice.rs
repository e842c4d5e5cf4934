use std::{collections::HashMap, hash::Hash};

use rand::Rng;

/// Weighted multiset: every `insert` bumps the value's weight by one.
#[derive(Debug, Clone)]
pub struct ChoiceMap<T: Eq + Hash> {
    counts: HashMap<T, usize>,
    total: usize,
}

impl<T: Eq + Hash> Default for ChoiceMap<T> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            total: 0,
        }
    }
}

impl<T: Eq + Hash> ChoiceMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, val: T) {
        *self.counts.entry(val).or_insert(0) += 1;
        self.total += 1;
    }

    /// Number of insertions so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn weight(&self, val: &T) -> usize {
        self.counts.get(val).copied().unwrap_or(0)
    }

    /// Pick a value with probability proportional to its weight.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&T> {
        self.choose_biased(rng, |_| 1)
    }

    /// Pick a value with probability proportional to `weight * bias(value)`.
    ///
    /// Returns `None` when the map is empty or every biased weight is zero.
    pub fn choose_biased<R, F>(&self, rng: &mut R, bias: F) -> Option<&T>
    where
        R: Rng,
        F: Fn(&T) -> usize,
    {
        let total: usize = self.counts.iter().map(|(k, v)| v * bias(k)).sum();
        if total == 0 {
            return None;
        }
        let n = rng.random_range(0..total);
        self.counts
            .iter()
            .scan(0, |acc, (k, v)| {
                *acc += v * bias(k);
                Some((k, *acc))
            })
            .find_map(|(k, acc)| (acc > n).then_some(k))
    }
}
