//! Set rules: the validity predicate and the solver.
//!
//! The coordination engine never looks inside an item. It asks a
//! [`Validator`] whether three items form a set and a [`Solver`] whether any
//! set exists among a collection. [`CardRules`] is the classic
//! implementation: every card is a vector of features, and three cards form
//! a set when each feature is either all equal or all different.

use crate::board::ItemId;
use crate::config::{GameConfig, SET_SIZE};

/// Decides whether a claimed triple is a set. Must be pure.
pub trait Validator: Send + Sync {
    /// Test the given items (exactly [`SET_SIZE`] of them).
    fn is_valid_set(&self, items: &[ItemId]) -> bool;
}

/// Finds sets among a collection of items. Must be pure.
pub trait Solver: Send + Sync {
    /// Return up to `max` sets found in `items`.
    fn find_sets(&self, items: &[ItemId], max: usize) -> Vec<[ItemId; SET_SIZE]>;

    /// Whether at least one set exists in `items`.
    fn has_set(&self, items: &[ItemId]) -> bool {
        !self.find_sets(items, 1).is_empty()
    }
}

/// Feature-vector card rules.
///
/// Card ids are decoded as base-`feature_size` numbers; digit `k` (least
/// significant first) is the value of feature `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRules {
    feature_count: u32,
    feature_size: u32,
}

impl CardRules {
    /// Create rules for the given feature shape.
    pub const fn new(feature_count: u32, feature_size: u32) -> Self {
        Self {
            feature_count,
            feature_size,
        }
    }

    /// Rules matching a game configuration.
    pub const fn from_config(config: &GameConfig) -> Self {
        Self::new(config.feature_count, config.feature_size)
    }

    /// Decode a card id into its feature values.
    pub fn features(&self, item: ItemId) -> Vec<u32> {
        let base = self.feature_size as usize;
        let mut rest = item;
        (0..self.feature_count)
            .map(|_| {
                let digit = rest % base;
                rest /= base;
                digit as u32
            })
            .collect()
    }

    fn feature_matches(&self, items: &[ItemId; SET_SIZE]) -> bool {
        let decoded: Vec<Vec<u32>> = items.iter().map(|&item| self.features(item)).collect();
        (0..self.feature_count as usize).all(|k| {
            let (a, b, c) = (decoded[0][k], decoded[1][k], decoded[2][k]);
            let all_same = a == b && b == c;
            let all_different = a != b && b != c && a != c;
            all_same || all_different
        })
    }
}

impl Validator for CardRules {
    fn is_valid_set(&self, items: &[ItemId]) -> bool {
        match <[ItemId; SET_SIZE]>::try_from(items) {
            Ok(triple) => {
                triple[0] != triple[1]
                    && triple[1] != triple[2]
                    && triple[0] != triple[2]
                    && self.feature_matches(&triple)
            }
            Err(_) => false,
        }
    }
}

impl Solver for CardRules {
    fn find_sets(&self, items: &[ItemId], max: usize) -> Vec<[ItemId; SET_SIZE]> {
        let mut found = Vec::new();
        if max == 0 {
            return found;
        }
        for i in 0..items.len() {
            for j in i + 1..items.len() {
                for k in j + 1..items.len() {
                    let triple = [items[i], items[j], items[k]];
                    if self.is_valid_set(&triple) {
                        found.push(triple);
                        if found.len() >= max {
                            return found;
                        }
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_decode_base_digits() {
        let rules = CardRules::new(4, 3);
        assert_eq!(rules.features(0), vec![0, 0, 0, 0]);
        assert_eq!(rules.features(1), vec![1, 0, 0, 0]);
        assert_eq!(rules.features(5), vec![2, 1, 0, 0]);
        assert_eq!(rules.features(80), vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_valid_and_invalid_sets() {
        let rules = CardRules::new(4, 3);
        // first feature 0,1,2; everything else equal
        assert!(rules.is_valid_set(&[0, 1, 2]));
        // every feature different
        assert!(rules.is_valid_set(&[0, 40, 80]));
        // first feature 0,1,0
        assert!(!rules.is_valid_set(&[0, 1, 3]));
        assert!(!rules.is_valid_set(&[0, 0, 0]));
        assert!(!rules.is_valid_set(&[0, 1]));
    }

    #[test]
    fn test_find_sets_respects_max() {
        let rules = CardRules::new(4, 3);
        let deck: Vec<ItemId> = (0..81).collect();
        assert_eq!(rules.find_sets(&deck, 5).len(), 5);
        // every pair of the 81 cards completes to exactly one set
        assert_eq!(rules.find_sets(&deck, usize::MAX).len(), 81 * 80 / 6);
        assert!(rules.find_sets(&deck, 0).is_empty());
    }

    #[test]
    fn test_no_set_among_small_collections() {
        let rules = CardRules::new(4, 3);
        assert!(!rules.has_set(&[0, 1]));
        assert!(!rules.has_set(&[0, 1, 3, 4]));
        assert!(rules.has_set(&[0, 1, 3, 4, 2]));
    }
}
