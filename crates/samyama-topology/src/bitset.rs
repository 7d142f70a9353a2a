//! Growable bitset used for projection masks, boolean columns and
//! atomic-type sets.

use crate::executor::Executor;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Fixed-length (but resizable) bitset backed by `u64` words
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DynamicBitset {
    words: Vec<u64>,
    len: usize,
}

impl DynamicBitset {
    /// Create a bitset of `len` cleared bits
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Build a bitset from 0/1 flags, one word per parallel task
    pub fn from_flags(exec: &Executor, flags: &[u64]) -> Self {
        let len = flags.len();
        let words = exec.install(|| {
            flags
                .par_chunks(WORD_BITS)
                .map(|chunk| {
                    chunk
                        .iter()
                        .enumerate()
                        .filter(|(_, &flag)| flag != 0)
                        .fold(0u64, |word, (bit, _)| word | (1 << bit))
                })
                .collect()
        });
        Self { words, len }
    }

    /// Build a bitset from an iterator of set positions
    pub fn from_ones(len: usize, ones: impl IntoIterator<Item = usize>) -> Self {
        let mut bitset = Self::new(len);
        for idx in ones {
            bitset.set(idx);
        }
        bitset
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the bitset holds no bits at all
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set bit `idx`
    pub fn set(&mut self, idx: usize) {
        assert!(idx < self.len, "bit {} out of range {}", idx, self.len);
        self.words[idx / WORD_BITS] |= 1 << (idx % WORD_BITS);
    }

    /// Clear bit `idx`
    pub fn reset(&mut self, idx: usize) {
        assert!(idx < self.len, "bit {} out of range {}", idx, self.len);
        self.words[idx / WORD_BITS] &= !(1 << (idx % WORD_BITS));
    }

    /// Test bit `idx`; out-of-range bits read as cleared
    pub fn test(&self, idx: usize) -> bool {
        idx < self.len && self.words[idx / WORD_BITS] & (1 << (idx % WORD_BITS)) != 0
    }

    /// Number of set bits
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no bit is set
    pub fn none(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Grow or shrink to `len` bits; new bits are cleared
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }

    /// Append one bit
    pub fn push(&mut self, value: bool) {
        let idx = self.len;
        self.resize(idx + 1);
        if value {
            self.set(idx);
        }
    }

    /// Set every bit that is set in `other`
    pub fn union_with(&mut self, other: &DynamicBitset) {
        if other.len > self.len {
            self.resize(other.len);
        }
        for (word, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= o;
        }
    }

    /// True if any bit is set in both bitsets
    pub fn intersects(&self, other: &DynamicBitset) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(&a, &b)| a & b != 0)
    }

    /// True if every bit set here is also set in `other`
    pub fn is_subset_of(&self, other: &DynamicBitset) -> bool {
        self.words.iter().enumerate().all(|(i, &a)| {
            let b = other.words.get(i).copied().unwrap_or(0);
            a & !b == 0
        })
    }

    /// Positions of set bits in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }

    /// Backing words
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_test_reset() {
        let mut bits = DynamicBitset::new(130);
        bits.set(0);
        bits.set(64);
        bits.set(129);
        assert!(bits.test(0) && bits.test(64) && bits.test(129));
        assert!(!bits.test(1));
        assert!(!bits.test(500));
        assert_eq!(bits.count(), 3);
        bits.reset(64);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn test_from_flags_matches_serial() {
        let exec = Executor::single_threaded();
        let flags: Vec<u64> = (0..200).map(|i| (i % 3 == 0) as u64).collect();
        let bits = DynamicBitset::from_flags(&exec, &flags);
        assert_eq!(bits.len(), 200);
        for (i, &flag) in flags.iter().enumerate() {
            assert_eq!(bits.test(i), flag == 1);
        }
    }

    #[test]
    fn test_resize_clears_tail() {
        let mut bits = DynamicBitset::from_ones(70, [3, 68]);
        bits.resize(65);
        assert_eq!(bits.count(), 1);
        bits.resize(70);
        assert!(!bits.test(68));
        bits.push(true);
        assert!(bits.test(70));
    }

    #[test]
    fn test_union_and_intersects() {
        let mut a = DynamicBitset::from_ones(10, [1, 2]);
        let b = DynamicBitset::from_ones(12, [2, 11]);
        assert!(a.intersects(&b));
        a.union_with(&b);
        assert_eq!(a.iter_ones().collect::<Vec<_>>(), vec![1, 2, 11]);
        assert!(!DynamicBitset::new(5).intersects(&b));
    }

    #[test]
    fn test_is_subset_of() {
        let small = DynamicBitset::from_ones(70, [1, 65]);
        let big = DynamicBitset::from_ones(130, [1, 2, 65, 100]);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
        assert!(DynamicBitset::new(3).is_subset_of(&small));
    }
}
