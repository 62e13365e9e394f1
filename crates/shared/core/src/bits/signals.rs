use serde::{Deserialize, Serialize};

use super::{WORD_BITS, word_count};

/// Packed vector of market signal bits
///
/// Bit `i` lives in word `i / 64` at position `i % 64`. Bits past `len()`
/// in the last word are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalBits {
    len: usize,
    words: Vec<u64>,
}

impl SignalBits {
    /// All-zero vector of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; word_count(len)],
        }
    }

    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = Self::new(values.len());
        for (i, &v) in values.iter().enumerate() {
            bits.set(i, v);
        }
        bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of 64-bit words backing the vector
    #[inline]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Get bit `i`. Out-of-range bits read as 0.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Set bit `i`. Out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        if i >= self.len {
            return;
        }
        let mask = 1u64 << (i % WORD_BITS);
        if value {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    /// Flip bit `i`
    pub fn toggle(&mut self, i: usize) {
        let v = self.get(i);
        self.set(i, !v);
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_across_words() {
        let mut bits = SignalBits::new(130);
        assert_eq!(bits.word_count(), 3);

        bits.set(0, true);
        bits.set(64, true);
        bits.set(129, true);

        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert_eq!(bits.count_ones(), 3);

        bits.set(64, false);
        assert!(!bits.get(64));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut bits = SignalBits::new(3);
        bits.set(10, true);
        assert!(!bits.get(10));
        assert_eq!(bits.count_ones(), 0);
    }

    #[test]
    fn test_from_bools_roundtrip() {
        let values = [true, false, true, true, false];
        let bits = SignalBits::from_bools(&values);
        let back: Vec<bool> = bits.iter().collect();
        assert_eq!(back, values);
    }

    #[test]
    fn test_toggle() {
        let mut bits = SignalBits::new(8);
        bits.toggle(3);
        assert!(bits.get(3));
        bits.toggle(3);
        assert!(!bits.get(3));
    }
}
