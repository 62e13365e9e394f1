use serde::{Deserialize, Serialize};
use std::fmt;

use super::{SignalBits, Trit, WORD_BITS, word_count};

/// Partially specified bit pattern over the market signal vector
///
/// Stored as two packed masks:
/// - `care`: 1 where the bit is specified
/// - `value`: the required value (always 0 where `care` is 0)
///
/// A signal vector matches iff `(signal ^ value) & care == 0` in every word.
/// Serialized as the per-bit trit list, so deserialized conditions are
/// rebuilt through `set` and keep both invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Trit>", from = "Vec<Trit>")]
pub struct Condition {
    len: usize,
    care: Vec<u64>,
    value: Vec<u64>,
    specificity: usize,
}

impl Condition {
    /// All don't-care condition over `len` bits
    pub fn new(len: usize) -> Self {
        let words = word_count(len);
        Self {
            len,
            care: vec![0; words],
            value: vec![0; words],
            specificity: 0,
        }
    }

    /// Fully specified condition requiring exactly `signals`
    pub fn from_signals(signals: &SignalBits) -> Self {
        let mut cond = Self::new(signals.len());
        for i in 0..signals.len() {
            cond.set(i, Trit::from_bool(signals.get(i)));
        }
        cond
    }

    /// Build from per-bit trits
    pub fn from_trits(trits: &[Trit]) -> Self {
        let mut cond = Self::new(trits.len());
        for (i, &t) in trits.iter().enumerate() {
            cond.set(i, t);
        }
        cond
    }

    /// Number of condition bits
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of 64-bit words per mask
    #[inline]
    pub fn word_count(&self) -> usize {
        self.care.len()
    }

    #[inline]
    pub fn care_words(&self) -> &[u64] {
        &self.care
    }

    #[inline]
    pub fn value_words(&self) -> &[u64] {
        &self.value
    }

    /// Number of specified (non don't-care) bits
    #[inline]
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    #[inline]
    pub fn dont_care_count(&self) -> usize {
        self.len - self.specificity
    }

    pub fn get(&self, i: usize) -> Trit {
        if i >= self.len {
            return Trit::DontCare;
        }
        let (w, mask) = (i / WORD_BITS, 1u64 << (i % WORD_BITS));
        if self.care[w] & mask == 0 {
            Trit::DontCare
        } else if self.value[w] & mask == 0 {
            Trit::Zero
        } else {
            Trit::One
        }
    }

    /// Set bit `i`, keeping specificity in step. Out-of-range writes are ignored.
    pub fn set(&mut self, i: usize, trit: Trit) {
        if i >= self.len {
            return;
        }
        let (w, mask) = (i / WORD_BITS, 1u64 << (i % WORD_BITS));
        let was_specified = self.care[w] & mask != 0;

        match trit {
            Trit::DontCare => {
                self.care[w] &= !mask;
                self.value[w] &= !mask;
            }
            Trit::Zero => {
                self.care[w] |= mask;
                self.value[w] &= !mask;
            }
            Trit::One => {
                self.care[w] |= mask;
                self.value[w] |= mask;
            }
        }

        match (was_specified, trit.is_specified()) {
            (false, true) => self.specificity += 1,
            (true, false) => self.specificity -= 1,
            _ => {}
        }
    }

    /// Masked comparison against a signal vector, one word at a time.
    ///
    /// Signal words beyond the vector's length read as zero.
    #[inline]
    pub fn matches(&self, signals: &SignalBits) -> bool {
        let words = signals.words();
        self.care
            .iter()
            .zip(self.value.iter())
            .enumerate()
            .all(|(w, (&care, &value))| {
                let signal = words.get(w).copied().unwrap_or(0);
                (signal ^ value) & care == 0
            })
    }

    /// Number of positions whose trits differ
    pub fn distance(&self, other: &Condition) -> usize {
        self.care
            .iter()
            .zip(&other.care)
            .zip(self.value.iter().zip(&other.value))
            .map(|((ca, cb), (va, vb))| ((ca ^ cb) | (va ^ vb)).count_ones() as usize)
            .sum()
    }

    /// Indices of specified bits, ascending
    pub fn specified_bits(&self) -> Vec<usize> {
        (0..self.len).filter(|&i| self.get(i).is_specified()).collect()
    }

    /// Combine two parents bit by bit.
    ///
    /// Where `pick_first` has a 1 the child takes `a`'s trit, otherwise `b`'s.
    /// Bits on which the parents agree are therefore always inherited.
    pub fn uniform_crossover(a: &Condition, b: &Condition, pick_first: &[u64]) -> Condition {
        let mut child = Condition::new(a.len);
        for w in 0..child.care.len() {
            let m = pick_first.get(w).copied().unwrap_or(0);
            let (cb, vb) = (b.care.get(w).copied().unwrap_or(0), b.value.get(w).copied().unwrap_or(0));
            child.care[w] = (a.care[w] & m) | (cb & !m);
            child.value[w] = (a.value[w] & m) | (vb & !m);
        }
        child.trim_tail();
        child.recount();
        child
    }

    fn trim_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let (Some(c), Some(v)) = (self.care.last_mut(), self.value.last_mut()) {
                let keep = (1u64 << rem) - 1;
                *c &= keep;
                *v &= keep;
            }
        }
    }

    fn recount(&mut self) {
        self.specificity = self.care.iter().map(|w| w.count_ones() as usize).sum();
    }
}

impl From<Vec<Trit>> for Condition {
    fn from(trits: Vec<Trit>) -> Self {
        Self::from_trits(&trits)
    }
}

impl From<Condition> for Vec<Trit> {
    fn from(cond: Condition) -> Self {
        (0..cond.len).map(|i| cond.get(i)).collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_specificity(cond: &Condition) {
        let counted = (0..cond.len())
            .filter(|&i| cond.get(i) != Trit::DontCare)
            .count();
        assert_eq!(cond.specificity(), counted);
        assert_eq!(cond.specificity(), cond.len() - cond.dont_care_count());
        assert!(cond.specificity() <= cond.len());
    }

    #[test]
    fn test_new_is_all_wildcard() {
        let cond = Condition::new(70);
        assert_eq!(cond.word_count(), 2);
        assert_eq!(cond.specificity(), 0);
        assert!(cond.matches(&SignalBits::new(70)));

        let mut ones = SignalBits::new(70);
        for i in 0..70 {
            ones.set(i, true);
        }
        assert!(cond.matches(&ones));
    }

    #[test]
    fn test_set_tracks_specificity() {
        let mut cond = Condition::new(16);
        cond.set(3, Trit::One);
        cond.set(5, Trit::Zero);
        check_specificity(&cond);
        assert_eq!(cond.specificity(), 2);

        // Re-specifying an already specified bit does not double count
        cond.set(3, Trit::Zero);
        assert_eq!(cond.specificity(), 2);

        cond.set(3, Trit::DontCare);
        cond.set(3, Trit::DontCare);
        assert_eq!(cond.specificity(), 1);
        check_specificity(&cond);
    }

    #[test]
    fn test_exact_condition_roundtrip() {
        let signals = SignalBits::from_bools(&[
            true, false, false, true, true, false, true, false, true, true,
        ]);
        let cond = Condition::from_signals(&signals);
        assert_eq!(cond.specificity(), signals.len());
        assert!(cond.matches(&signals));

        // Flipping any single bit breaks the match
        for i in 0..signals.len() {
            let mut flipped = signals.clone();
            flipped.toggle(i);
            assert!(!cond.matches(&flipped), "bit {i} flip should not match");
        }
    }

    #[test]
    fn test_wildcards_ignore_signal() {
        let mut cond = Condition::new(4);
        cond.set(0, Trit::One);
        cond.set(2, Trit::Zero);

        assert!(cond.matches(&SignalBits::from_bools(&[true, false, false, false])));
        assert!(cond.matches(&SignalBits::from_bools(&[true, true, false, true])));
        assert!(!cond.matches(&SignalBits::from_bools(&[false, true, false, true])));
        assert!(!cond.matches(&SignalBits::from_bools(&[true, true, true, true])));
    }

    #[test]
    fn test_match_in_second_word() {
        let mut cond = Condition::new(100);
        cond.set(90, Trit::One);

        let mut signals = SignalBits::new(100);
        assert!(!cond.matches(&signals));
        signals.set(90, true);
        assert!(cond.matches(&signals));
    }

    #[test]
    fn test_distance() {
        let a = Condition::from_trits(&[Trit::One, Trit::Zero, Trit::DontCare, Trit::One]);
        let b = Condition::from_trits(&[Trit::One, Trit::One, Trit::Zero, Trit::One]);
        assert_eq!(a.distance(&b), 2);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_uniform_crossover_keeps_agreement() {
        let a = Condition::from_trits(&[Trit::One, Trit::Zero, Trit::DontCare, Trit::One]);
        let b = Condition::from_trits(&[Trit::One, Trit::One, Trit::Zero, Trit::One]);

        // Take bit 1 from a, everything else from b
        let child = Condition::uniform_crossover(&a, &b, &[0b0010]);
        assert_eq!(child.get(0), Trit::One);
        assert_eq!(child.get(1), Trit::Zero);
        assert_eq!(child.get(2), Trit::Zero);
        assert_eq!(child.get(3), Trit::One);
        check_specificity(&child);

        // Agreeing bits survive any mask
        let child = Condition::uniform_crossover(&a, &b, &[u64::MAX]);
        assert_eq!(child.get(0), Trit::One);
        assert_eq!(child.get(3), Trit::One);
        assert_eq!(child.len(), 4);
        check_specificity(&child);
    }

    #[test]
    fn test_display() {
        let cond = Condition::from_trits(&[Trit::One, Trit::Zero, Trit::DontCare]);
        assert_eq!(cond.to_string(), "10#");
    }

    #[test]
    fn test_deserialize_rebuilds_masks() {
        let json = r#"["One", "DontCare", "Zero"]"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        check_specificity(&cond);
        assert_eq!(cond.specificity(), 2);
        assert_eq!(cond.care_words(), &[0b101]);
        assert_eq!(cond.value_words(), &[0b001]);

        let back = serde_json::to_string(&cond).unwrap();
        assert_eq!(back, r#"["One","DontCare","Zero"]"#);
    }
}
