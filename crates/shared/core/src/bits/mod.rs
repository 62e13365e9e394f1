//! Trit Encoding
//!
//! Conditions and signal vectors packed into 64-bit words so that matching
//! a rule against the market costs one XOR/AND per word.

mod condition;
mod signals;
mod trit;

pub use condition::Condition;
pub use signals::SignalBits;
pub use trit::Trit;

/// Bits per packed word
pub const WORD_BITS: usize = 64;

/// Words needed to hold `bits` bits
#[inline]
pub fn word_count(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}
