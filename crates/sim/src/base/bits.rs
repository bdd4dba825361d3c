//! Packed bit sequences used as genomes and trait values.

use super::Random;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-length sequence of bits packed into 64-bit words.
///
/// Bits past `len` in the last word are always zero, so equality, hashing and
/// counting can work on whole words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// All-zero sequence of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut out = Self::new(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            out.set(i, bit);
        }
        out
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get bit `index`.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of range ({})", self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit index {index} out of range ({})", self.len);
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    #[inline]
    pub fn toggle(&mut self, index: usize) {
        assert!(index < self.len, "bit index {index} out of range ({})", self.len);
        self.words[index / WORD_BITS] ^= 1u64 << (index % WORD_BITS);
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn count_zeros(&self) -> usize {
        self.len - self.count_ones()
    }

    /// Number of positions at which `self` and `other` differ.
    ///
    /// Sequences of different length also differ in every unmatched position.
    pub fn hamming(&self, other: &BitVector) -> usize {
        if self.len == other.len {
            return self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| (a ^ b).count_ones() as usize)
                .sum();
        }
        let shared = self.len.min(other.len);
        let diff = (0..shared).filter(|&i| self.get(i) != other.get(i)).count();
        diff + self.len.abs_diff(other.len)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Set every bit from an independent fair coin.
    pub fn randomize(&mut self, rng: &mut Random) {
        for i in 0..self.len {
            self.set(i, rng.p(0.5));
        }
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Error returned when parsing a bit string containing characters other than `0` and `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBitsError(pub char);

impl fmt::Display for ParseBitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bit character: '{}'", self.0)
    }
}

impl std::error::Error for ParseBitsError {}

impl FromStr for BitVector {
    type Err = ParseBitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(ParseBitsError(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bools(&bits))
    }
}

impl From<BitVector> for String {
    fn from(bits: BitVector) -> Self {
        bits.to_string()
    }
}

impl TryFrom<String> for BitVector {
    type Error = ParseBitsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
