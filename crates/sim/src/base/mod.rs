//! Foundational value types: the run random source and bit sequences.

mod bits;
mod random;

pub use bits::{BitVector, ParseBitsError};
pub use random::Random;
