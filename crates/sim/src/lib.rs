//! # MABE simulation core
//!
//! The `mabe-sim` crate is the runtime of a modular agent-based evolution
//! system. Organisms carry a genome and a typed trait record ([`data::DataMap`]);
//! pluggable [`modules`] evaluate, select and place them; the
//! [`simulation::Mabe`] controller verifies every module's trait
//! declarations, locks the shared layout and drives generations.

pub mod base;
pub mod data;
pub mod errors;
pub mod modules;
pub mod orgs;
pub mod prelude;
pub mod simulation;

pub use errors::{MabeError, Result};
pub use simulation::Mabe;
