//! Commonly used imports for convenience.
//!
//! ```
//! use mabe_sim::prelude::*;
//!
//! let mut mabe = Mabe::new(1);
//! mabe.add_population("main_pop", 0).unwrap();
//! mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
//! mabe.add_module(EvalNk::new("eval_nk")).unwrap();
//! mabe.add_module(SelectElite::new("elite")).unwrap();
//! mabe.setup().unwrap();
//! mabe.inject("main_pop", "bits_org", 10).unwrap();
//! mabe.update(2).unwrap();
//! ```

pub use crate::base::{BitVector, Random};
pub use crate::data::{Access, DataMap, TraitHandle, TraitType, TraitValue};
pub use crate::errors::{self, ErrorKind, EvalError, MabeError, ResourceError, SetupError, StateError};
pub use crate::modules::{
    AnnotatePlacement, EvalCountBits, EvalNk, Evaluator, MaxSizePlacement, Module, NkLandscape, Placement,
    RandomReplacement, SelectElite, Selector, SetupContext,
};
pub use crate::orgs::{BitsOrg, BitsOrgData, Encoding, ManagerHandle, Organism};
pub use crate::simulation::{
    CancelToken, Collection, ConfigScope, Mabe, OrgPosition, Population, PopulationSnapshot, Registry, RunConfig,
    Signal, SignalKind, UpdateSummary, World,
};
