//! Modules: the pluggable units that evaluate, select and place organisms.
//!
//! Every module implements [`Module`]. The control object drives each one
//! through the setup phases (`setup_config`, `setup_module`,
//! `setup_data_map`) and then, every generation, through the capability it
//! exposes: [`Evaluator`], [`Selector`] or [`Placement`]. Modules may also
//! subscribe to lifecycle [`Signal`]s.

mod annotate_placement;
mod eval_count_bits;
mod eval_nk;
mod nk_landscape;
mod placement;
mod select_elite;

pub use annotate_placement::AnnotatePlacement;
pub use eval_count_bits::EvalCountBits;
pub use eval_nk::EvalNk;
pub use nk_landscape::NkLandscape;
pub use placement::{place_mixed, MaxSizePlacement, RandomReplacement};
pub use select_elite::SelectElite;

use crate::base::Random;
use crate::data::{
    Access, DataLayout, DataMap, TraitData, TraitDecl, TraitHandle, TraitManager, TraitValue,
};
use crate::errors::{MabeError, SetupError, StateError};
use crate::simulation::{Collection, ConfigScope, OrgPosition, Signal, SignalKind, SignalTable, World};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Base behaviour shared by every module.
pub trait Module: Any + Send {
    /// Instance name, unique within a run.
    fn name(&self) -> &str;

    /// Registered type name, e.g. `"EvalNK"`.
    fn type_name(&self) -> &'static str;

    /// Link configurable fields and member functions.
    fn setup_config(&mut self, _config: &mut ConfigScope) {}

    /// Validate configuration, declare traits and subscribe to signals.
    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError>;

    /// Resolve trait handles against the locked layout.
    fn setup_data_map(&mut self, _layout: &DataLayout) -> Result<(), StateError> {
        Ok(())
    }

    fn on_signal(&mut self, _signal: &Signal, _world: &mut World) -> Result<(), MabeError> {
        Ok(())
    }

    fn as_evaluator(&mut self) -> Option<&mut dyn Evaluator> {
        None
    }

    fn as_selector(&mut self) -> Option<&mut dyn Selector> {
        None
    }

    fn as_placement(&mut self) -> Option<&mut dyn Placement> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Scores organisms.
pub trait Evaluator {
    /// Score every live organism in `orgs` and return the best score, or 0
    /// for an empty collection. Per-organism failures are reported through
    /// [`World::report_eval_error`] and do not stop the evaluation.
    fn evaluate(&mut self, orgs: &Collection, world: &mut World) -> f64;

    /// Re-draw any internal random state.
    fn reset(&mut self, _random: &mut Random) {}
}

/// `EVAL` member function: score the collection named by the first argument
/// (all live organisms when omitted) and return the best score.
pub(crate) fn eval_member<M: Evaluator>(module: &mut M, world: &mut World, args: &[Value]) -> Result<Value, MabeError> {
    let orgs = match args.first() {
        None | Some(Value::Null) => world.alive_collection(),
        Some(Value::String(spec)) => world.to_collection(spec)?,
        Some(other) => {
            return Err(SetupError::InvalidCollection {
                spec: other.to_string(),
                reason: "expected a collection string".to_string(),
            }
            .into())
        }
    };
    Ok(Value::from(module.evaluate(&orgs, world)))
}

/// `RESET` member function: re-draw the evaluator's random state.
pub(crate) fn reset_member<M: Evaluator>(module: &mut M, world: &mut World, _args: &[Value]) -> Result<Value, MabeError> {
    module.reset(world.random_mut());
    Ok(Value::Null)
}

/// A request to produce one offspring of `parent` into `target_pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReproductionRequest {
    pub parent: OrgPosition,
    pub target_pop: usize,
}

/// Chooses parents.
pub trait Selector {
    /// Append reproduction requests; returns how many were added.
    fn select_parents(
        &mut self,
        world: &mut World,
        requests: &mut Vec<ReproductionRequest>,
    ) -> Result<usize, StateError>;
}

/// Chooses where an offspring lives.
pub trait Placement {
    /// Position for an offspring of `parent` headed to `target_pop`, or
    /// `None` to defer to the next placement module.
    fn place(&mut self, parent: OrgPosition, target_pop: usize, world: &mut World) -> Option<OrgPosition>;
}

/// What a module (or organism manager) can touch while it sets itself up.
pub struct SetupContext<'a> {
    module_name: &'a str,
    module_index: Option<usize>,
    traits: &'a mut TraitManager,
    signals: &'a mut SignalTable,
    world: &'a mut World,
}

impl<'a> SetupContext<'a> {
    pub fn new(
        module_name: &'a str,
        module_index: Option<usize>,
        traits: &'a mut TraitManager,
        signals: &'a mut SignalTable,
        world: &'a mut World,
    ) -> Self {
        Self {
            module_name,
            module_index,
            traits,
            signals,
            world,
        }
    }

    pub fn module_name(&self) -> &str {
        self.module_name
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn random(&mut self) -> &mut Random {
        self.world.random_mut()
    }

    /// Error for a bad option value of this module.
    pub fn invalid_option(&self, option: &str, reason: impl Into<String>) -> SetupError {
        SetupError::InvalidOption {
            module: self.module_name.to_string(),
            option: option.to_string(),
            reason: reason.into(),
        }
    }

    pub fn subscribe(&mut self, kind: SignalKind) {
        match self.module_index {
            Some(index) => self.signals.subscribe(kind, index),
            None => debug!(module = self.module_name, %kind, "organism managers do not receive signals"),
        }
    }

    fn declare<T: TraitData>(&mut self, name: &str, decl: TraitDecl, arity: usize) -> Result<TraitHandle<T>, SetupError> {
        self.traits.add_trait(name, decl.with_arity(arity))?;
        Ok(TraitHandle::new(name, arity))
    }

    /// Declare a trait this module reads but does not write.
    pub fn required_trait<T: TraitData>(&mut self, name: &str, desc: &str) -> Result<TraitHandle<T>, SetupError> {
        self.required_multi_trait(name, desc, 1)
    }

    pub fn required_multi_trait<T: TraitData>(
        &mut self,
        name: &str,
        desc: &str,
        arity: usize,
    ) -> Result<TraitHandle<T>, SetupError> {
        let decl = TraitDecl::new(self.module_name, Access::Required, TraitValue::default_for(T::TYPE))
            .with_desc(desc);
        self.declare(name, decl, arity)
    }

    /// Declare a trait this module alone writes.
    pub fn owned_trait<T: TraitData>(&mut self, name: &str, desc: &str, default: T) -> Result<TraitHandle<T>, SetupError> {
        self.owned_multi_trait(name, desc, 1, default)
    }

    pub fn owned_multi_trait<T: TraitData>(
        &mut self,
        name: &str,
        desc: &str,
        arity: usize,
        default: T,
    ) -> Result<TraitHandle<T>, SetupError> {
        let decl = TraitDecl::new(self.module_name, Access::Owned, default.into_value()).with_desc(desc);
        self.declare(name, decl, arity)
    }

    /// Declare a trait written cooperatively with other modules.
    pub fn shared_trait<T: TraitData>(&mut self, name: &str, desc: &str, default: T) -> Result<TraitHandle<T>, SetupError> {
        let decl = TraitDecl::new(self.module_name, Access::Shared, default.into_value()).with_desc(desc);
        self.declare(name, decl, 1)
    }

    /// Declare a read-only trait computed from the rest of the record on each read.
    pub fn generated_trait<T, F>(&mut self, name: &str, desc: &str, producer: F) -> Result<TraitHandle<T>, SetupError>
    where
        T: TraitData,
        F: Fn(&DataMap) -> T + Send + Sync + 'static,
    {
        let decl = TraitDecl::new(self.module_name, Access::Generated, TraitValue::default_for(T::TYPE))
            .with_desc(desc)
            .with_producer(Arc::new(move |map: &DataMap| producer(map).into_value()));
        self.declare(name, decl, 1)
    }
}
