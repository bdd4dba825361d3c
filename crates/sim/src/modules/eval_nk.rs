//! NK-landscape evaluation of bit-sequence organisms.

use super::{eval_member, reset_member, Evaluator, Module, NkLandscape, SetupContext};
use crate::base::{BitVector, Random};
use crate::data::{DataLayout, TraitHandle};
use crate::errors::{EvalError, SetupError, StateError};
use crate::orgs::Organism;
use crate::simulation::{Collection, ConfigScope, OrgPosition, World};
use std::any::Any;
use tracing::debug;

/// Scores the `bits` trait of every organism on an NK landscape and writes
/// the result into an owned `fitness` trait.
#[derive(Debug)]
pub struct EvalNk {
    name: String,
    n: usize,
    k: usize,
    bits_trait: String,
    fitness_trait: String,
    parallel: bool,
    bits: TraitHandle<BitVector>,
    fitness: TraitHandle<f64>,
    landscape: Option<NkLandscape>,
}

impl EvalNk {
    pub const TYPE_NAME: &'static str = "EvalNK";
    pub const DESCRIPTION: &'static str = "Evaluate bitstrings on an NK fitness landscape";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n: 100,
            k: 2,
            bits_trait: "bits".to_string(),
            fitness_trait: "fitness".to_string(),
            parallel: true,
            bits: TraitHandle::new("bits", 1),
            fitness: TraitHandle::new("fitness", 1),
            landscape: None,
        }
    }

    /// Set `N` and `K` directly, as the `N` and `K` options would.
    pub fn with_nk(mut self, n: usize, k: usize) -> Self {
        self.n = n;
        self.k = k;
        self
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// The landscape, once setup has drawn it.
    pub fn landscape(&self) -> Option<&NkLandscape> {
        self.landscape.as_ref()
    }

    fn score(
        &self,
        landscape: &NkLandscape,
        pos: OrgPosition,
        org: &mut Organism,
    ) -> Result<f64, EvalError> {
        org.generate_output().map_err(|source| EvalError::State {
            module: self.name.clone(),
            position: pos,
            source,
        })?;
        let fitness = {
            let bits = self.bits.get(org);
            landscape.fitness(&bits).ok_or_else(|| EvalError::GenomeLength {
                module: self.name.clone(),
                position: pos,
                expected: self.n,
                found: bits.len(),
            })?
        };
        self.fitness.set(org, fitness);
        Ok(fitness)
    }
}

impl Module for EvalNk {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_var(self, "N", "Number of bits in the bitstring", |m| &mut m.n);
        config.link_var(self, "K", "Number of bits used in each gene", |m| &mut m.k);
        config.link_var(self, "bits_trait", "Which trait stores the bitstring to evaluate?", |m| {
            &mut m.bits_trait
        });
        config.link_var(self, "fitness_trait", "Which trait should we store NK fitness in?", |m| {
            &mut m.fitness_trait
        });
        config.link_var(self, "parallel", "Score organisms on worker threads", |m| &mut m.parallel);
        config.add_member_function::<Self>("EVAL", "Evaluate a collection; returns the best fitness", eval_member::<Self>);
        config.add_member_function::<Self>("RESET", "Draw a new landscape", reset_member::<Self>);
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        if self.n == 0 {
            return Err(ctx.invalid_option("N", "must be at least 1"));
        }
        if self.k >= self.n {
            return Err(ctx.invalid_option("K", format!("K ({}) must be less than N ({})", self.k, self.n)));
        }
        if self.k > NkLandscape::MAX_K {
            return Err(ctx.invalid_option("K", format!("K may be at most {}", NkLandscape::MAX_K)));
        }
        self.landscape = Some(NkLandscape::new(self.n, self.k, ctx.random()));
        self.bits = ctx.required_trait(&self.bits_trait, "Bitset used for NK evaluation")?;
        self.fitness = ctx.owned_trait(&self.fitness_trait, "NK fitness value", 0.0)?;
        Ok(())
    }

    fn setup_data_map(&mut self, layout: &DataLayout) -> Result<(), StateError> {
        self.bits.resolve(layout)?;
        self.fitness.resolve(layout)
    }

    fn as_evaluator(&mut self) -> Option<&mut dyn Evaluator> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Evaluator for EvalNk {
    fn evaluate(&mut self, orgs: &Collection, world: &mut World) -> f64 {
        let Some(landscape) = self.landscape.as_ref() else {
            return 0.0;
        };
        let alive = orgs.get_alive();
        let this = &*self;
        let score = |pos: OrgPosition, org: &mut Organism| this.score(landscape, pos, org);
        let results = if self.parallel {
            world.par_map_mut(&alive, &score)
        } else {
            world.map_mut(&alive, &score)
        };

        let evaluated = results.len();
        let mut best: Option<f64> = None;
        for (_, result) in results {
            match result {
                Ok(fitness) => {
                    if best.is_none_or(|b| fitness > b) {
                        best = Some(fitness);
                    }
                }
                Err(err) => world.report_eval_error(err),
            }
        }
        let best = best.unwrap_or(0.0);
        debug!(module = %self.name, evaluated, best, "NK evaluation");
        best
    }

    fn reset(&mut self, random: &mut Random) {
        self.landscape = Some(NkLandscape::new(self.n, self.k, random));
    }
}
