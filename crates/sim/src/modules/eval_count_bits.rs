//! Score organisms by counting bits.

use super::{eval_member, Evaluator, Module, SetupContext};
use crate::base::BitVector;
use crate::data::{DataLayout, TraitHandle};
use crate::errors::{EvalError, SetupError, StateError};
use crate::simulation::{Collection, ConfigScope, World};
use std::any::Any;

/// Counts the ones (or zeros) in a bit-sequence trait.
#[derive(Debug)]
pub struct EvalCountBits {
    name: String,
    count_type: usize,
    bits_trait: String,
    score_trait: String,
    bits: TraitHandle<BitVector>,
    score: TraitHandle<f64>,
}

impl EvalCountBits {
    pub const TYPE_NAME: &'static str = "EvalCountBits";
    pub const DESCRIPTION: &'static str = "Score bitstrings by the number of ones (or zeros) they contain";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count_type: 1,
            bits_trait: "bits".to_string(),
            score_trait: "score".to_string(),
            bits: TraitHandle::new("bits", 1),
            score: TraitHandle::new("score", 1),
        }
    }
}

impl Module for EvalCountBits {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_var(self, "count_type", "Count ones (1) or zeros (0)", |m| &mut m.count_type);
        config.link_var(self, "bits_trait", "Which trait stores the bitstring?", |m| &mut m.bits_trait);
        config.link_var(self, "score_trait", "Which trait should we store the count in?", |m| {
            &mut m.score_trait
        });
        config.add_member_function::<Self>("EVAL", "Evaluate a collection; returns the best count", eval_member::<Self>);
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        if self.count_type > 1 {
            return Err(ctx.invalid_option("count_type", "must be 0 or 1"));
        }
        self.bits = ctx.required_trait(&self.bits_trait, "Bitset to count")?;
        self.score = ctx.owned_trait(&self.score_trait, "Number of matching bits", 0.0)?;
        Ok(())
    }

    fn setup_data_map(&mut self, layout: &DataLayout) -> Result<(), StateError> {
        self.bits.resolve(layout)?;
        self.score.resolve(layout)
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

impl Evaluator for EvalCountBits {
    fn evaluate(&mut self, orgs: &Collection, world: &mut World) -> f64 {
        let alive = orgs.get_alive();
        let results = world.map_mut(&alive, |pos, org| {
            org.generate_output().map_err(|source| EvalError::State {
                module: self.name.clone(),
                position: pos,
                source,
            })?;
            let count = {
                let bits = self.bits.get(org);
                if self.count_type == 1 {
                    bits.count_ones()
                } else {
                    bits.count_zeros()
                }
            };
            self.score.set(org, count as f64);
            Ok::<_, EvalError>(count as f64)
        });

        let mut best = 0.0f64;
        for (_, result) in results {
            match result {
                Ok(score) => best = best.max(score),
                Err(err) => world.report_eval_error(err),
            }
        }
        best
    }
}
