//! Truncation selection: the best organisms reproduce.

use super::{Module, ReproductionRequest, Selector, SetupContext};
use crate::data::{DataLayout, TraitHandle};
use crate::errors::{SetupError, StateError};
use crate::simulation::{ConfigScope, World};
use std::any::Any;
use tracing::trace;

/// Picks the `top_k` fittest organisms of `select_pop` and requests
/// `copies_per_winner` offspring of each into `birth_pop`.
#[derive(Debug)]
pub struct SelectElite {
    name: String,
    select_pop: usize,
    birth_pop: usize,
    fitness_trait: String,
    top_k: usize,
    copies_per_winner: usize,
    fitness: TraitHandle<f64>,
}

impl SelectElite {
    pub const TYPE_NAME: &'static str = "SelectElite";
    pub const DESCRIPTION: &'static str = "Choose the top fitness organisms for replication";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            select_pop: 0,
            birth_pop: 0,
            fitness_trait: "fitness".to_string(),
            top_k: 1,
            copies_per_winner: 1,
            fitness: TraitHandle::new("fitness", 1),
        }
    }

    pub fn with_counts(mut self, top_k: usize, copies_per_winner: usize) -> Self {
        self.top_k = top_k;
        self.copies_per_winner = copies_per_winner;
        self
    }
}

impl Module for SelectElite {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_pop(self, "select_pop", "Which population should we select parents from?", |m| {
            &mut m.select_pop
        });
        config.link_pop(self, "birth_pop", "Which population should births go into?", |m| {
            &mut m.birth_pop
        });
        config.link_var(self, "fitness_trait", "Which trait provides the fitness value to use?", |m| {
            &mut m.fitness_trait
        });
        config.link_var(self, "top_k", "Number of top-fitness orgs to be replicated", |m| &mut m.top_k);
        config.link_var(self, "copies_per_winner", "Number of copies to make of each replicated org", |m| {
            &mut m.copies_per_winner
        });
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        let populations = ctx.world().num_populations();
        for (option, id) in [("select_pop", self.select_pop), ("birth_pop", self.birth_pop)] {
            if id >= populations {
                return Err(ctx.invalid_option(option, format!("no population with id {id}")));
            }
        }
        self.fitness = ctx.required_trait(&self.fitness_trait, "Value to select on")?;
        Ok(())
    }

    fn setup_data_map(&mut self, layout: &DataLayout) -> Result<(), StateError> {
        self.fitness.resolve(layout)
    }

    fn as_selector(&mut self) -> Option<&mut dyn Selector> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Selector for SelectElite {
    fn select_parents(
        &mut self,
        world: &mut World,
        requests: &mut Vec<ReproductionRequest>,
    ) -> Result<usize, StateError> {
        let pop = world.population(self.select_pop)?;
        let mut ranked: Vec<(usize, f64)> = pop
            .iter_alive()
            .map(|(index, org)| self.fitness.try_get(org.data_map()).map(|f| (index, *f)))
            .collect::<Result<_, _>>()?;
        // Stable sort keeps ascending slot order among equal fitness.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let before = requests.len();
        for &(index, fitness) in ranked.iter().take(self.top_k) {
            trace!(module = %self.name, index, fitness, "elite winner");
            let parent = pop.position(index);
            let request = ReproductionRequest {
                parent,
                target_pop: self.birth_pop,
            };
            requests.extend(std::iter::repeat_n(request, self.copies_per_winner));
        }
        Ok(requests.len() - before)
    }
}
