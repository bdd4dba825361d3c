//! Birth placement policies.

use super::{Module, Placement, SetupContext};
use crate::errors::SetupError;
use crate::simulation::{ConfigScope, OrgPosition, World};
use std::any::Any;

/// The default policy: a uniform random slot of `target_pop`, alive or dead.
/// An empty population grows by one slot.
pub fn place_mixed(target_pop: usize, world: &mut World) -> Option<OrgPosition> {
    let size = world.population(target_pop).ok()?.size();
    let index = if size == 0 {
        world.population_mut(target_pop).ok()?.push_empty()
    } else {
        world.random_mut().get_uint(size)
    };
    Some(OrgPosition::new(target_pop, index))
}

/// Uniform slot of `target_pop` other than the parent's.
fn random_non_parent(parent: OrgPosition, target_pop: usize, world: &mut World) -> Option<OrgPosition> {
    let size = world.population(target_pop).ok()?.size();
    if size == 0 {
        return None;
    }
    let same_pop = parent.pop_id == target_pop && parent.index < size;
    if !same_pop {
        return Some(OrgPosition::new(target_pop, world.random_mut().get_uint(size)));
    }
    if size == 1 {
        return Some(parent);
    }
    // Draw from the other size - 1 slots.
    let mut index = world.random_mut().get_uint(size - 1);
    if index >= parent.index {
        index += 1;
    }
    Some(OrgPosition::new(target_pop, index))
}

fn check_pop(ctx: &SetupContext<'_>, target_pop: usize) -> Result<(), SetupError> {
    if target_pop >= ctx.world().num_populations() {
        return Err(ctx.invalid_option("target_pop", format!("no population with id {target_pop}")));
    }
    Ok(())
}

/// Births replace a random organism that is not the parent.
#[derive(Debug)]
pub struct RandomReplacement {
    name: String,
    target_pop: usize,
}

impl RandomReplacement {
    pub const TYPE_NAME: &'static str = "RandomReplacement";
    pub const DESCRIPTION: &'static str = "Place births over a random organism other than the parent";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_pop: 0,
        }
    }
}

impl Module for RandomReplacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_pop(self, "target_pop", "Population to manage", |m| &mut m.target_pop);
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        check_pop(ctx, self.target_pop)
    }

    fn as_placement(&mut self) -> Option<&mut dyn Placement> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Placement for RandomReplacement {
    fn place(&mut self, parent: OrgPosition, target_pop: usize, world: &mut World) -> Option<OrgPosition> {
        if target_pop != self.target_pop {
            return None;
        }
        random_non_parent(parent, target_pop, world)
    }
}

/// Births fill new slots until the population reaches `max_pop_size`, then
/// replace random organisms other than the parent.
#[derive(Debug)]
pub struct MaxSizePlacement {
    name: String,
    target_pop: usize,
    max_pop_size: usize,
}

impl MaxSizePlacement {
    pub const TYPE_NAME: &'static str = "MaxSizePlacement";
    pub const DESCRIPTION: &'static str = "Grow a population up to a maximum size, then replace at random";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_pop: 0,
            max_pop_size: 1000,
        }
    }

    pub fn with_max_size(mut self, max_pop_size: usize) -> Self {
        self.max_pop_size = max_pop_size;
        self
    }
}

impl Module for MaxSizePlacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_pop(self, "target_pop", "Population to manage", |m| &mut m.target_pop);
        config.link_var(self, "max_pop_size", "Largest size the population may grow to", |m| {
            &mut m.max_pop_size
        });
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        if self.max_pop_size == 0 {
            return Err(ctx.invalid_option("max_pop_size", "must be at least 1"));
        }
        check_pop(ctx, self.target_pop)
    }

    fn as_placement(&mut self) -> Option<&mut dyn Placement> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Placement for MaxSizePlacement {
    fn place(&mut self, parent: OrgPosition, target_pop: usize, world: &mut World) -> Option<OrgPosition> {
        if target_pop != self.target_pop {
            return None;
        }
        let pop = world.population_mut(target_pop).ok()?;
        if pop.size() < self.max_pop_size {
            return Some(OrgPosition::new(target_pop, pop.push_empty()));
        }
        random_non_parent(parent, target_pop, world)
    }
}
