//! Record where each organism was placed.

use super::{Module, SetupContext};
use crate::data::{DataLayout, TraitHandle};
use crate::errors::{MabeError, SetupError, StateError};
use crate::simulation::{ConfigScope, OrgPosition, Signal, SignalKind, World};
use std::any::Any;

/// Writes the position of every organism placed into `target_pop` into an
/// owned position trait.
#[derive(Debug)]
pub struct AnnotatePlacement {
    name: String,
    target_pop: usize,
    pos_trait: String,
    position: TraitHandle<OrgPosition>,
}

impl AnnotatePlacement {
    pub const TYPE_NAME: &'static str = "AnnotatePlacement";
    pub const DESCRIPTION: &'static str = "Store the position of each organism as a trait when it is placed";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_pop: 0,
            pos_trait: "org_pos".to_string(),
            position: TraitHandle::new("org_pos", 1),
        }
    }
}

impl Module for AnnotatePlacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn setup_config(&mut self, config: &mut ConfigScope) {
        config.link_pop(self, "target_pop", "Population to annotate", |m| &mut m.target_pop);
        config.link_var(self, "pos_trait", "Name of trait that will hold organism's position", |m| {
            &mut m.pos_trait
        });
    }

    fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        self.position = ctx.owned_trait(&self.pos_trait, "Organism's position in the population", OrgPosition::invalid())?;
        ctx.subscribe(SignalKind::OnPlacement);
        Ok(())
    }

    fn setup_data_map(&mut self, layout: &DataLayout) -> Result<(), StateError> {
        self.position.resolve(layout)
    }

    fn on_signal(&mut self, signal: &Signal, world: &mut World) -> Result<(), MabeError> {
        if let Signal::OnPlacement { pos } = *signal {
            if pos.pop_id != self.target_pop {
                return Ok(());
            }
            let org = world.org_mut(pos).ok_or(StateError::EmptySlot(pos))?;
            self.position.set(org, pos);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{EvalNk, SelectElite};
    use crate::orgs::BitsOrg;
    use crate::simulation::Mabe;

    #[test]
    fn test_births_are_annotated() {
        let mut mabe = Mabe::new(8);
        mabe.add_population("main_pop", 0).unwrap();
        mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
        mabe.add_module(EvalNk::new("eval_nk").with_nk(10, 1)).unwrap();
        mabe.add_module(SelectElite::new("elite").with_counts(1, 6)).unwrap();
        mabe.add_module(AnnotatePlacement::new("annotate")).unwrap();
        mabe.set_option("bits_org", "init_length", 10).unwrap();
        mabe.setup().unwrap();
        mabe.inject("main_pop", "bits_org", 6).unwrap();
        mabe.update(2).unwrap();

        for (index, org) in mabe.world().population(0).unwrap().iter_alive() {
            assert_eq!(*org.get_trait::<OrgPosition>("org_pos").unwrap(), OrgPosition::new(0, index));
        }
    }

    #[test]
    fn test_other_populations_untouched() {
        let mut mabe = Mabe::new(8);
        mabe.add_population("main_pop", 0).unwrap();
        mabe.add_population("side_pop", 0).unwrap();
        mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
        mabe.add_module(AnnotatePlacement::new("annotate")).unwrap();
        mabe.set_option("annotate", "target_pop", "side_pop").unwrap();
        mabe.setup().unwrap();
        let main = mabe.inject("main_pop", "bits_org", 1).unwrap();
        let side = mabe.inject("side_pop", "bits_org", 1).unwrap();

        let org = mabe.world().org(main[0]).unwrap();
        assert!(!org.get_trait::<OrgPosition>("org_pos").unwrap().is_valid());
        let org = mabe.world().org(side[0]).unwrap();
        assert_eq!(*org.get_trait::<OrgPosition>("org_pos").unwrap(), side[0]);
    }
}
