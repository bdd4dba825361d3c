//! The mutable state modules operate on during a run.

use super::collection::resolve_population;
use super::{Collection, OrgPosition, Population};
use crate::base::Random;
use crate::data::DataLayout;
use crate::errors::{EvalError, SetupError, StateError};
use crate::orgs::{ManagerHandle, Organism};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::warn;

/// Populations, organism managers, the random source and run counters.
///
/// Modules receive `&mut World` in their callbacks; the modules themselves
/// are held separately by the control object.
#[derive(Debug)]
pub struct World {
    populations: Vec<Population>,
    managers: IndexMap<String, ManagerHandle>,
    random: Random,
    layout: Option<Arc<DataLayout>>,
    generation: usize,
    eval_errors: usize,
}

impl World {
    pub fn new(random: Random) -> Self {
        Self {
            populations: Vec::new(),
            managers: IndexMap::new(),
            random,
            layout: None,
            generation: 0,
            eval_errors: 0,
        }
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn populations_mut(&mut self) -> &mut [Population] {
        &mut self.populations
    }

    pub fn num_populations(&self) -> usize {
        self.populations.len()
    }

    pub fn population(&self, id: usize) -> Result<&Population, StateError> {
        self.populations.get(id).ok_or(StateError::UnknownPopulation(id))
    }

    pub fn population_mut(&mut self, id: usize) -> Result<&mut Population, StateError> {
        self.populations
            .get_mut(id)
            .ok_or(StateError::UnknownPopulation(id))
    }

    /// Id of the population called `name` (or with numeric id `name`).
    pub fn population_id(&self, name: &str) -> Option<usize> {
        resolve_population(name, &self.populations)
    }

    pub(crate) fn add_population(&mut self, name: &str, size: usize) -> usize {
        let id = self.populations.len();
        let mut pop = Population::new(id, name, size);
        if let Some(layout) = &self.layout {
            pop.install_layout(layout);
        }
        self.populations.push(pop);
        id
    }

    pub fn managers(&self) -> impl Iterator<Item = &ManagerHandle> {
        self.managers.values()
    }

    pub fn manager(&self, name: &str) -> Option<&ManagerHandle> {
        self.managers.get(name)
    }

    pub(crate) fn add_manager(&mut self, handle: ManagerHandle) {
        self.managers.insert(handle.name().to_string(), handle);
    }

    pub fn random(&self) -> &Random {
        &self.random
    }

    pub fn random_mut(&mut self) -> &mut Random {
        &mut self.random
    }

    pub fn layout(&self) -> Option<&Arc<DataLayout>> {
        self.layout.as_ref()
    }

    pub(crate) fn install_layout(&mut self, layout: &Arc<DataLayout>) {
        for pop in &mut self.populations {
            pop.install_layout(layout);
        }
        for manager in self.managers.values() {
            manager.get().set_layout(layout);
        }
        self.layout = Some(Arc::clone(layout));
    }

    /// Generations completed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub(crate) fn advance_generation(&mut self) {
        self.generation += 1;
    }

    pub fn org(&self, pos: OrgPosition) -> Option<&Organism> {
        self.populations.get(pos.pop_id)?.at(pos.index)
    }

    pub fn org_mut(&mut self, pos: OrgPosition) -> Option<&mut Organism> {
        self.populations.get_mut(pos.pop_id)?.at_mut(pos.index)
    }

    /// Offspring of the organism at `parent`, made by its own manager with the
    /// run random source. The parent is untouched.
    pub fn make_offspring(&mut self, parent: OrgPosition) -> Result<(Organism, usize), StateError> {
        let org = self
            .populations
            .get(parent.pop_id)
            .and_then(|pop| pop.at(parent.index))
            .ok_or(StateError::EmptySlot(parent))?;
        Ok(org.manager().make_offspring(org, &mut self.random))
    }

    pub fn total_alive(&self) -> usize {
        self.populations.iter().map(Population::num_alive).sum()
    }

    /// Live organisms of every population.
    pub fn alive_collection(&self) -> Collection {
        let mut collection = Collection::new();
        for pop in &self.populations {
            collection.insert_population(pop.id());
        }
        collection.get_alive()
    }

    pub fn to_collection(&self, spec: &str) -> Result<Collection, SetupError> {
        Collection::parse(spec, &self.populations)
    }

    /// Log a per-organism evaluation failure and count it. The run goes on.
    pub fn report_eval_error(&mut self, err: EvalError) {
        warn!(module = err.module(), position = %err.position(), "{err}");
        self.eval_errors += 1;
    }

    pub fn eval_error_count(&self) -> usize {
        self.eval_errors
    }

    /// Apply `f` to every live organism in `orgs`, in collection order.
    pub fn map_mut<R>(
        &mut self,
        orgs: &Collection,
        mut f: impl FnMut(OrgPosition, &mut Organism) -> R,
    ) -> Vec<(OrgPosition, R)> {
        let mut out = Vec::new();
        for pos in orgs.positions(&self.populations) {
            if let Some(org) = self.org_mut(pos) {
                out.push((pos, f(pos, org)));
            }
        }
        out
    }

    /// Parallel form of [`World::map_mut`]. `f` must only touch the organism
    /// it is given; results come back in collection order.
    pub fn par_map_mut<R, F>(&mut self, orgs: &Collection, f: F) -> Vec<(OrgPosition, R)>
    where
        R: Send,
        F: Fn(OrgPosition, &mut Organism) -> R + Sync + Send,
    {
        let mut out = Vec::new();
        for pop in &mut self.populations {
            let pop_id = pop.id();
            if !orgs.has_population(pop_id) {
                continue;
            }
            let mut results: Vec<(OrgPosition, R)> = pop
                .slots_mut()
                .par_iter_mut()
                .enumerate()
                .filter_map(|(index, slot)| {
                    if !orgs.selects(pop_id, index) {
                        return None;
                    }
                    let org = slot.as_deref_mut()?;
                    let pos = OrgPosition::new(pop_id, index);
                    Some((pos, f(pos, org)))
                })
                .collect();
            out.append(&mut results);
        }
        out
    }

    /// Empty every population.
    pub(crate) fn clear_populations(&mut self) {
        for pop in &mut self.populations {
            pop.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orgs::BitsOrgManager;

    fn world() -> World {
        let mut world = World::new(Random::new(1));
        let handle = ManagerHandle::new(BitsOrgManager::new("bits_org"));
        world.add_manager(handle.clone());
        let id = world.add_population("main_pop", 6);
        for i in [0, 2, 3, 5] {
            world.population_mut(id).unwrap().set_at(i, handle.make());
        }
        world
    }

    #[test]
    fn test_lookup() {
        let world = world();
        assert_eq!(world.population_id("main_pop"), Some(0));
        assert_eq!(world.population_id("other"), None);
        assert!(world.org(OrgPosition::new(0, 2)).is_some());
        assert!(world.org(OrgPosition::new(0, 1)).is_none());
        assert!(world.org(OrgPosition::new(4, 0)).is_none());
        assert!(world.manager("bits_org").is_some());
        assert_eq!(world.total_alive(), 4);
    }

    #[test]
    fn test_parallel_map_matches_sequential_order() {
        let mut world = world();
        let alive = world.alive_collection();
        let seq: Vec<_> = world.map_mut(&alive, |pos, _| pos.index).into_iter().map(|(_, r)| r).collect();
        let par: Vec<_> = world.par_map_mut(&alive, |pos, _| pos.index).into_iter().map(|(_, r)| r).collect();
        assert_eq!(seq, [0, 2, 3, 5]);
        assert_eq!(par, seq);
    }

    #[test]
    fn test_report_eval_error_counts() {
        let mut world = world();
        world.report_eval_error(EvalError::GenomeLength {
            module: "eval".into(),
            position: OrgPosition::new(0, 0),
            expected: 10,
            found: 3,
        });
        assert_eq!(world.eval_error_count(), 1);
    }
}
