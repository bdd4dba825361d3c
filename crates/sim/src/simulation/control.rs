//! The run controller: owns the world and every module, runs setup and
//! drives generations.

use super::{Collection, ConfigScope, OrgPosition, Registry, Signal, SignalTable, World};
use crate::base::Random;
use crate::data::TraitManager;
use crate::errors::{MabeError, SetupError, StateError};
use crate::modules::{place_mixed, Module, ReproductionRequest, SetupContext};
use crate::orgs::{Encoding, ManagerHandle, TypedManager};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Cooperative cancellation flag, checked between generations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// What happened during one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub generation: usize,
    /// Best score returned by each evaluator, in registration order.
    pub best_scores: Vec<(String, f64)>,
    pub births: usize,
    pub eval_errors: usize,
}

/// Result of [`Mabe::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub reports: Vec<GenerationReport>,
    /// Set when the run stopped early on a cancel request.
    pub cancelled: bool,
}

impl UpdateSummary {
    /// Number of generations completed.
    pub fn generations(&self) -> usize {
        self.reports.len()
    }

    pub fn births(&self) -> usize {
        self.reports.iter().map(|r| r.births).sum()
    }

    /// Best score of evaluator `module` in each generation.
    pub fn best_scores(&self, module: &str) -> Vec<f64> {
        self.reports
            .iter()
            .filter_map(|r| r.best_scores.iter().find(|(name, _)| name == module).map(|(_, s)| *s))
            .collect()
    }

    pub fn last(&self) -> Option<&GenerationReport> {
        self.reports.last()
    }
}

struct ModuleEntry {
    name: String,
    module: Box<dyn Module>,
}

/// The simulation controller.
///
/// Entities (organism managers and modules) are added first, options are
/// overridden with [`set_option`](Self::set_option), then [`setup`](Self::setup)
/// configures everything and locks the trait layout. Only after a
/// successful setup can organisms be injected and generations run.
pub struct Mabe {
    world: World,
    modules: Vec<ModuleEntry>,
    traits: TraitManager,
    signals: SignalTable,
    scopes: IndexMap<String, ConfigScope>,
    overrides: IndexMap<String, IndexMap<String, Value>>,
    registry: Registry,
    cancel: CancelToken,
    ready: bool,
}

impl Mabe {
    pub fn new(seed: u64) -> Self {
        Self::with_random(Random::new(seed))
    }

    /// A controller seeded from system entropy. The seed is logged.
    pub fn from_entropy() -> Self {
        let random = Random::from_entropy();
        info!(seed = random.seed(), "seeded from entropy");
        Self::with_random(random)
    }

    fn with_random(random: Random) -> Self {
        Self {
            world: World::new(random),
            modules: Vec::new(),
            traits: TraitManager::new(),
            signals: SignalTable::new(),
            scopes: IndexMap::new(),
            overrides: IndexMap::new(),
            registry: Registry::with_builtins(),
            cancel: CancelToken::new(),
            ready: false,
        }
    }

    /// Replace the registry used by the `*_by_type` constructors.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn seed(&self) -> u64 {
        self.world.random().seed()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn traits(&self) -> &TraitManager {
        &self.traits
    }

    pub fn is_setup(&self) -> bool {
        self.ready
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn check_name(&self, name: &str) -> Result<(), SetupError> {
        if self.ready {
            return Err(SetupError::AlreadySetup);
        }
        if self.world.manager(name).is_some() || self.modules.iter().any(|m| m.name == name) {
            return Err(SetupError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Add a population with `size` empty slots; returns its id.
    pub fn add_population(&mut self, name: &str, size: usize) -> Result<usize, SetupError> {
        if self.world.population_id(name).is_some() {
            return Err(SetupError::DuplicateName(name.to_string()));
        }
        Ok(self.world.add_population(name, size))
    }

    pub fn add_organism_type<E: Encoding>(&mut self, name: &str) -> Result<ManagerHandle, SetupError> {
        let handle = ManagerHandle::new(TypedManager::<E>::new(name));
        self.add_manager(handle.clone())?;
        Ok(handle)
    }

    pub fn add_organism_by_type(&mut self, type_name: &str, name: &str) -> Result<ManagerHandle, SetupError> {
        let handle = self.registry.make_manager(type_name, name)?;
        self.add_manager(handle.clone())?;
        Ok(handle)
    }

    pub fn add_manager(&mut self, handle: ManagerHandle) -> Result<(), SetupError> {
        self.check_name(handle.name())?;
        self.world.add_manager(handle);
        Ok(())
    }

    /// Register a module; returns its id (registration index).
    pub fn add_module<M: Module>(&mut self, module: M) -> Result<usize, SetupError> {
        self.add_boxed_module(Box::new(module))
    }

    pub fn add_module_by_type(&mut self, type_name: &str, name: &str) -> Result<usize, SetupError> {
        let module = self.registry.make_module(type_name, name)?;
        self.add_boxed_module(module)
    }

    fn add_boxed_module(&mut self, module: Box<dyn Module>) -> Result<usize, SetupError> {
        self.check_name(module.name())?;
        self.modules.push(ModuleEntry {
            name: module.name().to_string(),
            module,
        });
        Ok(self.modules.len() - 1)
    }

    /// The module called `name`, if it is an `M`.
    pub fn module<M: Module>(&self, name: &str) -> Option<&M> {
        let entry = self.modules.iter().find(|m| m.name == name)?;
        entry.module.as_any().downcast_ref::<M>()
    }

    pub fn module_mut<M: Module>(&mut self, name: &str) -> Option<&mut M> {
        let entry = self.modules.iter_mut().find(|m| m.name == name)?;
        entry.module.as_any_mut().downcast_mut::<M>()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// Override option `option` of module or organism manager `entity`.
    /// Checked when [`setup`](Self::setup) binds it.
    pub fn set_option(&mut self, entity: &str, option: &str, value: impl Into<Value>) -> Result<(), SetupError> {
        if self.ready {
            return Err(SetupError::AlreadySetup);
        }
        self.overrides
            .entry(entity.to_string())
            .or_default()
            .insert(option.to_string(), value.into());
        Ok(())
    }

    /// Options and member functions of `entity`, once setup has linked them.
    pub fn config_scope(&self, entity: &str) -> Option<&ConfigScope> {
        self.scopes.get(entity)
    }

    pub fn config_scopes(&self) -> impl Iterator<Item = &ConfigScope> {
        self.scopes.values()
    }

    /// Configure every entity, verify traits and lock the layout.
    ///
    /// On failure every population is emptied and the error returned.
    pub fn setup(&mut self) -> Result<(), MabeError> {
        if self.ready {
            return Err(SetupError::AlreadySetup.into());
        }
        match self.run_setup() {
            Ok(()) => {
                self.ready = true;
                info!(
                    populations = self.world.num_populations(),
                    managers = self.world.managers().count(),
                    modules = self.modules.len(),
                    traits = self.traits.len(),
                    "setup complete"
                );
                Ok(())
            }
            Err(err) => {
                self.traits.lock();
                self.world.clear_populations();
                error!(error = %err, "setup failed");
                Err(err)
            }
        }
    }

    fn run_setup(&mut self) -> Result<(), MabeError> {
        self.scopes.clear();
        self.signals.clear();
        self.traits = TraitManager::new();

        for manager in self.world.managers() {
            let mut scope = ConfigScope::new(manager.name());
            manager.get().setup_config(&mut scope);
            self.scopes.insert(manager.name().to_string(), scope);
        }
        for entry in &mut self.modules {
            let mut scope = ConfigScope::new(&entry.name);
            entry.module.setup_config(&mut scope);
            self.scopes.insert(entry.name.clone(), scope);
        }

        self.bind_overrides()?;

        self.traits.unlock();
        let managers: Vec<ManagerHandle> = self.world.managers().cloned().collect();
        for manager in &managers {
            let mut ctx = SetupContext::new(manager.name(), None, &mut self.traits, &mut self.signals, &mut self.world);
            manager.get().setup_module(&mut ctx)?;
        }
        for (index, entry) in self.modules.iter_mut().enumerate() {
            let mut ctx = SetupContext::new(
                &entry.name,
                Some(index),
                &mut self.traits,
                &mut self.signals,
                &mut self.world,
            );
            entry.module.setup_module(&mut ctx)?;
        }

        let layout = self.traits.verify()?;
        self.world.install_layout(&layout);
        for entry in &mut self.modules {
            entry.module.setup_data_map(&layout)?;
        }
        Ok(())
    }

    fn bind_overrides(&mut self) -> Result<(), SetupError> {
        for (entity, options) in &self.overrides {
            let scope = self
                .scopes
                .get(entity)
                .ok_or_else(|| SetupError::UnknownModule(entity.clone()))?;
            let populations = self.world.populations();
            if let Some(manager) = self.world.manager(entity) {
                for (option, value) in options {
                    manager
                        .get()
                        .configure(&mut |data: &mut dyn Any| scope.apply(data, option, value, populations))?;
                }
            } else if let Some(entry) = self.modules.iter_mut().find(|m| &m.name == entity) {
                for (option, value) in options {
                    scope.apply(entry.module.as_any_mut(), option, value, populations)?;
                }
            }
            debug!(entity = %entity, count = options.len(), "options bound");
        }
        Ok(())
    }

    pub fn to_collection(&self, spec: &str) -> Result<Collection, SetupError> {
        self.world.to_collection(spec)
    }

    /// Create `count` initialised organisms of manager `manager_name` and place
    /// each into the first free slot of population `pop` (name or id).
    pub fn inject(&mut self, pop: &str, manager_name: &str, count: usize) -> Result<Vec<OrgPosition>, MabeError> {
        if !self.ready {
            return Err(StateError::NotSetup.into());
        }
        let pop_id = self
            .world
            .population_id(pop)
            .ok_or_else(|| SetupError::UnknownPopulation(pop.to_string()))?;
        let manager = self
            .world
            .manager(manager_name)
            .cloned()
            .ok_or_else(|| SetupError::UnknownModule(manager_name.to_string()))?;

        let mut positions = Vec::with_capacity(count);
        for _ in 0..count {
            let org = manager.make_initial(self.world.random_mut());
            let index = self.world.population_mut(pop_id)?.inject(org);
            positions.push(OrgPosition::new(pop_id, index));
        }
        for &pos in &positions {
            self.emit(Signal::OnPlacement { pos })?;
        }
        info!(population = pop, organism = manager_name, count, "injected organisms");
        Ok(positions)
    }

    /// Invoke member function `function` of module `entity`.
    pub fn call_function(&mut self, entity: &str, function: &str, args: &[Value]) -> Result<Value, MabeError> {
        if !self.ready {
            return Err(StateError::NotSetup.into());
        }
        let scope = self
            .scopes
            .get(entity)
            .ok_or_else(|| SetupError::UnknownModule(entity.to_string()))?;
        let entry = self
            .modules
            .iter_mut()
            .find(|m| m.name == entity)
            .ok_or_else(|| SetupError::UnknownFunction {
                module: entity.to_string(),
                function: function.to_string(),
            })?;
        scope.call(entry.module.as_any_mut(), function, &mut self.world, args)
    }

    /// Run `generations` generations, stopping early if cancelled. A
    /// cancellation stops only the call that observes it; the token is
    /// cleared again on the way out.
    pub fn update(&mut self, generations: usize) -> Result<UpdateSummary, MabeError> {
        if !self.ready {
            return Err(StateError::NotSetup.into());
        }
        let mut summary = UpdateSummary::default();
        for _ in 0..generations {
            if self.cancel.is_cancelled() {
                info!(generation = self.world.generation(), "run cancelled");
                summary.cancelled = true;
                self.cancel.reset();
                break;
            }
            summary.reports.push(self.run_generation()?);
        }
        Ok(summary)
    }

    fn run_generation(&mut self) -> Result<GenerationReport, MabeError> {
        let generation = self.world.generation();
        let errors_before = self.world.eval_error_count();
        self.emit(Signal::BeforeUpdate { generation })?;

        let alive = self.world.alive_collection();
        let mut best_scores = Vec::new();
        for entry in &mut self.modules {
            if let Some(evaluator) = entry.module.as_evaluator() {
                let best = evaluator.evaluate(&alive, &mut self.world);
                best_scores.push((entry.name.clone(), best));
            }
        }

        let mut requests: Vec<ReproductionRequest> = Vec::new();
        for entry in &mut self.modules {
            if let Some(selector) = entry.module.as_selector() {
                selector.select_parents(&mut self.world, &mut requests)?;
            }
        }

        // Every offspring is made before any placement, so parents are intact.
        let offspring = requests
            .iter()
            .map(|request| self.world.make_offspring(request.parent).map(|(child, _)| child))
            .collect::<Result<Vec<_>, _>>()?;

        let mut placed = Vec::with_capacity(offspring.len());
        for (request, child) in requests.iter().zip(offspring) {
            let pos = self.place(request)?;
            let previous = self.world.population_mut(pos.pop_id)?.set_at(pos.index, child);
            if previous.is_some() {
                self.emit(Signal::OnDeath { pos })?;
            }
            self.emit(Signal::OnBirth {
                pos,
                parent: request.parent,
            })?;
            placed.push(pos);
        }
        for &pos in &placed {
            self.emit(Signal::OnPlacement { pos })?;
        }

        self.emit(Signal::AfterUpdate { generation })?;
        self.world.advance_generation();

        let report = GenerationReport {
            generation,
            best_scores,
            births: placed.len(),
            eval_errors: self.world.eval_error_count() - errors_before,
        };
        debug!(
            generation,
            births = report.births,
            alive = self.world.total_alive(),
            scores = ?report.best_scores,
            "generation complete"
        );
        Ok(report)
    }

    /// First placement module with an opinion wins; otherwise a uniform slot.
    fn place(&mut self, request: &ReproductionRequest) -> Result<OrgPosition, StateError> {
        let mut chosen = None;
        for entry in &mut self.modules {
            if let Some(placement) = entry.module.as_placement() {
                chosen = placement.place(request.parent, request.target_pop, &mut self.world);
                if chosen.is_some() {
                    break;
                }
            }
        }
        let pos = match chosen {
            Some(pos) => pos,
            None => place_mixed(request.target_pop, &mut self.world)
                .ok_or(StateError::UnknownPopulation(request.target_pop))?,
        };
        if pos.index >= self.world.population(pos.pop_id)?.size() {
            return Err(StateError::InvalidPlacement(pos));
        }
        Ok(pos)
    }

    fn emit(&mut self, signal: Signal) -> Result<(), MabeError> {
        for &index in self.signals.subscribers(signal.kind()) {
            self.modules[index].module.on_signal(&signal, &mut self.world)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{AnnotatePlacement, EvalCountBits, EvalNk, SelectElite};
    use crate::orgs::BitsOrg;
    use crate::simulation::SignalKind;
    use serde_json::json;

    /// Counts signals it receives.
    #[derive(Debug, Default)]
    struct Counter {
        births: usize,
        deaths: usize,
        placements: usize,
        updates: usize,
    }

    impl Module for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn type_name(&self) -> &'static str {
            "Counter"
        }

        fn setup_module(&mut self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
            for kind in SignalKind::ALL {
                ctx.subscribe(kind);
            }
            Ok(())
        }

        fn on_signal(&mut self, signal: &Signal, _world: &mut World) -> Result<(), MabeError> {
            match signal {
                Signal::OnBirth { .. } => self.births += 1,
                Signal::OnDeath { .. } => self.deaths += 1,
                Signal::OnPlacement { .. } => self.placements += 1,
                Signal::AfterUpdate { .. } => self.updates += 1,
                Signal::BeforeUpdate { .. } => {}
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn nk_run(seed: u64) -> Mabe {
        let mut mabe = Mabe::new(seed);
        mabe.add_population("main_pop", 0).unwrap();
        mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
        mabe.add_module(EvalNk::new("eval_nk").with_nk(20, 2)).unwrap();
        mabe.add_module(SelectElite::new("elite").with_counts(1, 10)).unwrap();
        mabe.set_option("bits_org", "init_length", 20).unwrap();
        mabe
    }

    #[test]
    fn test_update_before_setup_fails() {
        let mut mabe = nk_run(1);
        assert!(matches!(mabe.update(1), Err(MabeError::State(StateError::NotSetup))));
        assert!(matches!(
            mabe.inject("main_pop", "bits_org", 1),
            Err(MabeError::State(StateError::NotSetup))
        ));
    }

    #[test]
    fn test_setup_twice_fails() {
        let mut mabe = nk_run(1);
        mabe.setup().unwrap();
        assert!(matches!(mabe.setup(), Err(MabeError::Setup(SetupError::AlreadySetup))));
        assert_eq!(
            mabe.set_option("eval_nk", "N", 3),
            Err(SetupError::AlreadySetup)
        );
    }

    #[test]
    fn test_duplicate_entity_names() {
        let mut mabe = nk_run(1);
        assert_eq!(
            mabe.add_module(EvalCountBits::new("bits_org")),
            Err(SetupError::DuplicateName("bits_org".into()))
        );
        assert_eq!(
            mabe.add_population("main_pop", 3),
            Err(SetupError::DuplicateName("main_pop".into()))
        );
    }

    #[test]
    fn test_overrides_reach_fields() {
        let mut mabe = nk_run(1);
        mabe.set_option("eval_nk", "K", 3).unwrap();
        mabe.setup().unwrap();
        assert_eq!(mabe.module::<EvalNk>("eval_nk").unwrap().k(), 3);
        let scope = mabe.config_scope("bits_org").unwrap();
        assert_eq!(scope.option("init_length").unwrap().default_value(), &json!(100));
    }

    #[test]
    fn test_unknown_override_entity_and_option() {
        let mut mabe = nk_run(1);
        mabe.set_option("nobody", "N", 3).unwrap();
        assert!(matches!(
            mabe.setup(),
            Err(MabeError::Setup(SetupError::UnknownModule(name))) if name == "nobody"
        ));

        let mut mabe = nk_run(1);
        mabe.set_option("eval_nk", "Q", 3).unwrap();
        assert!(matches!(
            mabe.setup(),
            Err(MabeError::Setup(SetupError::UnknownOption { .. }))
        ));

        let mut mabe = nk_run(1);
        mabe.set_option("bits_org", "mut_prob", "often").unwrap();
        assert!(matches!(
            mabe.setup(),
            Err(MabeError::Setup(SetupError::InvalidOption { .. }))
        ));
    }

    #[test]
    fn test_births_balance_deaths() {
        let mut mabe = nk_run(5);
        mabe.add_module(Counter::default()).unwrap();
        mabe.setup().unwrap();
        mabe.inject("main_pop", "bits_org", 10).unwrap();
        let summary = mabe.update(3).unwrap();

        assert_eq!(summary.generations(), 3);
        assert_eq!(summary.births(), 30);
        assert_eq!(mabe.world().population(0).unwrap().size(), 10);
        assert_eq!(mabe.world().population(0).unwrap().num_alive(), 10);
        let counter = mabe.module::<Counter>("counter").unwrap();
        assert_eq!(counter.births, 30);
        assert_eq!(counter.deaths, 30);
        assert_eq!(counter.placements, 40);
        assert_eq!(counter.updates, 3);
        assert_eq!(mabe.world().generation(), 3);
    }

    #[test]
    fn test_cancel_between_generations() {
        let mut mabe = nk_run(2);
        mabe.setup().unwrap();
        mabe.inject("main_pop", "bits_org", 10).unwrap();
        mabe.cancel_token().cancel();
        let summary = mabe.update(5).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.generations(), 0);
        assert_eq!(mabe.world().total_alive(), 10);
    }

    #[test]
    fn test_update_resumes_after_cancel() {
        let mut mabe = nk_run(2);
        mabe.setup().unwrap();
        mabe.inject("main_pop", "bits_org", 10).unwrap();
        let token = mabe.cancel_token();
        token.cancel();
        assert!(mabe.update(3).unwrap().cancelled);
        assert!(!token.is_cancelled());

        let summary = mabe.update(3).unwrap();
        assert!(!summary.cancelled);
        assert_eq!(summary.generations(), 3);
        assert_eq!(mabe.world().generation(), 3);
    }

    #[test]
    fn test_cancel_token_reset() {
        let token = CancelToken::new();
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_call_member_functions() {
        let mut mabe = nk_run(3);
        mabe.setup().unwrap();
        mabe.inject("main_pop", "bits_org", 4).unwrap();
        let best = mabe.call_function("eval_nk", "EVAL", &[json!("main_pop[0-1]")]).unwrap();
        assert!(best.as_f64().unwrap() > 0.0);
        assert_eq!(mabe.call_function("eval_nk", "RESET", &[]).unwrap(), Value::Null);
        assert!(matches!(
            mabe.call_function("elite", "EVAL", &[]),
            Err(MabeError::Setup(SetupError::UnknownFunction { .. }))
        ));
        assert!(matches!(
            mabe.call_function("eval_nk", "EVAL", &[json!("nowhere")]),
            Err(MabeError::Setup(SetupError::UnknownPopulation(_)))
        ));
    }

    #[test]
    fn test_setup_can_be_retried_after_failure() {
        let mut mabe = nk_run(6);
        mabe.set_option("eval_nk", "K", 20).unwrap();
        assert!(mabe.setup().is_err());
        assert!(!mabe.is_setup());

        mabe.set_option("eval_nk", "K", 2).unwrap();
        mabe.setup().unwrap();
        assert_eq!(mabe.traits().len(), 2);
        mabe.inject("main_pop", "bits_org", 5).unwrap();
        assert_eq!(mabe.update(1).unwrap().births(), 10);
    }

    #[test]
    fn test_inject_fires_placement_annotation() {
        let mut mabe = nk_run(4);
        mabe.add_module(AnnotatePlacement::new("annotate")).unwrap();
        mabe.setup().unwrap();
        let positions = mabe.inject("0", "bits_org", 3).unwrap();
        for pos in positions {
            let org = mabe.world().org(pos).unwrap();
            assert_eq!(*org.get_trait::<OrgPosition>("org_pos").unwrap(), pos);
        }
    }
}
