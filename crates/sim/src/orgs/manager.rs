//! Organism managers: one factory per organism type, shared by every
//! organism it creates.

use super::{Genome, Organism};
use crate::base::Random;
use crate::data::{DataLayout, DataMap};
use crate::errors::{SetupError, StateError};
use crate::modules::SetupContext;
use crate::simulation::ConfigScope;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A concrete genome representation and its variation operators.
///
/// The encoding itself is the genome; [`Encoding::ManagerData`] holds the
/// per-type settings shared by every organism of that type.
pub trait Encoding: Clone + Send + Sync + fmt::Debug + 'static {
    type ManagerData: Default + Send + Sync + fmt::Debug + 'static;

    /// Type name used in configuration files.
    const TYPE_NAME: &'static str;
    const DESCRIPTION: &'static str = "";

    /// Genome that every new organism starts as.
    fn prototype(data: &Self::ManagerData) -> Self;

    /// Link configurable fields of the shared data.
    fn setup_config(data: &mut Self::ManagerData, config: &mut ConfigScope);

    /// Validate settings and declare output traits.
    fn setup_traits(data: &Self::ManagerData, ctx: &mut SetupContext<'_>) -> Result<(), SetupError>;

    fn randomize(&mut self, data: &Self::ManagerData, rng: &mut Random);

    /// Initialisation applied to injected organisms. Defaults to randomizing.
    fn initialize(&mut self, data: &Self::ManagerData, rng: &mut Random) {
        self.randomize(data, rng);
    }

    /// Mutate in place and return the number of sites that changed.
    fn mutate(&mut self, data: &Self::ManagerData, rng: &mut Random) -> usize;

    fn generate_output(&self, data: &Self::ManagerData, map: &mut DataMap) -> Result<(), StateError>;

    fn describe(&self) -> String;
}

/// Object-safe face of a manager, stored behind [`ManagerHandle`].
pub trait OrganismManager: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn org_type_id(&self) -> TypeId;

    fn setup_config(&self, config: &mut ConfigScope);
    /// Run `apply` against the shared data; used to bind option values.
    fn configure(
        &self,
        apply: &mut dyn FnMut(&mut dyn Any) -> Result<(), SetupError>,
    ) -> Result<(), SetupError>;
    fn setup_module(&self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError>;
    fn set_layout(&self, layout: &Arc<DataLayout>);
    fn layout(&self) -> Option<Arc<DataLayout>>;

    fn new_genome(&self) -> Box<dyn Genome>;
    fn randomize(&self, org: &mut Organism, rng: &mut Random);
    fn initialize(&self, org: &mut Organism, rng: &mut Random);
    fn mutate(&self, org: &mut Organism, rng: &mut Random) -> usize;
    fn generate_output(&self, org: &mut Organism) -> Result<(), StateError>;
    fn describe(&self, org: &Organism) -> String;

    fn as_any(&self) -> &dyn Any;
}

/// Generic manager for any [`Encoding`].
#[derive(Debug)]
pub struct TypedManager<E: Encoding> {
    name: String,
    data: RwLock<E::ManagerData>,
    prototype: RwLock<E>,
    layout: RwLock<Option<Arc<DataLayout>>>,
}

impl<E: Encoding> TypedManager<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, E::ManagerData::default())
    }

    pub fn with_data(name: impl Into<String>, data: E::ManagerData) -> Self {
        let prototype = E::prototype(&data);
        Self {
            name: name.into(),
            data: RwLock::new(data),
            prototype: RwLock::new(prototype),
            layout: RwLock::new(None),
        }
    }

    /// Shared settings, visible to every organism of this type.
    pub fn data(&self) -> RwLockReadGuard<'_, E::ManagerData> {
        self.data.read()
    }

    pub fn data_mut(&self) -> RwLockWriteGuard<'_, E::ManagerData> {
        self.data.write()
    }

    fn genome<'a>(&self, genome: &'a dyn Genome) -> &'a E {
        genome
            .as_any()
            .downcast_ref::<E>()
            .unwrap_or_else(|| panic!("organism managed by '{}' is not a {}", self.name, E::TYPE_NAME))
    }

    fn genome_mut<'a>(&self, org: &'a mut Organism) -> &'a mut E {
        org.genome_dyn_mut()
            .as_any_mut()
            .downcast_mut::<E>()
            .unwrap_or_else(|| panic!("organism managed by '{}' is not a {}", self.name, E::TYPE_NAME))
    }
}

impl<E: Encoding> OrganismManager for TypedManager<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn org_type_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn setup_config(&self, config: &mut ConfigScope) {
        E::setup_config(&mut self.data.write(), config);
    }

    fn configure(
        &self,
        apply: &mut dyn FnMut(&mut dyn Any) -> Result<(), SetupError>,
    ) -> Result<(), SetupError> {
        let mut data = self.data.write();
        apply(&mut *data)
    }

    fn setup_module(&self, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        let data = self.data.read();
        *self.prototype.write() = E::prototype(&data);
        E::setup_traits(&data, ctx)
    }

    fn set_layout(&self, layout: &Arc<DataLayout>) {
        *self.layout.write() = Some(Arc::clone(layout));
    }

    fn layout(&self) -> Option<Arc<DataLayout>> {
        self.layout.read().clone()
    }

    fn new_genome(&self) -> Box<dyn Genome> {
        Box::new(self.prototype.read().clone())
    }

    fn randomize(&self, org: &mut Organism, rng: &mut Random) {
        let data = self.data.read();
        self.genome_mut(org).randomize(&data, rng);
    }

    fn initialize(&self, org: &mut Organism, rng: &mut Random) {
        let data = self.data.read();
        self.genome_mut(org).initialize(&data, rng);
    }

    fn mutate(&self, org: &mut Organism, rng: &mut Random) -> usize {
        let data = self.data.read();
        self.genome_mut(org).mutate(&data, rng)
    }

    fn generate_output(&self, org: &mut Organism) -> Result<(), StateError> {
        let data = self.data.read();
        let (genome, map) = org.parts_mut();
        self.genome(genome).generate_output(&data, map)
    }

    fn describe(&self, org: &Organism) -> String {
        self.genome(org.genome_dyn()).describe()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared pointer to an organism manager; the factory for its organisms.
#[derive(Clone)]
pub struct ManagerHandle(Arc<dyn OrganismManager>);

impl ManagerHandle {
    pub fn new<M: OrganismManager + 'static>(manager: M) -> Self {
        Self(Arc::new(manager))
    }

    pub fn from_arc(manager: Arc<dyn OrganismManager>) -> Self {
        Self(manager)
    }

    pub fn get(&self) -> &dyn OrganismManager {
        self.0.as_ref()
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub fn org_type_id(&self) -> TypeId {
        self.0.org_type_id()
    }

    pub fn layout(&self) -> Option<Arc<DataLayout>> {
        self.0.layout()
    }

    /// Whether both handles point at the same manager.
    pub fn ptr_eq(&self, other: &ManagerHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// A copy of the prototype.
    pub fn make(&self) -> Organism {
        Organism::new(self.clone(), self.0.new_genome())
    }

    /// A copy of the prototype, randomized.
    pub fn make_random(&self, rng: &mut Random) -> Organism {
        let mut org = self.make();
        self.0.randomize(&mut org, rng);
        org
    }

    /// A copy of the prototype with the encoding's initialisation applied.
    pub fn make_initial(&self, rng: &mut Random) -> Organism {
        let mut org = self.make();
        self.0.initialize(&mut org, rng);
        org
    }

    pub fn clone_org(&self, org: &Organism) -> Organism {
        org.clone()
    }

    /// Clone `parent` and mutate the copy. Returns the offspring and the
    /// number of mutated sites.
    pub fn make_offspring(&self, parent: &Organism, rng: &mut Random) -> (Organism, usize) {
        let mut child = self.clone_org(parent);
        let mutations = self.0.mutate(&mut child, rng);
        (child, mutations)
    }

    pub fn describe(&self, org: &Organism) -> String {
        self.0.describe(org)
    }

    pub fn downcast<E: Encoding>(&self) -> Option<&TypedManager<E>> {
        OrganismManager::as_any(&*self.0).downcast_ref::<TypedManager<E>>()
    }
}

impl fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("name", &self.name())
            .field("type", &self.type_name())
            .finish()
    }
}

/// The typed manager behind `org`, checked against the organism's type.
pub fn manager_of<E: Encoding>(org: &Organism) -> Result<&TypedManager<E>, StateError> {
    org.manager()
        .downcast::<E>()
        .ok_or_else(|| StateError::WrongOrganismType {
            expected: E::TYPE_NAME.to_string(),
            found: org.manager().type_name().to_string(),
        })
}
