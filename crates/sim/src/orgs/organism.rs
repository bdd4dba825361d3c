use super::{Encoding, ManagerHandle};
use crate::base::Random;
use crate::data::{DataLayout, DataMap, TraitData};
use crate::errors::StateError;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Type-erased genome storage. Implemented for every [`Encoding`].
pub trait Genome: Any + Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn Genome>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Encoding> Genome for E {
    fn clone_box(&self) -> Box<dyn Genome> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A single organism: its manager, its trait record and its genome.
///
/// Organisms are only created through a [`ManagerHandle`], and the manager
/// stays fixed for the organism's lifetime. All type-specific behaviour
/// (randomizing, mutating, producing output traits) is delegated to it.
#[derive(Debug)]
pub struct Organism {
    manager: ManagerHandle,
    data_map: DataMap,
    genome: Box<dyn Genome>,
}

impl Clone for Organism {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            data_map: self.data_map.clone(),
            genome: self.genome.clone_box(),
        }
    }
}

impl Organism {
    pub(crate) fn new(manager: ManagerHandle, genome: Box<dyn Genome>) -> Self {
        let data_map = match manager.layout() {
            Some(layout) => DataMap::with_layout(&layout),
            None => DataMap::new(),
        };
        Self {
            manager,
            data_map,
            genome,
        }
    }

    #[inline]
    pub fn manager(&self) -> &ManagerHandle {
        &self.manager
    }

    #[inline]
    pub fn data_map(&self) -> &DataMap {
        &self.data_map
    }

    #[inline]
    pub fn data_map_mut(&mut self) -> &mut DataMap {
        &mut self.data_map
    }

    /// Identifier of the organism's concrete type.
    pub fn org_type_id(&self) -> TypeId {
        self.manager.org_type_id()
    }

    /// Organisms are only comparable when they share a concrete type.
    pub fn same_kind(&self, other: &Organism) -> bool {
        self.org_type_id() == other.org_type_id()
    }

    pub fn genome<E: Any>(&self) -> Option<&E> {
        self.genome.as_any().downcast_ref::<E>()
    }

    pub fn genome_mut<E: Any>(&mut self) -> Option<&mut E> {
        self.genome.as_any_mut().downcast_mut::<E>()
    }

    pub(crate) fn genome_dyn(&self) -> &dyn Genome {
        self.genome.as_ref()
    }

    pub(crate) fn genome_dyn_mut(&mut self) -> &mut dyn Genome {
        self.genome.as_mut()
    }

    /// Genome and trait record borrowed together.
    pub(crate) fn parts_mut(&mut self) -> (&dyn Genome, &mut DataMap) {
        (self.genome.as_ref(), &mut self.data_map)
    }

    pub fn install_layout(&mut self, layout: &Arc<DataLayout>) {
        self.data_map.install_layout(layout);
    }

    pub fn randomize(&mut self, rng: &mut Random) {
        let manager = self.manager.clone();
        manager.get().randomize(self, rng);
    }

    /// Apply the manager's mutation operator; returns the number of changed sites.
    pub fn mutate(&mut self, rng: &mut Random) -> usize {
        let manager = self.manager.clone();
        manager.get().mutate(self, rng)
    }

    /// Write the genome-derived output traits into the data map.
    pub fn generate_output(&mut self) -> Result<(), StateError> {
        let manager = self.manager.clone();
        manager.get().generate_output(self)
    }

    pub fn describe(&self) -> String {
        self.manager.describe(self)
    }

    pub fn get_trait<T: TraitData>(&self, name: &str) -> Result<Cow<'_, T>, StateError> {
        self.data_map.get(name)
    }

    pub fn set_trait<T: TraitData>(&mut self, name: &str, value: T) -> Result<(), StateError> {
        self.data_map.set(name, value)
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
