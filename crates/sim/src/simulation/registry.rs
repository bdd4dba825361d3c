//! Named constructors for module and organism types.

use crate::errors::SetupError;
use crate::modules::{
    AnnotatePlacement, EvalCountBits, EvalNk, MaxSizePlacement, Module, RandomReplacement, SelectElite,
};
use crate::orgs::{BitsOrg, Encoding, ManagerHandle, TypedManager};
use indexmap::IndexMap;
use std::fmt;

type ModuleFactory = Box<dyn Fn(&str) -> Box<dyn Module> + Send + Sync>;
type ManagerFactory = Box<dyn Fn(&str) -> ManagerHandle + Send + Sync>;

/// A registered type: its name, a one-line description and a constructor.
pub struct TypeEntry<F> {
    name: &'static str,
    desc: &'static str,
    factory: F,
}

impl<F> TypeEntry<F> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> &'static str {
        self.desc
    }
}

impl<F> fmt::Debug for TypeEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry").field("name", &self.name).finish()
    }
}

/// Module and organism types a run configuration may refer to by name.
#[derive(Debug, Default)]
pub struct Registry {
    modules: IndexMap<&'static str, TypeEntry<ModuleFactory>>,
    organisms: IndexMap<&'static str, TypeEntry<ManagerFactory>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module and organism type shipped with the crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_encoding::<BitsOrg>();
        registry.register_module(EvalNk::TYPE_NAME, EvalNk::DESCRIPTION, |name| EvalNk::new(name));
        registry.register_module(EvalCountBits::TYPE_NAME, EvalCountBits::DESCRIPTION, |name| EvalCountBits::new(name));
        registry.register_module(SelectElite::TYPE_NAME, SelectElite::DESCRIPTION, |name| SelectElite::new(name));
        registry.register_module(
            AnnotatePlacement::TYPE_NAME,
            AnnotatePlacement::DESCRIPTION,
            |name| AnnotatePlacement::new(name),
        );
        registry.register_module(
            RandomReplacement::TYPE_NAME,
            RandomReplacement::DESCRIPTION,
            |name| RandomReplacement::new(name),
        );
        registry.register_module(
            MaxSizePlacement::TYPE_NAME,
            MaxSizePlacement::DESCRIPTION,
            |name| MaxSizePlacement::new(name),
        );
        registry
    }

    pub fn register_module<M, F>(&mut self, name: &'static str, desc: &'static str, make: F)
    where
        M: Module,
        F: Fn(&str) -> M + Send + Sync + 'static,
    {
        let factory: ModuleFactory = Box::new(move |instance: &str| Box::new(make(instance)) as Box<dyn Module>);
        self.modules.insert(name, TypeEntry { name, desc, factory });
    }

    /// Register organism type `E` under its `TYPE_NAME`.
    pub fn register_encoding<E: Encoding>(&mut self) {
        let factory: ManagerFactory = Box::new(|instance: &str| ManagerHandle::new(TypedManager::<E>::new(instance)));
        self.organisms.insert(
            E::TYPE_NAME,
            TypeEntry {
                name: E::TYPE_NAME,
                desc: E::DESCRIPTION,
                factory,
            },
        );
    }

    pub fn make_module(&self, type_name: &str, name: &str) -> Result<Box<dyn Module>, SetupError> {
        let entry = self
            .modules
            .get(type_name)
            .ok_or_else(|| SetupError::UnknownModule(type_name.to_string()))?;
        Ok((entry.factory)(name))
    }

    pub fn make_manager(&self, type_name: &str, name: &str) -> Result<ManagerHandle, SetupError> {
        let entry = self
            .organisms
            .get(type_name)
            .ok_or_else(|| SetupError::UnknownModule(type_name.to_string()))?;
        Ok((entry.factory)(name))
    }

    pub fn module_types(&self) -> impl Iterator<Item = &TypeEntry<ModuleFactory>> {
        self.modules.values()
    }

    pub fn organism_types(&self) -> impl Iterator<Item = &TypeEntry<ManagerFactory>> {
        self.organisms.values()
    }
}
