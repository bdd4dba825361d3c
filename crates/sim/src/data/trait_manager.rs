//! Trait declarations and their verification.
//!
//! Modules never talk to each other directly; they declare which organism
//! traits they read and write. The [`TraitManager`] collects those
//! declarations during module setup and, once everyone has declared, checks
//! that every read trait has a writer, that no trait has two exclusive
//! writers, and that everyone agrees on the trait's type. The result is the
//! locked [`DataLayout`] that every organism's data map will use.

use super::{DataLayout, LayoutBuilder, Producer, TraitType, TraitValue};
use crate::errors::SetupError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a module uses a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    /// Read only; someone else must write it.
    Required,
    /// Sole writer.
    Owned,
    /// One of several cooperating writers.
    Shared,
    /// Sole writer, computed on read.
    Generated,
}

impl Access {
    /// Owned and generated traits admit a single writer.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Owned | Self::Generated)
    }

    pub fn writes(self) -> bool {
        !matches!(self, Self::Required)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Required => "required",
            Self::Owned => "owned",
            Self::Shared => "shared",
            Self::Generated => "generated",
        };
        f.write_str(name)
    }
}

/// One module's declaration of a trait.
#[derive(Clone)]
pub struct TraitDecl {
    module: String,
    access: Access,
    default: TraitValue,
    arity: usize,
    desc: String,
    producer: Option<Producer>,
}

impl TraitDecl {
    pub fn new(module: impl Into<String>, access: Access, default: TraitValue) -> Self {
        Self {
            module: module.into(),
            access,
            default,
            arity: 1,
            desc: String::new(),
            producer: None,
        }
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity.max(1);
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn trait_type(&self) -> TraitType {
        self.default.trait_type()
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }
}

impl fmt::Debug for TraitDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitDecl")
            .field("module", &self.module)
            .field("access", &self.access)
            .field("type", &self.trait_type())
            .field("arity", &self.arity)
            .finish()
    }
}

/// Everything known about one trait name.
#[derive(Debug, Clone)]
pub struct TraitInfo {
    name: String,
    decls: Vec<TraitDecl>,
}

impl TraitInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First non-empty description.
    pub fn desc(&self) -> &str {
        self.decls
            .iter()
            .map(|d| d.desc.as_str())
            .find(|d| !d.is_empty())
            .unwrap_or("")
    }

    pub fn declarations(&self) -> &[TraitDecl] {
        &self.decls
    }

    /// Names of modules declaring the trait with `access`, in declaration order.
    pub fn modules_with(&self, access: Access) -> Vec<&str> {
        self.decls
            .iter()
            .filter(|d| d.access == access)
            .map(|d| d.module.as_str())
            .collect()
    }

    pub fn count(&self, access: Access) -> usize {
        self.decls.iter().filter(|d| d.access == access).count()
    }

    pub fn module_count(&self) -> usize {
        self.decls.len()
    }

    pub fn access_of(&self, module: &str) -> Option<Access> {
        self.decls.iter().find(|d| d.module == module).map(|d| d.access)
    }

    /// The exclusive writer, if any.
    pub fn owner(&self) -> Option<&TraitDecl> {
        self.decls.iter().find(|d| d.access.is_exclusive())
    }

    /// Declaration whose type, arity and default define the layout field.
    fn reference(&self) -> &TraitDecl {
        self.owner()
            .or_else(|| self.decls.iter().find(|d| d.access == Access::Shared))
            .unwrap_or(&self.decls[0])
    }
}

/// Collects trait declarations and emits the run layout.
#[derive(Debug)]
pub struct TraitManager {
    traits: IndexMap<String, TraitInfo>,
    locked: bool,
    layout: Option<Arc<DataLayout>>,
}

impl Default for TraitManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TraitManager {
    /// A manager that starts locked; declarations are only accepted between
    /// [`unlock`](Self::unlock) and [`verify`](Self::verify).
    pub fn new() -> Self {
        Self {
            traits: IndexMap::new(),
            locked: true,
            layout: None,
        }
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn add_trait(&mut self, name: &str, decl: TraitDecl) -> Result<(), SetupError> {
        if self.locked {
            return Err(SetupError::TraitsLocked {
                trait_name: name.to_string(),
                module: decl.module,
            });
        }
        let info = self
            .traits
            .entry(name.to_string())
            .or_insert_with(|| TraitInfo {
                name: name.to_string(),
                decls: Vec::new(),
            });
        if info.access_of(&decl.module).is_some() {
            return Err(SetupError::DuplicateDeclaration {
                trait_name: name.to_string(),
                module: decl.module,
            });
        }
        debug!(trait_name = name, module = %decl.module, access = %decl.access, "trait declared");
        info.decls.push(decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TraitInfo> {
        self.traits.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraitInfo> {
        self.traits.values()
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn layout(&self) -> Option<&Arc<DataLayout>> {
        self.layout.as_ref()
    }

    /// Check every declaration and freeze the layout.
    ///
    /// Traits are checked in declaration order and the first violation is
    /// returned. On success the manager is locked again.
    pub fn verify(&mut self) -> Result<Arc<DataLayout>, SetupError> {
        if let Some(layout) = &self.layout {
            return Ok(Arc::clone(layout));
        }
        for info in self.traits.values() {
            Self::verify_trait(info)?;
        }

        let mut builder = LayoutBuilder::new();
        for info in self.traits.values() {
            let reference = info.reference();
            let producer = info
                .decls
                .iter()
                .find(|d| d.access == Access::Generated)
                .and_then(|d| d.producer.clone());
            builder
                .add_field(&info.name, reference.default.clone(), reference.arity, producer)
                .map_err(|err| SetupError::DuplicateName(err.to_string()))?;
        }
        let layout = builder.lock();
        debug!(fields = layout.len(), slots = layout.slot_count(), "trait layout locked");
        self.layout = Some(Arc::clone(&layout));
        self.locked = true;
        Ok(layout)
    }

    fn verify_trait(info: &TraitInfo) -> Result<(), SetupError> {
        let name = &info.name;
        let exclusive: Vec<&TraitDecl> = info.decls.iter().filter(|d| d.access.is_exclusive()).collect();
        if let [first, second, ..] = exclusive.as_slice() {
            return Err(SetupError::DuplicateOwner {
                trait_name: name.clone(),
                first: first.module.clone(),
                second: second.module.clone(),
            });
        }
        let shared = info.modules_with(Access::Shared);
        if let (Some(owner), Some(writer)) = (exclusive.first(), shared.first()) {
            return Err(SetupError::WriteConflict {
                trait_name: name.clone(),
                owner: owner.module.clone(),
                writer: writer.to_string(),
            });
        }
        let required = info.modules_with(Access::Required);
        if !required.is_empty() && exclusive.is_empty() && shared.is_empty() {
            let required_by = required
                .iter()
                .map(|m| format!("'{m}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SetupError::NoOwner {
                trait_name: name.clone(),
                required_by,
            });
        }
        let reference = info.reference();
        for decl in &info.decls {
            if decl.trait_type() != reference.trait_type() || decl.arity != reference.arity {
                return Err(SetupError::TypeMismatch {
                    trait_name: name.clone(),
                    module: decl.module.clone(),
                    expected: describe(reference),
                    found: describe(decl),
                });
            }
        }
        Ok(())
    }
}

fn describe(decl: &TraitDecl) -> String {
    if decl.arity == 1 {
        decl.trait_type().to_string()
    } else {
        format!("{}[{}]", decl.trait_type(), decl.arity)
    }
}
