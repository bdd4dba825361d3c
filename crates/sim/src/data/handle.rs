//! Typed, pre-resolved accessors for a single trait.

use super::{DataLayout, DataMap, TraitData};
use crate::errors::StateError;
use crate::orgs::Organism;
use std::borrow::Cow;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy)]
struct ResolvedSlot {
    layout_id: u64,
    offset: usize,
    generated: bool,
}

/// Handle to one trait, created when a module declares the trait and
/// resolved against the locked layout after verification.
///
/// Once resolved, reads and writes are a single indexed slot access. A handle
/// used on an organism whose layout lacks its trait is a fatal program error
/// and panics; [`TraitHandle::try_get`] is the fallible form.
#[derive(Debug, Clone)]
pub struct TraitHandle<T> {
    name: String,
    arity: usize,
    slot: Option<ResolvedSlot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TraitData> TraitHandle<T> {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity: arity.max(1),
            slot: None,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.is_some()
    }

    /// Bind to `layout`, checking element type and arity.
    pub fn resolve(&mut self, layout: &DataLayout) -> Result<(), StateError> {
        let field = layout
            .field(&self.name)
            .ok_or_else(|| StateError::MissingTrait(self.name.clone()))?;
        if field.trait_type() != T::TYPE {
            return Err(StateError::TypeMismatch {
                trait_name: self.name.clone(),
                expected: T::TYPE.to_string(),
                found: field.trait_type().to_string(),
            });
        }
        if field.arity() != self.arity {
            return Err(StateError::ArityMismatch {
                trait_name: self.name.clone(),
                expected: self.arity,
                found: field.arity(),
            });
        }
        self.slot = Some(ResolvedSlot {
            layout_id: layout.id(),
            offset: field.offset(),
            generated: field.is_generated(),
        });
        Ok(())
    }

    fn locate(&self, map: &DataMap) -> Result<ResolvedSlot, StateError> {
        let slot = self
            .slot
            .ok_or_else(|| StateError::UnresolvedHandle(self.name.clone()))?;
        let layout = map.layout().ok_or(StateError::NotLocked)?;
        if layout.id() == slot.layout_id {
            return Ok(slot);
        }
        // Foreign layout: fall back to a name lookup.
        let field = layout
            .field(&self.name)
            .ok_or_else(|| StateError::MissingTrait(self.name.clone()))?;
        if field.trait_type() != T::TYPE {
            return Err(StateError::TypeMismatch {
                trait_name: self.name.clone(),
                expected: T::TYPE.to_string(),
                found: field.trait_type().to_string(),
            });
        }
        if field.arity() != self.arity {
            return Err(StateError::ArityMismatch {
                trait_name: self.name.clone(),
                expected: self.arity,
                found: field.arity(),
            });
        }
        Ok(ResolvedSlot {
            layout_id: layout.id(),
            offset: field.offset(),
            generated: field.is_generated(),
        })
    }

    fn locate_or_die(&self, map: &DataMap) -> ResolvedSlot {
        self.locate(map).unwrap_or_else(|err| panic!("{err}"))
    }

    fn check_index(&self, index: usize) {
        if index >= self.arity {
            panic!(
                "{}",
                StateError::IndexOutOfRange {
                    trait_name: self.name.clone(),
                    index,
                    arity: self.arity,
                }
            );
        }
    }

    pub fn try_get<'a>(&self, map: &'a DataMap) -> Result<Cow<'a, T>, StateError> {
        let slot = self.locate(map)?;
        if slot.generated {
            return map.get::<T>(&self.name);
        }
        Ok(Cow::Borrowed(map.typed_slot::<T>(slot.offset)))
    }

    /// Read the trait from a data map.
    pub fn read<'a>(&self, map: &'a DataMap) -> Cow<'a, T> {
        self.try_get(map).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn write(&self, map: &mut DataMap, value: T) {
        self.write_at(map, 0, value);
    }

    pub fn write_at(&self, map: &mut DataMap, index: usize, value: T) {
        self.check_index(index);
        let slot = self.locate_or_die(map);
        if slot.generated {
            panic!("{}", StateError::GeneratedWrite(self.name.clone()));
        }
        *map.typed_slot_mut::<T>(slot.offset + index) = value;
    }

    /// Read the trait of an organism. Generated traits are computed.
    pub fn get<'a>(&self, org: &'a Organism) -> Cow<'a, T> {
        self.read(org.data_map())
    }

    /// Element `index` of a multi-valued trait.
    pub fn get_at<'a>(&self, org: &'a Organism, index: usize) -> &'a T {
        self.check_index(index);
        let map = org.data_map();
        let slot = self.locate_or_die(map);
        if slot.generated {
            panic!("multi-valued access to generated trait '{}'", self.name);
        }
        map.typed_slot::<T>(slot.offset + index)
    }

    pub fn get_mut<'a>(&self, org: &'a mut Organism) -> &'a mut T {
        let map = org.data_map_mut();
        let slot = self.locate_or_die(map);
        if slot.generated {
            panic!("{}", StateError::GeneratedWrite(self.name.clone()));
        }
        map.typed_slot_mut::<T>(slot.offset)
    }

    pub fn set(&self, org: &mut Organism, value: T) {
        self.write(org.data_map_mut(), value);
    }

    pub fn set_at(&self, org: &mut Organism, index: usize, value: T) {
        self.write_at(org.data_map_mut(), index, value);
    }

    /// All elements of the trait, in order.
    pub fn values(&self, org: &Organism) -> Vec<T> {
        (0..self.arity)
            .map(|i| {
                if i == 0 {
                    self.get(org).into_owned()
                } else {
                    self.get_at(org, i).clone()
                }
            })
            .collect()
    }
}
