//! Per-organism trait records.

use super::{DataLayout, FieldInfo, TraitData, TraitValue};
use crate::errors::StateError;
use std::borrow::Cow;
use std::sync::Arc;

/// A record of named trait values laid out by a shared [`DataLayout`].
///
/// Values live in one flat vector of slots; a field of arity `n` occupies
/// `n` consecutive slots starting at its offset. A map without a layout
/// rejects every access with [`StateError::NotLocked`].
#[derive(Debug, Clone, Default)]
pub struct DataMap {
    layout: Option<Arc<DataLayout>>,
    values: Vec<TraitValue>,
}

impl DataMap {
    /// An empty map with no layout yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding the defaults of `layout`.
    pub fn with_layout(layout: &Arc<DataLayout>) -> Self {
        Self {
            layout: Some(Arc::clone(layout)),
            values: layout.initial_values(),
        }
    }

    /// Switch to `layout`. Values of fields with the same name, type and arity
    /// survive; everything else starts at its default.
    pub fn install_layout(&mut self, layout: &Arc<DataLayout>) {
        if self.layout_id() == Some(layout.id()) {
            return;
        }
        let mut values = layout.initial_values();
        if let Some(old) = &self.layout {
            for field in layout.fields() {
                let Some(prev) = old.field(field.name()) else {
                    continue;
                };
                if prev.trait_type() != field.trait_type()
                    || prev.arity() != field.arity()
                    || field.is_generated()
                {
                    continue;
                }
                for i in 0..field.arity() {
                    values[field.offset() + i] = self.values[prev.offset() + i].clone();
                }
            }
        }
        self.layout = Some(Arc::clone(layout));
        self.values = values;
    }

    pub fn is_locked(&self) -> bool {
        self.layout.is_some()
    }

    pub fn layout(&self) -> Option<&Arc<DataLayout>> {
        self.layout.as_ref()
    }

    pub fn layout_id(&self) -> Option<u64> {
        self.layout.as_ref().map(|layout| layout.id())
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.layout.as_ref().is_some_and(|layout| layout.has_field(name))
    }

    pub fn field(&self, name: &str) -> Result<&FieldInfo, StateError> {
        self.layout
            .as_ref()
            .ok_or(StateError::NotLocked)?
            .field(name)
            .ok_or_else(|| StateError::MissingTrait(name.to_string()))
    }

    fn typed_field<T: TraitData>(&self, name: &str) -> Result<&FieldInfo, StateError> {
        let field = self.field(name)?;
        if field.trait_type() != T::TYPE {
            return Err(StateError::TypeMismatch {
                trait_name: name.to_string(),
                expected: T::TYPE.to_string(),
                found: field.trait_type().to_string(),
            });
        }
        Ok(field)
    }

    fn writable_offset<T: TraitData>(&self, name: &str, index: usize) -> Result<usize, StateError> {
        let field = self.typed_field::<T>(name)?;
        if field.is_generated() {
            return Err(StateError::GeneratedWrite(name.to_string()));
        }
        if index >= field.arity() {
            return Err(StateError::IndexOutOfRange {
                trait_name: name.to_string(),
                index,
                arity: field.arity(),
            });
        }
        Ok(field.offset() + index)
    }

    /// Read a trait by name. Generated traits are computed on the spot.
    pub fn get<T: TraitData>(&self, name: &str) -> Result<Cow<'_, T>, StateError> {
        self.get_at(name, 0)
    }

    /// Read element `index` of a (possibly multi-valued) trait.
    pub fn get_at<T: TraitData>(&self, name: &str, index: usize) -> Result<Cow<'_, T>, StateError> {
        let field = self.typed_field::<T>(name)?;
        if index >= field.arity() {
            return Err(StateError::IndexOutOfRange {
                trait_name: name.to_string(),
                index,
                arity: field.arity(),
            });
        }
        if let Some(producer) = field.producer() {
            let value = producer(self);
            return T::from_owned(value).map(Cow::Owned).ok_or_else(|| {
                StateError::TypeMismatch {
                    trait_name: name.to_string(),
                    expected: T::TYPE.to_string(),
                    found: "generated value".to_string(),
                }
            });
        }
        Ok(Cow::Borrowed(self.typed_slot::<T>(field.offset() + index)))
    }

    pub fn get_mut<T: TraitData>(&mut self, name: &str) -> Result<&mut T, StateError> {
        let offset = self.writable_offset::<T>(name, 0)?;
        Ok(self.typed_slot_mut::<T>(offset))
    }

    pub fn set<T: TraitData>(&mut self, name: &str, value: T) -> Result<(), StateError> {
        self.set_at(name, 0, value)
    }

    pub fn set_at<T: TraitData>(&mut self, name: &str, index: usize, value: T) -> Result<(), StateError> {
        let offset = self.writable_offset::<T>(name, index)?;
        self.values[offset] = value.into_value();
        Ok(())
    }

    /// All elements of a multi-valued trait.
    pub fn get_all<T: TraitData>(&self, name: &str) -> Result<Vec<T>, StateError> {
        let arity = self.typed_field::<T>(name)?.arity();
        (0..arity)
            .map(|i| self.get_at::<T>(name, i).map(Cow::into_owned))
            .collect()
    }

    /// Dynamically typed read, evaluating generated fields.
    pub fn value(&self, name: &str) -> Result<TraitValue, StateError> {
        let field = self.field(name)?;
        Ok(match field.producer() {
            Some(producer) => producer(self),
            None => self.values[field.offset()].clone(),
        })
    }

    /// Raw slot contents in layout order.
    pub fn values(&self) -> &[TraitValue] {
        &self.values
    }

    pub(crate) fn typed_slot<T: TraitData>(&self, offset: usize) -> &T {
        let slot = &self.values[offset];
        T::from_value(slot).unwrap_or_else(|| {
            panic!("slot {offset} holds {}, read as {}", slot.trait_type(), T::TYPE)
        })
    }

    pub(crate) fn typed_slot_mut<T: TraitData>(&mut self, offset: usize) -> &mut T {
        let found = self.values[offset].trait_type();
        T::from_value_mut(&mut self.values[offset])
            .unwrap_or_else(|| panic!("slot {offset} holds {found}, written as {}", T::TYPE))
    }
}
