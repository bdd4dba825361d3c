//! DataMap layouts: the open builder and the frozen, shareable descriptor.

use super::{DataMap, TraitType, TraitValue};
use crate::errors::StateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_LAYOUT_ID: AtomicU64 = AtomicU64::new(1);

/// Computes a generated field from the rest of the record on every read.
pub type Producer = Arc<dyn Fn(&DataMap) -> TraitValue + Send + Sync>;

/// One named field of a layout.
#[derive(Clone)]
pub struct FieldInfo {
    name: String,
    offset: usize,
    trait_type: TraitType,
    arity: usize,
    default: TraitValue,
    producer: Option<Producer>,
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the first slot of this field.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn trait_type(&self) -> TraitType {
        self.trait_type
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn default_value(&self) -> &TraitValue {
        &self.default
    }

    pub fn producer(&self) -> Option<&Producer> {
        self.producer.as_ref()
    }

    pub fn is_generated(&self) -> bool {
        self.producer.is_some()
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("trait_type", &self.trait_type)
            .field("arity", &self.arity)
            .field("default", &self.default)
            .field("generated", &self.producer.is_some())
            .finish()
    }
}

/// Serializable description of a field, used in snapshots and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub trait_type: TraitType,
    pub arity: usize,
    pub generated: bool,
}

/// A layout that is still accepting fields.
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    fields: IndexMap<String, FieldInfo>,
    slot_count: usize,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field and return its offset. The element type is taken from
    /// `default`; an arity of zero is stored as one.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        default: TraitValue,
        arity: usize,
        producer: Option<Producer>,
    ) -> Result<usize, StateError> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(StateError::DuplicateField(name));
        }
        let arity = arity.max(1);
        let offset = self.slot_count;
        self.slot_count += arity;
        self.fields.insert(
            name.clone(),
            FieldInfo {
                name,
                offset,
                trait_type: default.trait_type(),
                arity,
                default,
                producer,
            },
        );
        Ok(offset)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Freeze the layout. Every record sharing the result has the same shape.
    pub fn lock(self) -> Arc<DataLayout> {
        Arc::new(DataLayout {
            id: NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed),
            fields: self.fields,
            slot_count: self.slot_count,
        })
    }
}

/// A locked layout shared by every organism of a run.
#[derive(Debug)]
pub struct DataLayout {
    id: u64,
    fields: IndexMap<String, FieldInfo>,
    slot_count: usize,
}

impl DataLayout {
    /// Process-unique identifier; handles cache offsets per layout id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.values()
    }

    /// Default contents for a fresh record.
    pub fn initial_values(&self) -> Vec<TraitValue> {
        let mut values = Vec::with_capacity(self.slot_count);
        for field in self.fields.values() {
            values.extend(std::iter::repeat_n(field.default.clone(), field.arity));
        }
        values
    }

    pub fn schema(&self) -> Vec<FieldSchema> {
        self.fields
            .values()
            .map(|field| FieldSchema {
                name: field.name.clone(),
                trait_type: field.trait_type,
                arity: field.arity,
                generated: field.is_generated(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_consecutive() {
        let mut builder = LayoutBuilder::new();
        assert_eq!(builder.add_field("a", TraitValue::Double(0.0), 1, None).unwrap(), 0);
        assert_eq!(builder.add_field("b", TraitValue::Size(0), 3, None).unwrap(), 1);
        assert_eq!(builder.add_field("c", TraitValue::Bool(false), 0, None).unwrap(), 4);
        let layout = builder.lock();
        assert_eq!(layout.slot_count(), 5);
        assert_eq!(layout.field("b").unwrap().arity(), 3);
        assert_eq!(layout.field("c").unwrap().arity(), 1);
        assert_eq!(layout.initial_values().len(), 5);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut builder = LayoutBuilder::new();
        builder.add_field("x", TraitValue::Double(0.0), 1, None).unwrap();
        let err = builder.add_field("x", TraitValue::Size(1), 1, None).unwrap_err();
        assert_eq!(err, StateError::DuplicateField("x".into()));
    }

    #[test]
    fn test_layout_ids_are_unique() {
        let a = LayoutBuilder::new().lock();
        let b = LayoutBuilder::new().lock();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_schema_preserves_order() {
        let mut builder = LayoutBuilder::new();
        builder.add_field("z", TraitValue::Double(0.0), 1, None).unwrap();
        builder.add_field("a", TraitValue::String(String::new()), 1, None).unwrap();
        let names: Vec<_> = builder.lock().schema().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["z", "a"]);
    }
}
