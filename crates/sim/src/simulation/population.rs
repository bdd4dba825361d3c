//! Populations and organism positions.
//!
//! A population is an ordered list of slots; each slot is either empty or
//! owns one organism. Slots never move, so an [`OrgPosition`] stays valid
//! for as long as the slot exists.

use crate::data::DataLayout;
use crate::orgs::Organism;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Address of a slot: population id plus index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgPosition {
    pub pop_id: usize,
    pub index: usize,
}

impl OrgPosition {
    pub const fn new(pop_id: usize, index: usize) -> Self {
        Self { pop_id, index }
    }

    /// Marker for "no position".
    pub const fn invalid() -> Self {
        Self {
            pop_id: usize::MAX,
            index: usize::MAX,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pop_id != usize::MAX
    }
}

impl Default for OrgPosition {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for OrgPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}", self.pop_id, self.index)
        } else {
            f.write_str("invalid")
        }
    }
}

/// An ordered set of organism slots.
#[derive(Debug, Clone)]
pub struct Population {
    id: usize,
    name: Arc<str>,
    slots: Vec<Option<Box<Organism>>>,
    num_alive: usize,
    layout: Option<Arc<DataLayout>>,
}

impl Population {
    /// A population of `size` empty slots.
    pub fn new(id: usize, name: impl Into<Arc<str>>, size: usize) -> Self {
        Self {
            id,
            name: name.into(),
            slots: (0..size).map(|_| None).collect(),
            num_alive: 0,
            layout: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of slots, alive or empty.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn num_alive(&self) -> usize {
        self.num_alive
    }

    pub fn is_alive(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_some)
    }

    pub fn position(&self, index: usize) -> OrgPosition {
        OrgPosition::new(self.id, index)
    }

    pub fn at(&self, index: usize) -> Option<&Organism> {
        self.slots.get(index)?.as_deref()
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Organism> {
        self.slots.get_mut(index)?.as_deref_mut()
    }

    /// Layout installed on every organism placed here.
    pub fn layout(&self) -> Option<&Arc<DataLayout>> {
        self.layout.as_ref()
    }

    pub fn install_layout(&mut self, layout: &Arc<DataLayout>) {
        self.layout = Some(Arc::clone(layout));
        for org in self.slots.iter_mut().flatten() {
            org.install_layout(layout);
        }
    }

    /// Place `org` into the first empty slot, growing the population if all
    /// slots are occupied. Returns the index used.
    pub fn inject(&mut self, org: Organism) -> usize {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => self.push_empty(),
        };
        self.set_at(index, org);
        index
    }

    /// Put `org` at `index` and return whatever lived there before.
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    pub fn set_at(&mut self, index: usize, mut org: Organism) -> Option<Organism> {
        if let Some(layout) = &self.layout {
            org.install_layout(layout);
        }
        let previous = self.slots[index].replace(Box::new(org));
        if previous.is_none() {
            self.num_alive += 1;
        }
        previous.map(|org| *org)
    }

    /// Empty slot `index`, returning the organism that lived there.
    pub fn kill_at(&mut self, index: usize) -> Option<Organism> {
        let previous = self.slots.get_mut(index)?.take();
        if previous.is_some() {
            self.num_alive -= 1;
        }
        previous.map(|org| *org)
    }

    /// Append an empty slot and return its index.
    pub fn push_empty(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Grow with empty slots or shrink, dropping organisms past the new end.
    pub fn resize(&mut self, size: usize) {
        let removed = self.slots.iter().skip(size).flatten().count();
        self.num_alive -= removed;
        self.slots.resize_with(size, || None);
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.num_alive = 0;
    }

    /// Occupied slots in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = (usize, &Organism)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|org| (i, org)))
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Option<Box<Organism>>] {
        &mut self.slots
    }
}
