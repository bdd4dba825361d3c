//! Collections: views over organism positions across populations.

use super::{OrgPosition, Population};
use crate::errors::SetupError;
use crate::orgs::Organism;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slots {
    All,
    Some(BTreeSet<usize>),
}

impl Slots {
    fn contains(&self, index: usize) -> bool {
        match self {
            Slots::All => true,
            Slots::Some(set) => set.contains(&index),
        }
    }
}

/// An ordered view over slots in one or more populations.
///
/// A collection records which slots it covers, not the organisms in them,
/// so it is resolved against the populations each time it is walked.
/// Iteration is by ascending population id, then ascending slot index, and
/// only ever yields live organisms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    entries: BTreeMap<usize, Slots>,
    alive_only: bool,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every slot of population `pop_id`.
    pub fn from_population(pop_id: usize) -> Self {
        let mut collection = Self::new();
        collection.insert_population(pop_id);
        collection
    }

    pub fn from_positions(positions: impl IntoIterator<Item = OrgPosition>) -> Self {
        let mut collection = Self::new();
        for pos in positions {
            collection.insert_position(pos);
        }
        collection
    }

    pub fn insert_population(&mut self, pop_id: usize) {
        self.entries.insert(pop_id, Slots::All);
    }

    pub fn insert_position(&mut self, pos: OrgPosition) {
        match self.entries.entry(pos.pop_id).or_insert_with(|| Slots::Some(BTreeSet::new())) {
            Slots::All => {}
            Slots::Some(set) => {
                set.insert(pos.index);
            }
        }
    }

    pub fn merge(&mut self, other: &Collection) {
        for (&pop_id, slots) in &other.entries {
            match slots {
                Slots::All => self.insert_population(pop_id),
                Slots::Some(set) => {
                    for &index in set {
                        self.insert_position(OrgPosition::new(pop_id, index));
                    }
                }
            }
        }
        self.alive_only &= other.alive_only;
    }

    /// Same slots, restricted to live organisms.
    pub fn get_alive(&self) -> Collection {
        Collection {
            entries: self.entries.clone(),
            alive_only: true,
        }
    }

    pub fn is_alive_only(&self) -> bool {
        self.alive_only
    }

    pub fn has_population(&self, pop_id: usize) -> bool {
        self.entries.contains_key(&pop_id)
    }

    pub fn contains(&self, pos: OrgPosition) -> bool {
        self.selects(pos.pop_id, pos.index)
    }

    pub(crate) fn selects(&self, pop_id: usize, index: usize) -> bool {
        self.entries.get(&pop_id).is_some_and(|slots| slots.contains(index))
    }

    /// Covered positions that exist, in iteration order. With the alive
    /// filter only occupied slots are returned.
    pub fn positions(&self, populations: &[Population]) -> Vec<OrgPosition> {
        let mut out = Vec::new();
        for (&pop_id, slots) in &self.entries {
            let Some(pop) = populations.get(pop_id) else {
                continue;
            };
            let keep = |index: usize| index < pop.size() && (!self.alive_only || pop.is_alive(index));
            match slots {
                Slots::All => out.extend((0..pop.size()).filter(|&i| keep(i)).map(|i| pop.position(i))),
                Slots::Some(set) => out.extend(set.iter().copied().filter(|&i| keep(i)).map(|i| pop.position(i))),
            }
        }
        out
    }

    /// Live organisms covered by this collection.
    pub fn iter<'a>(
        &'a self,
        populations: &'a [Population],
    ) -> impl Iterator<Item = (OrgPosition, &'a Organism)> + 'a {
        self.entries.iter().flat_map(move |(&pop_id, slots)| {
            populations
                .get(pop_id)
                .into_iter()
                .flat_map(|pop| pop.iter_alive().map(move |(i, org)| (pop.position(i), org)))
                .filter(move |(pos, _)| slots.contains(pos.index))
        })
    }

    /// Number of covered slots (occupied slots only, with the alive filter).
    pub fn size(&self, populations: &[Population]) -> usize {
        self.positions(populations).len()
    }

    pub fn is_empty(&self, populations: &[Population]) -> bool {
        self.size(populations) == 0
    }

    /// Parse a selector such as `"main_pop"`, `"main_pop[0-9]"`,
    /// `"main_pop[0-4,7]"` or `"main_pop,sub_pop"`. Ranges are inclusive.
    pub fn parse(spec: &str, populations: &[Population]) -> Result<Self, SetupError> {
        let invalid = |reason: &str| SetupError::InvalidCollection {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let mut collection = Self::new();
        for entry in split_top_level(spec).map_err(|reason| invalid(&reason))? {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(invalid("empty entry"));
            }
            let (name, ranges) = match entry.find('[') {
                Some(open) => {
                    let close = entry
                        .strip_suffix(']')
                        .ok_or_else(|| invalid("missing closing ']'"))?;
                    (entry[..open].trim(), Some(&close[open + 1..]))
                }
                None => (entry, None),
            };
            let pop_id = resolve_population(name, populations)
                .ok_or_else(|| SetupError::UnknownPopulation(name.to_string()))?;
            match ranges {
                None => collection.insert_population(pop_id),
                Some(ranges) => {
                    let size = populations.get(pop_id).map_or(0, Population::size);
                    for range in ranges.split(',') {
                        let (first, last) = parse_range(range.trim()).map_err(|reason| invalid(&reason))?;
                        // Only slots that exist at parse time are covered.
                        for index in first..last.saturating_add(1).min(size) {
                            collection.insert_position(OrgPosition::new(pop_id, index));
                        }
                    }
                }
            }
        }
        Ok(collection)
    }
}

/// Population by name, falling back to a numeric id.
pub(crate) fn resolve_population(name: &str, populations: &[Population]) -> Option<usize> {
    populations
        .iter()
        .find(|pop| pop.name() == name)
        .map(Population::id)
        .or_else(|| name.parse::<usize>().ok().filter(|&id| id < populations.len()))
}

fn split_top_level(spec: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in spec.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1).ok_or("unbalanced ']'")?,
            ',' if depth == 0 => {
                parts.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '['".to_string());
    }
    parts.push(&spec[start..]);
    Ok(parts)
}

fn parse_range(range: &str) -> Result<(usize, usize), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("'{s}' is not a slot index"))
    };
    match range.split_once('-') {
        Some((a, b)) => {
            let (a, b) = (parse(a)?, parse(b)?);
            if a > b {
                return Err(format!("range {a}-{b} is reversed"));
            }
            Ok((a, b))
        }
        None => {
            let a = parse(range)?;
            Ok((a, a))
        }
    }
}
