//! Point-in-time JSON captures of a population.

use super::Population;
use crate::data::{FieldSchema, TraitValue};
use crate::errors::{ResourceError, StateError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One slot of a captured population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgRecord {
    pub slot: usize,
    pub alive: bool,
    /// Raw slot values in layout order; empty for dead slots.
    #[serde(default)]
    pub values: Vec<TraitValue>,
    /// The manager's description of the genome.
    #[serde(default)]
    pub genome: Option<String>,
}

/// A population's layout and every slot's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub version: u32,
    pub population: String,
    pub generation: usize,
    pub schema: Vec<FieldSchema>,
    pub records: Vec<OrgRecord>,
}

impl PopulationSnapshot {
    /// Capture `pop` as of `generation`. The population must have a layout.
    pub fn capture(pop: &Population, generation: usize) -> Result<Self, StateError> {
        let layout = pop.layout().ok_or(StateError::NotLocked)?;
        let records = (0..pop.size())
            .map(|slot| match pop.at(slot) {
                Some(org) => OrgRecord {
                    slot,
                    alive: true,
                    values: org.data_map().values().to_vec(),
                    genome: Some(org.describe()),
                },
                None => OrgRecord {
                    slot,
                    alive: false,
                    values: Vec::new(),
                    genome: None,
                },
            })
            .collect();
        Ok(Self {
            version: SNAPSHOT_VERSION,
            population: pop.name().to_string(),
            generation,
            schema: layout.schema(),
            records,
        })
    }

    pub fn num_alive(&self) -> usize {
        self.records.iter().filter(|r| r.alive).count()
    }

    /// Value of field `name` in the record at `slot`, when alive.
    pub fn value(&self, slot: usize, name: &str) -> Option<&TraitValue> {
        let record = self.records.get(slot).filter(|r| r.alive)?;
        let mut offset = 0;
        for field in &self.schema {
            if field.name == name {
                return record.values.get(offset);
            }
            offset += field.arity;
        }
        None
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ResourceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| ResourceError::io(path, err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|err| ResourceError::io(path, err))
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ResourceError::io(path, err))?;
        let snapshot: Self = serde_json::from_reader(BufReader::new(file)).map_err(|err| ResourceError::Parse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ResourceError::Parse {
                path: path.to_path_buf(),
                reason: format!("unsupported snapshot version {}", snapshot.version),
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BitVector;
    use crate::data::LayoutBuilder;
    use crate::orgs::{BitsOrgData, BitsOrgManager, ManagerHandle};
    use tempfile::tempdir;

    fn population() -> Population {
        let manager = ManagerHandle::new(BitsOrgManager::with_data(
            "bits_org",
            BitsOrgData {
                init_length: 4,
                ..BitsOrgData::default()
            },
        ));
        let mut builder = LayoutBuilder::new();
        builder.add_field("bits", TraitValue::Bits(BitVector::new(4)), 1, None).unwrap();
        builder.add_field("fitness", TraitValue::Double(0.0), 1, None).unwrap();
        let layout = builder.lock();

        manager.get().set_layout(&layout);

        let mut pop = Population::new(0, "main_pop", 3);
        pop.install_layout(&layout);
        let mut org = manager.make();
        org.set_trait("fitness", 0.75).unwrap();
        org.generate_output().unwrap();
        pop.set_at(1, org);
        pop
    }

    #[test]
    fn test_capture_records_every_slot() {
        let snapshot = PopulationSnapshot::capture(&population(), 7).unwrap();
        assert_eq!(snapshot.population, "main_pop");
        assert_eq!(snapshot.generation, 7);
        assert_eq!(snapshot.records.len(), 3);
        assert_eq!(snapshot.num_alive(), 1);
        assert_eq!(snapshot.value(1, "fitness"), Some(&TraitValue::Double(0.75)));
        assert_eq!(snapshot.value(0, "fitness"), None);
        assert_eq!(snapshot.records[1].genome.as_deref(), Some("0000"));
    }

    #[test]
    fn test_capture_needs_layout() {
        let pop = Population::new(0, "bare", 2);
        assert_eq!(PopulationSnapshot::capture(&pop, 0), Err(StateError::NotLocked));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = PopulationSnapshot::capture(&population(), 2).unwrap();
        snapshot.write_json(&path).unwrap();
        assert_eq!(PopulationSnapshot::read_json(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_read_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PopulationSnapshot::read_json(&path),
            Err(ResourceError::Parse { .. })
        ));
    }
}
