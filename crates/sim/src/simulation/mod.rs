//! Populations, the world they live in, and the controller that runs them.
//!
//! - [`Mabe`]: the controller. Owns modules and the [`World`], runs setup and
//!   generations.
//! - [`Population`] and [`OrgPosition`]: slots of organisms and addresses
//!   into them.
//! - [`Collection`]: a read-only selection of organisms across populations.
//! - [`ConfigScope`]: options and member functions linked by each entity.
//! - [`RunConfig`] and [`PopulationSnapshot`]: JSON run descriptions and
//!   captured state.

mod collection;
mod config;
mod control;
mod population;
mod registry;
mod run_config;
mod signals;
mod snapshot;
mod world;

pub use collection::Collection;
pub use config::{ConfigOption, ConfigScope, MemberFunction, OptionKind};
pub use control::{CancelToken, GenerationReport, Mabe, UpdateSummary};
pub use population::{OrgPosition, Population};
pub use registry::{Registry, TypeEntry};
pub use run_config::{EntityConfig, InjectConfig, PopulationConfig, RunConfig};
pub use signals::{Signal, SignalKind, SignalTable};
pub use snapshot::{OrgRecord, PopulationSnapshot, SNAPSHOT_VERSION};
pub use world::World;
