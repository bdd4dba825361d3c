//! Organisms and the managers that create and vary them.

mod bits_org;
mod manager;
mod organism;

pub use bits_org::{BitsOrg, BitsOrgData, BitsOrgManager};
pub use manager::{manager_of, Encoding, ManagerHandle, OrganismManager, TypedManager};
pub use organism::{Genome, Organism};
