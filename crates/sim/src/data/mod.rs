//! Organism trait storage.
//!
//! A run has one [`DataLayout`], produced by the [`TraitManager`] after every
//! module has declared its traits. Each organism owns a [`DataMap`] built from
//! that layout, and modules reach into it through [`TraitHandle`]s resolved
//! once at setup time.

mod handle;
mod layout;
mod map;
mod trait_manager;
mod value;

pub use handle::TraitHandle;
pub use layout::{DataLayout, FieldInfo, FieldSchema, LayoutBuilder, Producer};
pub use map::DataMap;
pub use trait_manager::{Access, TraitDecl, TraitInfo, TraitManager};
pub use value::{TraitData, TraitType, TraitValue};
