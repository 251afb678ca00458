//! Database schemas for Kiln
//!
//! Defines MongoDB document structures for looks, personas, and pinned
//! assets, each uniquely indexed by token id.

mod look;
mod metadata;
mod persona;
mod pinned_asset;

pub use look::{LookDoc, LOOK_COLLECTION};
pub use metadata::Metadata;
pub use persona::{PersonaDoc, PERSONA_COLLECTION};
pub use pinned_asset::{PinnedAssetDoc, PINNED_ASSET_COLLECTION};
