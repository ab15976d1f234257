#![warn(clippy::all, missing_docs)]

//! Seating, access, and cargo core for a virtual-tabletop vehicle sheet.
//!
//! This crate hosts the persisted position/occupancy model, the pure
//! capacity rules, the debounced permission reconciler, and the
//! read-only sheet/cargo preparation. The host platform's documents,
//! tokens, users, and permission tiers sit behind the
//! [`host::HostPlatform`] trait; the platform-facing UI layer maps the
//! returned outcomes to its own notifications and dialogs.

pub mod access;
pub mod cargo;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod mounts;
pub mod rules;
pub mod sheet;
pub mod store;

#[cfg(test)]
mod testutil;

pub use access::{AccessController, AccessDebouncer};
pub use cargo::CargoCategory;
pub use config::ModuleConfig;
pub use error::HostError;
pub use host::{ActorSummary, DocRef, HostPlatform, ItemDoc, UserInfo};
pub use models::{
    ActorRef, ItemId, PermissionLevel, Position, PositionId, TokenRef, UserId, VehicleState,
};
pub use mounts::{MountManager, MountOutcome, OperatorLookup, UpgradeMatcher};
pub use sheet::{SheetData, SheetLoader};
pub use store::{AssignOutcome, GlassChange, GlassUpdate, MoveOutcome, PositionPatch, PositionStore};
