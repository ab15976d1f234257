//! The host-platform seam.
//!
//! The surrounding platform owns every document this module touches:
//! the vehicle actor, its embedded items, token instances, and the user
//! roster with their permission levels. This module only reads and
//! writes through the [`HostPlatform`] trait, bound to one vehicle
//! document, and persists nothing of its own beyond the flag blob.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HostError;
use crate::models::{ActorRef, ItemId, PermissionLevel, PositionId, TokenRef, UserId};

/// Live summary of an actor document. Derived fresh on every lookup and
/// never cached, so it reflects the referenced actor's current state.
#[derive(Debug, Clone)]
pub struct ActorSummary {
    /// Document id of the actor.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Portrait image path, if any.
    pub img: Option<String>,
    /// Actor kind label (e.g. `character`, `npc`).
    pub kind: String,
    /// Current hit points.
    pub hp: i32,
    /// Hit point maximum.
    pub hp_max: i32,
}

/// A connected end user as the host session reports it.
#[derive(Debug, Clone)]
pub struct UserInfo {
    /// Session-unique user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Whether the user holds blanket elevated permissions. Administrators
    /// are exempt from all grant/revoke bookkeeping.
    pub is_admin: bool,
}

/// An item embedded in the vehicle document, with the module's two mount
/// flags joined in at read time.
#[derive(Debug, Clone)]
pub struct ItemDoc {
    /// Document id of the item.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Item kind label (e.g. `weapon`, `armor`, `ammo`).
    pub kind: String,
    /// Icon image path, if any.
    pub img: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Position this weapon is mounted to, if any. May dangle after the
    /// position is deleted; readers treat a dangling id as unmounted.
    pub mounted_position: Option<PositionId>,
    /// Whether this upgrade is mounted to the vehicle.
    pub mounted: bool,
}

/// Addressable documents for permission reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocRef {
    /// The vehicle actor document this host handle is bound to.
    Vehicle,
    /// Some other actor document (typically an occupant).
    Actor(ActorRef),
    /// A token document, live or prototype.
    Token(TokenRef),
}

/// The module's view of the host document store, bound to one vehicle.
///
/// Lookup methods resolve stale or deleted references to `None`; only
/// infrastructure failures surface as [`HostError`]. All permission
/// levels follow the host's document tiers ([`PermissionLevel`]).
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Read the module-scoped flag blob from the vehicle document.
    /// `None` means the flag has never been written.
    async fn read_state(&self) -> Result<Option<Value>, HostError>;

    /// Atomically replace the module-scoped flag blob.
    async fn write_state(&self, state: Value) -> Result<(), HostError>;

    /// Resolve an occupant reference to a live actor summary.
    async fn resolve_actor(&self, actor: &ActorRef) -> Result<Option<ActorSummary>, HostError>;

    /// Live token instances of the given actor.
    async fn actor_tokens(&self, actor: &ActorRef) -> Result<Vec<TokenRef>, HostError>;

    /// Live token instances of the vehicle itself.
    async fn vehicle_tokens(&self) -> Result<Vec<TokenRef>, HostError>;

    /// The vehicle's template token, used to pre-grant control when no
    /// live token has been placed yet.
    async fn prototype_token(&self) -> Result<Option<TokenRef>, HostError>;

    /// All users known to the session.
    async fn users(&self) -> Result<Vec<UserInfo>, HostError>;

    /// Permission level a user holds on a document.
    async fn permission(&self, doc: &DocRef, user: &UserId)
        -> Result<PermissionLevel, HostError>;

    /// Set a user's permission level on a document.
    async fn set_permission(
        &self,
        doc: &DocRef,
        user: &UserId,
        level: PermissionLevel,
    ) -> Result<(), HostError>;

    /// Items embedded in the vehicle document.
    async fn items(&self) -> Result<Vec<ItemDoc>, HostError>;

    /// Write or clear the mounted-position flag on a weapon item.
    async fn set_mounted_position(
        &self,
        item: &ItemId,
        position: Option<&PositionId>,
    ) -> Result<(), HostError>;

    /// Write the mounted flag on an upgrade item.
    async fn set_upgrade_mounted(&self, item: &ItemId, mounted: bool) -> Result<(), HostError>;
}
