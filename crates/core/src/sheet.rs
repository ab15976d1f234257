//! Render-ready sheet data.
//!
//! A read-only join over the seating state, the item mount flags, and
//! live actor lookups. Nothing here mutates; the sheet template renders
//! the result directly.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::cargo::{self, CargoCategory};
use crate::host::{ActorSummary, DocRef, HostPlatform, ItemDoc};
use crate::models::{ActorRef, PermissionLevel, Position, UserId, VehicleState};
use crate::mounts::{UPGRADE_KIND, WEAPON_KIND};
use crate::rules;

const ARMOR_KIND: &str = "armor";

/// An occupant resolved live for display.
#[derive(Debug, Clone)]
pub struct OccupantView {
    /// The persisted reference.
    pub actor: ActorRef,
    /// Fresh summary of the referenced actor.
    pub summary: ActorSummary,
}

/// A position prepared for rendering.
#[derive(Debug, Clone)]
pub struct PositionView {
    /// The persisted position snapshot.
    pub position: Position,
    /// Occupants the viewer is allowed to see, resolved live.
    pub occupants: Vec<OccupantView>,
    /// Weapons mounted here, joined by the item-side position flag.
    pub weapons: Vec<ItemDoc>,
    /// Parsed skill names usable from this position.
    pub skills: Vec<String>,
    /// Whether any visible occupant is seated.
    pub has_occupants: bool,
    /// Configured capacity reached.
    pub is_full: bool,
    /// Configured capacity exceeded.
    pub is_crammed: bool,
}

/// Everything the vehicle sheet template needs.
#[derive(Debug, Clone)]
pub struct SheetData {
    /// Positions sorted by display rank.
    pub positions: Vec<PositionView>,
    /// All weapons on the vehicle, mounted or not.
    pub weapons: Vec<ItemDoc>,
    /// All armor on the vehicle.
    pub armor: Vec<ItemDoc>,
    /// Loose inventory grouped for the cargo tab.
    pub cargo: Vec<CargoCategory>,
    /// Upgrades currently mounted to the vehicle.
    pub upgrades: Vec<ItemDoc>,
}

/// Assembles [`SheetData`] for a viewing user.
pub struct SheetLoader {
    host: Arc<dyn HostPlatform>,
}

impl SheetLoader {
    /// Create a loader over the given host.
    pub fn new(host: Arc<dyn HostPlatform>) -> Self {
        Self { host }
    }

    /// Prepare the full sheet for `viewer`.
    ///
    /// Occupant references that no longer resolve are logged and
    /// skipped, as are occupants whose actor the viewer cannot observe.
    /// Weapons whose mounted position has been deleted appear in the
    /// weapons tab but under no position.
    pub async fn load(&self, viewer: &UserId) -> Result<SheetData> {
        let blob = self
            .host
            .read_state()
            .await
            .context("failed to read vehicle state")?;
        let state = VehicleState::decode(blob).context("failed to decode vehicle state")?;
        let items = self.host.items().await.context("item lookup failed")?;

        let mut positions = Vec::with_capacity(state.positions.len());
        for position in &state.positions {
            let occupants = self.resolve_occupants(position, viewer).await;
            let weapons: Vec<ItemDoc> = items
                .iter()
                .filter(|item| {
                    item.kind == WEAPON_KIND
                        && item.mounted_position.as_ref() == Some(&position.id)
                })
                .cloned()
                .collect();

            positions.push(PositionView {
                has_occupants: !occupants.is_empty(),
                is_full: rules::is_full(position),
                is_crammed: rules::is_crammed(position),
                skills: position.skill_list(),
                occupants,
                weapons,
                position: position.clone(),
            });
        }
        // Stable sort: equal ranks keep their storage order.
        positions.sort_by_key(|view| view.position.order);

        let weapons = items
            .iter()
            .filter(|item| item.kind == WEAPON_KIND)
            .cloned()
            .collect();
        let armor = items
            .iter()
            .filter(|item| item.kind == ARMOR_KIND)
            .cloned()
            .collect();
        let upgrades = items
            .iter()
            .filter(|item| item.kind == UPGRADE_KIND && item.mounted)
            .cloned()
            .collect();
        let cargo = cargo::classify(&cargo::cargo_items(&items));

        Ok(SheetData {
            positions,
            weapons,
            armor,
            cargo,
            upgrades,
        })
    }

    async fn resolve_occupants(&self, position: &Position, viewer: &UserId) -> Vec<OccupantView> {
        let mut occupants = Vec::new();
        for actor in &position.occupants {
            let summary = match self.host.resolve_actor(actor).await {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    warn!(%actor, "occupant not found, skipping");
                    continue;
                }
                Err(err) => {
                    warn!(%actor, "occupant lookup failed, skipping: {err}");
                    continue;
                }
            };

            let visible = match self
                .host
                .permission(&DocRef::Actor(actor.clone()), viewer)
                .await
            {
                Ok(level) => level >= PermissionLevel::Observer,
                Err(err) => {
                    warn!(%actor, "visibility check failed, hiding occupant: {err}");
                    false
                }
            };
            if visible {
                occupants.push(OccupantView {
                    actor: actor.clone(),
                    summary,
                });
            }
        }
        occupants
    }
}
