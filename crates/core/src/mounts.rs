//! Weapon and upgrade mount relations.
//!
//! Mounting lives as flags on the item documents: a weapon carries the
//! id of the position it is mounted to, an upgrade a plain boolean.
//! Positions never enumerate their weapons; the two relations are joined
//! by position id at read time, so deleting a position simply leaves its
//! weapons dangling and they render as unmounted.

use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::config::{ModuleConfig, DEFAULT_UPGRADE_KEYWORDS};
use crate::host::{HostPlatform, ItemDoc};
use crate::models::{ActorRef, ItemId, Position, PositionId, VehicleState};

/// Item kind label of mountable weapons.
pub const WEAPON_KIND: &str = "weapon";

/// Item kind label of mountable upgrades.
pub const UPGRADE_KIND: &str = "itemUpgrade";

/// Result of a mount attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Flag written; the item is now mounted.
    Mounted,
    /// The item id does not exist on the vehicle. Nothing changed.
    ItemNotFound,
    /// The target position does not exist or cannot control weapons.
    /// Nothing changed.
    PositionNotCapable,
    /// The item's description matches no vehicle keyword. Nothing
    /// changed.
    Incompatible,
}

/// Result of resolving who fires a mounted weapon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorLookup {
    /// First occupant of the weapon's position.
    Operator(ActorRef),
    /// The item id does not exist on the vehicle.
    UnknownItem,
    /// The item carries no mounted-position flag.
    NotMounted,
    /// The flagged position no longer exists; treated as unmounted.
    OrphanedPosition,
    /// The position exists but nobody is seated there.
    Unoccupied,
}

static DEFAULT_MATCHER: Lazy<Regex> = Lazy::new(|| {
    keyword_pattern(
        &DEFAULT_UPGRADE_KEYWORDS
            .iter()
            .map(|kw| kw.to_string())
            .collect::<Vec<_>>(),
    )
    .expect("failed to compile default upgrade keywords")
});

fn keyword_pattern(keywords: &[String]) -> Result<Regex, regex::Error> {
    let escaped = keywords
        .iter()
        .map(|kw| regex::escape(kw))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){escaped}"))
}

/// Recognises vehicle upgrades by their free-text description.
///
/// This mirrors the sheet's historical behaviour: a case-insensitive
/// substring match of any configured keyword. It is a heuristic, not a
/// structured type check, and can misclassify items whose descriptions
/// merely mention a vehicle type; the keyword list is configurable for
/// exactly that reason.
#[derive(Debug, Clone)]
pub struct UpgradeMatcher {
    pattern: Regex,
}

impl UpgradeMatcher {
    /// Compile a matcher from a keyword list.
    pub fn new(keywords: &[String]) -> Result<Self> {
        anyhow::ensure!(!keywords.is_empty(), "upgrade keyword list is empty");
        let pattern = keyword_pattern(keywords).context("failed to compile upgrade keywords")?;
        Ok(Self { pattern })
    }

    /// Whether the description reads as a vehicle upgrade.
    pub fn matches(&self, description: &str) -> bool {
        self.pattern.is_match(description)
    }
}

impl Default for UpgradeMatcher {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_MATCHER.clone(),
        }
    }
}

/// Maintains the item-side mount flags against the current seating
/// state.
pub struct MountManager {
    host: Arc<dyn HostPlatform>,
    matcher: UpgradeMatcher,
}

impl MountManager {
    /// Create a manager over the given host with the default keyword
    /// matcher.
    pub fn new(host: Arc<dyn HostPlatform>) -> Self {
        Self::with_matcher(host, UpgradeMatcher::default())
    }

    /// Create a manager with a configured matcher.
    pub fn with_matcher(host: Arc<dyn HostPlatform>, matcher: UpgradeMatcher) -> Self {
        Self { host, matcher }
    }

    /// Create a manager using the configured keyword list.
    pub fn from_config(host: Arc<dyn HostPlatform>, config: &ModuleConfig) -> Result<Self> {
        let matcher = UpgradeMatcher::new(&config.upgrade_keywords)?;
        Ok(Self::with_matcher(host, matcher))
    }

    /// Positions a weapon may be mounted to.
    pub fn mount_targets(state: &VehicleState) -> Vec<&Position> {
        state
            .positions
            .iter()
            .filter(|p| p.can_control_weapons)
            .collect()
    }

    /// Mount a weapon to a weapon-capable position.
    pub async fn mount_weapon(
        &self,
        item: &ItemId,
        position: &PositionId,
        state: &VehicleState,
    ) -> Result<MountOutcome> {
        let capable = state
            .position(position)
            .map(|p| p.can_control_weapons)
            .unwrap_or(false);
        if !capable {
            return Ok(MountOutcome::PositionNotCapable);
        }
        let Some(weapon) = self.find_item(item).await? else {
            return Ok(MountOutcome::ItemNotFound);
        };

        self.host
            .set_mounted_position(&weapon.id, Some(position))
            .await
            .context("failed to write mounted position")?;
        info!(item = %weapon.name, position = %position, "mounted weapon");
        Ok(MountOutcome::Mounted)
    }

    /// Clear a weapon's mount flag. Silent no-op for unknown items.
    pub async fn unmount_weapon(&self, item: &ItemId) -> Result<()> {
        let Some(weapon) = self.find_item(item).await? else {
            return Ok(());
        };
        self.host
            .set_mounted_position(&weapon.id, None)
            .await
            .context("failed to clear mounted position")?;
        info!(item = %weapon.name, "unmounted weapon");
        Ok(())
    }

    /// Mount an upgrade after checking description compatibility.
    pub async fn mount_upgrade(&self, item: &ItemId) -> Result<MountOutcome> {
        let Some(upgrade) = self.find_item(item).await? else {
            return Ok(MountOutcome::ItemNotFound);
        };
        if !self.matcher.matches(&upgrade.description) {
            return Ok(MountOutcome::Incompatible);
        }

        self.host
            .set_upgrade_mounted(&upgrade.id, true)
            .await
            .context("failed to write upgrade mount")?;
        info!(item = %upgrade.name, "mounted upgrade");
        Ok(MountOutcome::Mounted)
    }

    /// Clear an upgrade's mount flag. Silent no-op for unknown items.
    pub async fn unmount_upgrade(&self, item: &ItemId) -> Result<()> {
        let Some(upgrade) = self.find_item(item).await? else {
            return Ok(());
        };
        self.host
            .set_upgrade_mounted(&upgrade.id, false)
            .await
            .context("failed to clear upgrade mount")?;
        info!(item = %upgrade.name, "unmounted upgrade");
        Ok(())
    }

    /// Resolve the actor who operates a mounted weapon: the first
    /// occupant of the weapon's position.
    pub async fn weapon_operator(
        &self,
        item: &ItemId,
        state: &VehicleState,
    ) -> Result<OperatorLookup> {
        let Some(weapon) = self.find_item(item).await? else {
            return Ok(OperatorLookup::UnknownItem);
        };
        let Some(position_id) = weapon.mounted_position else {
            return Ok(OperatorLookup::NotMounted);
        };
        let Some(position) = state.position(&position_id) else {
            return Ok(OperatorLookup::OrphanedPosition);
        };
        match position.occupants.first() {
            Some(operator) => Ok(OperatorLookup::Operator(operator.clone())),
            None => Ok(OperatorLookup::Unoccupied),
        }
    }

    async fn find_item(&self, item: &ItemId) -> Result<Option<ItemDoc>> {
        let items = self.host.items().await.context("item lookup failed")?;
        Ok(items.into_iter().find(|i| &i.id == item))
    }
}
