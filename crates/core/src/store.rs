//! Seating mutations over the persisted position list.
//!
//! Every operation is a copy-on-write read-modify-write against the
//! module's flag blob: read, apply exactly one logical change, write the
//! result. There is no optimistic-concurrency check; two clients racing
//! on the same vehicle lose to last-write-wins, which the clamped and
//! idempotent mutations degrade under gracefully.
//!
//! Validation rejections come back as outcome values for the caller to
//! surface; missing ids are silent no-ops.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::access::AccessDebouncer;
use crate::host::HostPlatform;
use crate::models::{ActorRef, Position, PositionId, VehicleState};
use crate::rules;

/// Result of seating an occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Seated within the configured capacity.
    Seated,
    /// Seated beyond `max_occupants` but within the hard ceiling; worth
    /// a warning, not a rejection.
    Crammed,
    /// The target already holds the hard-ceiling count. Nothing changed.
    Rejected,
    /// The target position id does not exist. Nothing changed.
    PositionNotFound,
}

/// Result of moving an occupant between positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved within the target's configured capacity.
    Moved,
    /// Moved, but the target is now crammed.
    MovedCrammed,
    /// The target is at the hard ceiling; the occupant stays seated in
    /// the source position.
    TargetFull,
    /// Source equals target, or the target does not exist. Nothing
    /// changed.
    Unchanged,
}

/// Direction of a glass integrity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlassChange {
    /// The delta was zero or negative.
    Damaged,
    /// The delta was positive.
    Repaired,
}

/// Outcome of a glass integrity adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlassUpdate {
    /// Clamped value after the change.
    pub value: u32,
    /// The position's glass ceiling.
    pub max: u32,
    /// Whether the change read as damage or repair.
    pub kind: GlassChange,
}

/// Field updates applied by the position edit form. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct PositionPatch {
    /// New display label.
    pub name: Option<String>,
    /// New display rank.
    pub order: Option<i64>,
    /// New configured capacity; clamped to at least 1.
    pub max_occupants: Option<u32>,
    /// Whether the position appears as a weapon mount target.
    pub can_control_weapons: Option<bool>,
    /// Whether occupancy grants token-level vehicle control.
    pub grants_token_control: Option<bool>,
    /// New comma-separated skill list.
    pub skills: Option<String>,
    /// Toggle glass integrity tracking.
    pub bulletproof_glass: Option<bool>,
    /// New glass ceiling; only meaningful while glass is tracked.
    pub glass_hp_max: Option<u32>,
}

/// Owns read-modify-write access to the persisted seating state and
/// feeds the access debouncer on every occupancy change.
pub struct PositionStore {
    host: Arc<dyn HostPlatform>,
    access: AccessDebouncer,
}

impl PositionStore {
    /// Create a store over the given host, reporting occupancy changes
    /// to `access`.
    pub fn new(host: Arc<dyn HostPlatform>, access: AccessDebouncer) -> Self {
        Self { host, access }
    }

    /// Read the current state; a never-written flag reads as the empty
    /// state.
    pub async fn read(&self) -> Result<VehicleState> {
        let blob = self
            .host
            .read_state()
            .await
            .context("failed to read vehicle state")?;
        VehicleState::decode(blob).context("failed to decode vehicle state")
    }

    /// Atomically replace the persisted state.
    pub async fn write(&self, state: &VehicleState) -> Result<()> {
        let blob = state.encode().context("failed to encode vehicle state")?;
        self.host
            .write_state(blob)
            .await
            .context("failed to write vehicle state")
    }

    /// Append a new position with default field values and the next
    /// display rank.
    pub async fn add_position(&self) -> Result<Position> {
        let mut state = self.read().await?;
        let position = Position::new("New Position", state.positions.len() as i64 + 1);
        state.positions.push(position.clone());
        self.write(&state).await?;
        info!(position = %position.id, "added position");
        Ok(position)
    }

    /// Apply field updates to a position. Unknown ids are a silent
    /// no-op.
    ///
    /// Glass handling: while `bulletproof_glass` ends up on, the ceiling
    /// is updated and `glass_hp` is initialised to the ceiling when
    /// currently zero, otherwise clamped to it. Turning tracking off
    /// resets both fields to zero, so re-enabling starts from a fresh
    /// pane.
    pub async fn edit_position(&self, id: &PositionId, patch: PositionPatch) -> Result<()> {
        let mut state = self.read().await?;
        let Some(position) = state.position_mut(id) else {
            debug!(position = %id, "edit of unknown position ignored");
            return Ok(());
        };

        if let Some(name) = patch.name {
            position.name = name;
        }
        if let Some(order) = patch.order {
            position.order = order;
        }
        if let Some(max_occupants) = patch.max_occupants {
            position.max_occupants = max_occupants.max(1);
        }
        if let Some(can_control_weapons) = patch.can_control_weapons {
            position.can_control_weapons = can_control_weapons;
        }
        if let Some(grants_token_control) = patch.grants_token_control {
            position.grants_token_control = grants_token_control;
        }
        if let Some(skills) = patch.skills {
            position.skills = skills;
        }

        let tracked = patch.bulletproof_glass.unwrap_or(position.bulletproof_glass);
        position.bulletproof_glass = tracked;
        if tracked {
            let max = patch.glass_hp_max.unwrap_or(position.glass_hp_max);
            position.glass_hp_max = max;
            position.glass_hp = if position.glass_hp == 0 {
                max
            } else {
                position.glass_hp.min(max)
            };
        } else {
            position.glass_hp = 0;
            position.glass_hp_max = 0;
        }

        self.write(&state).await
    }

    /// Remove a position. Occupant and weapon-mount references pointing
    /// at it are left to dangle; readers treat them as "no position".
    pub async fn delete_position(&self, id: &PositionId) -> Result<()> {
        let mut state = self.read().await?;
        let before = state.positions.len();
        state.positions.retain(|p| &p.id != id);
        if state.positions.len() == before {
            debug!(position = %id, "delete of unknown position ignored");
            return Ok(());
        }
        self.write(&state).await?;
        info!(position = %id, "deleted position");
        Ok(())
    }

    /// Seat an occupant at a position, unseating it everywhere else
    /// first. Rejected without any state change when the target already
    /// holds the hard-ceiling count.
    pub async fn assign_occupant(
        &self,
        occupant: &ActorRef,
        target: &PositionId,
    ) -> Result<AssignOutcome> {
        let mut state = self.read().await?;
        state.unseat_everywhere(occupant);

        let Some(position) = state.position_mut(target) else {
            debug!(position = %target, "assignment to unknown position ignored");
            return Ok(AssignOutcome::PositionNotFound);
        };
        if !rules::can_accept(position) {
            return Ok(AssignOutcome::Rejected);
        }

        position.occupants.push(occupant.clone());
        let crammed = rules::is_crammed(position);
        self.write(&state).await?;

        self.access.schedule_grant(occupant.clone(), target.clone());
        info!(%occupant, position = %target, crammed, "seated occupant");
        Ok(if crammed {
            AssignOutcome::Crammed
        } else {
            AssignOutcome::Seated
        })
    }

    /// Unseat an occupant from a position. A complete no-op (no write,
    /// no revoke) when the occupant is not seated there.
    pub async fn remove_occupant(&self, occupant: &ActorRef, position: &PositionId) -> Result<bool> {
        let mut state = self.read().await?;
        let Some(found) = state.position_mut(position) else {
            debug!(position = %position, "removal from unknown position ignored");
            return Ok(false);
        };

        let before = found.occupants.len();
        found.occupants.retain(|o| o != occupant);
        if found.occupants.len() == before {
            return Ok(false);
        }

        self.write(&state).await?;
        self.access.schedule_revoke(occupant.clone());
        info!(%occupant, position = %position, "unseated occupant");
        Ok(true)
    }

    /// Move an occupant between positions as a single logical change.
    /// When the target is at the hard ceiling the move aborts and the
    /// occupant stays seated in the source position.
    pub async fn move_occupant(
        &self,
        occupant: &ActorRef,
        from: &PositionId,
        to: &PositionId,
    ) -> Result<MoveOutcome> {
        if from == to {
            return Ok(MoveOutcome::Unchanged);
        }

        let mut state = self.read().await?;
        let accepts = match state.position(to) {
            Some(target) => rules::can_accept(target),
            None => {
                debug!(position = %to, "move to unknown position ignored");
                return Ok(MoveOutcome::Unchanged);
            }
        };
        if !accepts {
            return Ok(MoveOutcome::TargetFull);
        }

        if let Some(source) = state.position_mut(from) {
            source.occupants.retain(|o| o != occupant);
        }
        let Some(target) = state.position_mut(to) else {
            return Ok(MoveOutcome::Unchanged);
        };
        target.occupants.push(occupant.clone());
        let crammed = rules::is_crammed(target);
        self.write(&state).await?;

        // One net reconciliation against the destination; the debouncer
        // collapses it with any change still pending for this occupant.
        self.access.schedule_grant(occupant.clone(), to.clone());
        info!(%occupant, from = %from, to = %to, crammed, "moved occupant");
        Ok(if crammed {
            MoveOutcome::MovedCrammed
        } else {
            MoveOutcome::Moved
        })
    }

    /// Adjust a position's glass integrity by a signed delta, clamped
    /// into `0..=glass_hp_max`. `None` when the position does not exist.
    pub async fn update_glass_hp(
        &self,
        position: &PositionId,
        delta: i64,
    ) -> Result<Option<GlassUpdate>> {
        let mut state = self.read().await?;
        let Some(found) = state.position_mut(position) else {
            debug!(position = %position, "glass update for unknown position ignored");
            return Ok(None);
        };

        found.glass_hp = rules::clamp_glass(i64::from(found.glass_hp) + delta, found.glass_hp_max);
        let update = GlassUpdate {
            value: found.glass_hp,
            max: found.glass_hp_max,
            kind: if delta > 0 {
                GlassChange::Repaired
            } else {
                GlassChange::Damaged
            },
        };

        self.write(&state).await?;
        info!(position = %position, value = update.value, max = update.max, "glass updated");
        Ok(Some(update))
    }
}
