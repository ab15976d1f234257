//! Permission propagation for seated occupants.
//!
//! Seating changes do not touch permissions directly; they schedule a
//! per-occupant debounced reconciliation so only the vehicle's current
//! occupants end up holding access. Reconciliation is best-effort and
//! eventually consistent: failures are logged and never roll back the
//! seating change that triggered them.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::host::{ActorSummary, DocRef, HostPlatform, UserInfo};
use crate::models::{ActorRef, PermissionLevel, PositionId, TokenRef, UserId, VehicleState};

/// Applies permission grants and revocations derived from occupancy.
#[derive(Clone)]
pub struct AccessController {
    host: Arc<dyn HostPlatform>,
}

impl AccessController {
    /// Create a controller operating through the given host.
    pub fn new(host: Arc<dyn HostPlatform>) -> Self {
        Self { host }
    }

    /// Resolve the end user who drives this actor.
    ///
    /// Non-administrator users are considered first so that a seated
    /// player, not the game master, receives the grant when both would
    /// qualify. Within each user, control over a live token instance
    /// counts before ownership of the actor document itself.
    pub async fn resolve_owning_user(&self, actor: &ActorRef) -> Result<Option<UserInfo>> {
        let users = self.host.users().await.context("user roster lookup failed")?;
        let tokens = self.actor_tokens_or_empty(actor).await;

        let (players, admins): (Vec<_>, Vec<_>) =
            users.into_iter().partition(|user| !user.is_admin);

        for user in players.iter().chain(admins.iter()) {
            for token in &tokens {
                if self.level_or_none(&DocRef::Token(token.clone()), &user.id).await
                    >= PermissionLevel::Owner
                {
                    return Ok(Some(user.clone()));
                }
            }
            if self.level_or_none(&DocRef::Actor(actor.clone()), &user.id).await
                >= PermissionLevel::Owner
            {
                return Ok(Some(user.clone()));
            }
        }

        Ok(None)
    }

    /// Grant the occupant's owning user access to the vehicle.
    ///
    /// Ensures at least observer level on the vehicle document, and full
    /// control on its live tokens (or the prototype token when none are
    /// placed yet) when the seated position grants token control. All
    /// writes are upgrade-only. Administrators and unowned actors are
    /// left untouched.
    pub async fn grant(&self, occupant: &ActorRef, position: &PositionId) -> Result<()> {
        if self.resolve_or_absent(occupant).await.is_none() {
            return Ok(());
        }
        let Some(user) = self.resolve_owning_user(occupant).await? else {
            debug!(%occupant, "no owning user, skipping grant");
            return Ok(());
        };
        if user.is_admin {
            return Ok(());
        }

        // An occupant can reference a deleted position; that still earns
        // sheet access, just not token control.
        let state = self.current_state().await?;
        let grants_token_control = state
            .position(position)
            .map(|p| p.grants_token_control)
            .unwrap_or(false);

        self.raise(&DocRef::Vehicle, &user.id, PermissionLevel::Observer)
            .await?;

        if grants_token_control {
            for token in self.vehicle_token_docs().await? {
                self.raise(&DocRef::Token(token), &user.id, PermissionLevel::Owner)
                    .await?;
            }
        }

        info!(user = %user.name, %occupant, "granted vehicle access");
        Ok(())
    }

    /// Revoke the occupant's owning user's access to the vehicle.
    ///
    /// Skipped entirely while the same user still has another character
    /// seated anywhere in the vehicle. Otherwise the user's level on the
    /// vehicle document and its live/prototype tokens drops to none,
    /// skipping documents already there.
    pub async fn revoke(&self, occupant: &ActorRef) -> Result<()> {
        if self.resolve_or_absent(occupant).await.is_none() {
            return Ok(());
        }
        let Some(user) = self.resolve_owning_user(occupant).await? else {
            return Ok(());
        };
        if user.is_admin {
            return Ok(());
        }

        let state = self.current_state().await?;
        for other in state.occupants() {
            if other == occupant {
                continue;
            }
            if self.resolve_or_absent(other).await.is_none() {
                continue;
            }
            let owner = self.resolve_owning_user(other).await?;
            if owner.map(|u| u.id) == Some(user.id.clone()) {
                info!(user = %user.name, "user still has a seated character, keeping access");
                return Ok(());
            }
        }

        self.drop_to_none(&DocRef::Vehicle, &user.id).await?;
        for token in self.vehicle_token_docs().await? {
            self.drop_to_none(&DocRef::Token(token), &user.id).await?;
        }

        info!(user = %user.name, "revoked vehicle access");
        Ok(())
    }

    async fn current_state(&self) -> Result<VehicleState> {
        let blob = self
            .host
            .read_state()
            .await
            .context("failed to read vehicle state")?;
        VehicleState::decode(blob).context("failed to decode vehicle state")
    }

    /// Live vehicle tokens, or the prototype token when none are placed
    /// yet so control is pre-granted for future placements.
    async fn vehicle_token_docs(&self) -> Result<Vec<TokenRef>> {
        let mut tokens = self
            .host
            .vehicle_tokens()
            .await
            .context("vehicle token lookup failed")?;
        if tokens.is_empty() {
            if let Some(prototype) = self
                .host
                .prototype_token()
                .await
                .context("prototype token lookup failed")?
            {
                tokens.push(prototype);
            }
        }
        Ok(tokens)
    }

    async fn raise(&self, doc: &DocRef, user: &UserId, target: PermissionLevel) -> Result<()> {
        let current = self
            .host
            .permission(doc, user)
            .await
            .context("permission lookup failed")?;
        if current >= target {
            return Ok(());
        }
        self.host
            .set_permission(doc, user, target)
            .await
            .context("permission write failed")?;
        debug!(?doc, user = user.as_str(), ?target, "raised permission");
        Ok(())
    }

    async fn drop_to_none(&self, doc: &DocRef, user: &UserId) -> Result<()> {
        let current = self
            .host
            .permission(doc, user)
            .await
            .context("permission lookup failed")?;
        if current == PermissionLevel::None {
            return Ok(());
        }
        self.host
            .set_permission(doc, user, PermissionLevel::None)
            .await
            .context("permission write failed")?;
        debug!(?doc, user = user.as_str(), "dropped permission");
        Ok(())
    }

    async fn resolve_or_absent(&self, actor: &ActorRef) -> Option<ActorSummary> {
        match self.host.resolve_actor(actor).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%actor, "actor lookup failed, treating as absent: {err}");
                None
            }
        }
    }

    async fn actor_tokens_or_empty(&self, actor: &ActorRef) -> Vec<TokenRef> {
        match self.host.actor_tokens(actor).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(%actor, "token lookup failed, treating as none: {err}");
                Vec::new()
            }
        }
    }

    async fn level_or_none(&self, doc: &DocRef, user: &UserId) -> PermissionLevel {
        match self.host.permission(doc, user).await {
            Ok(level) => level,
            Err(err) => {
                warn!(?doc, "permission lookup failed, treating as none: {err}");
                PermissionLevel::None
            }
        }
    }
}

#[derive(Debug, Clone)]
enum AccessChange {
    Grant { position: PositionId },
    Revoke,
}

struct PendingChange {
    seq: u64,
    handle: JoinHandle<()>,
}

struct DebouncerInner {
    controller: AccessController,
    delay: Duration,
    seq: AtomicU64,
    pending: Mutex<HashMap<ActorRef, PendingChange>>,
}

/// Coalesces bursty seating changes into one reconciliation per
/// occupant reference.
///
/// Scheduling a change cancels any still-pending timer for the same
/// occupant, so a remove immediately followed by an add nets out to a
/// single grant instead of a revoke/grant flicker. At most one
/// reconciliation is pending per occupant at a time.
#[derive(Clone)]
pub struct AccessDebouncer {
    inner: Arc<DebouncerInner>,
}

impl AccessDebouncer {
    /// Create a debouncer applying changes through the given host after
    /// `delay`. Must be used within a tokio runtime.
    pub fn new(host: Arc<dyn HostPlatform>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                controller: AccessController::new(host),
                delay,
                seq: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Schedule a debounced grant for an occupant seated at `position`.
    pub fn schedule_grant(&self, occupant: ActorRef, position: PositionId) {
        self.schedule(occupant, AccessChange::Grant { position });
    }

    /// Schedule a debounced revoke for an occupant that left the vehicle.
    pub fn schedule_revoke(&self, occupant: ActorRef) {
        self.schedule(occupant, AccessChange::Revoke);
    }

    /// Number of occupants with a reconciliation still pending.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Cancel every pending reconciliation, e.g. when the sheet closes.
    pub fn cancel_all(&self) {
        let mut pending = self.inner.pending.lock();
        for (_, change) in pending.drain() {
            change.handle.abort();
        }
    }

    fn schedule(&self, occupant: ActorRef, change: AccessChange) {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let key = occupant.clone();

        // Holding the lock across the spawn keeps the task's cleanup
        // ordered after our insert even at a zero delay.
        let mut pending = self.inner.pending.lock();
        let handle = tokio::spawn({
            let inner = Arc::clone(&self.inner);
            async move {
                tokio::time::sleep(inner.delay).await;
                let result = match &change {
                    AccessChange::Grant { position } => {
                        inner.controller.grant(&occupant, position).await
                    }
                    AccessChange::Revoke => inner.controller.revoke(&occupant).await,
                };
                if let Err(err) = result {
                    warn!(%occupant, "access reconciliation failed: {err:#}");
                }
                let mut pending = inner.pending.lock();
                if pending.get(&occupant).map(|p| p.seq) == Some(seq) {
                    pending.remove(&occupant);
                }
            }
        });
        if let Some(previous) = pending.insert(key, PendingChange { seq, handle }) {
            previous.handle.abort();
        }
    }
}
