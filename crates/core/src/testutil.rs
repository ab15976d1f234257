//! In-memory host platform shared by the crate's tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::error::HostError;
use crate::host::{ActorSummary, DocRef, HostPlatform, ItemDoc, UserInfo};
use crate::models::{
    ActorRef, ItemId, PermissionLevel, PositionId, TokenRef, UserId, VehicleState,
};

/// Scriptable [`HostPlatform`] backed by hash maps, with a journal of
/// permission writes so tests can assert that no redundant write ever
/// happens.
#[derive(Default)]
pub struct MemoryPlatform {
    counter: AtomicUsize,
    state: Mutex<Option<Value>>,
    state_writes: AtomicUsize,
    actors: Mutex<HashMap<ActorRef, ActorSummary>>,
    actor_tokens: Mutex<HashMap<ActorRef, Vec<TokenRef>>>,
    vehicle_tokens: Mutex<Vec<TokenRef>>,
    prototype: Mutex<Option<TokenRef>>,
    users: Mutex<Vec<UserInfo>>,
    permissions: Mutex<HashMap<(DocRef, UserId), PermissionLevel>>,
    permission_writes: Mutex<Vec<(DocRef, UserId, PermissionLevel)>>,
    items: Mutex<Vec<ItemDoc>>,
}

impl MemoryPlatform {
    /// Fresh platform with no documents and no users.
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Self::default()
    }

    fn next_id(&self) -> usize {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Replace the stored flag blob directly, bypassing the write
    /// counter.
    pub fn seed_state(&self, state: VehicleState) {
        let blob = state.encode().expect("encode state");
        *self.state.lock() = Some(blob);
    }

    /// Decode the currently stored flag blob.
    pub fn current_state(&self) -> VehicleState {
        VehicleState::decode(self.state.lock().clone()).expect("decode state")
    }

    /// Number of `write_state` calls observed.
    pub fn state_write_count(&self) -> usize {
        self.state_writes.load(Ordering::Relaxed)
    }

    /// Register an actor and return its reference.
    pub fn add_actor(&self, name: &str) -> ActorRef {
        let n = self.next_id();
        let actor = ActorRef::new(format!("Actor.{n}"));
        self.actors.lock().insert(
            actor.clone(),
            ActorSummary {
                id: format!("a{n}"),
                name: name.to_string(),
                img: None,
                kind: "character".to_string(),
                hp: 25,
                hp_max: 30,
            },
        );
        actor
    }

    /// Register a live token for an actor.
    pub fn add_actor_token(&self, actor: &ActorRef, id: &str) -> TokenRef {
        let token = TokenRef::new(id);
        self.actor_tokens
            .lock()
            .entry(actor.clone())
            .or_default()
            .push(token.clone());
        token
    }

    /// Register a live token of the vehicle itself.
    pub fn add_vehicle_token(&self, id: &str) -> TokenRef {
        let token = TokenRef::new(id);
        self.vehicle_tokens.lock().push(token.clone());
        token
    }

    /// Set the vehicle's prototype token.
    pub fn set_prototype_token(&self, id: &str) -> TokenRef {
        let token = TokenRef::new(id);
        *self.prototype.lock() = Some(token.clone());
        token
    }

    /// Register a user and return its id.
    pub fn add_user(&self, name: &str, is_admin: bool) -> UserId {
        let id = UserId::new(format!("User.{}", self.next_id()));
        self.users.lock().push(UserInfo {
            id: id.clone(),
            name: name.to_string(),
            is_admin,
        });
        id
    }

    /// Set a permission level directly, bypassing the journal.
    pub fn grant_raw(&self, doc: DocRef, user: UserId, level: PermissionLevel) {
        self.permissions.lock().insert((doc, user), level);
    }

    /// Current permission level for a document/user pair.
    pub fn level(&self, doc: &DocRef, user: &UserId) -> PermissionLevel {
        self.permissions
            .lock()
            .get(&(doc.clone(), user.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Every `set_permission` call observed, in order.
    pub fn permission_writes(&self) -> Vec<(DocRef, UserId, PermissionLevel)> {
        self.permission_writes.lock().clone()
    }

    /// Register an item on the vehicle.
    pub fn add_item(&self, name: &str, kind: &str, description: &str) -> ItemId {
        let id = ItemId::new(format!("Item.{}", self.next_id()));
        self.items.lock().push(ItemDoc {
            id: id.clone(),
            name: name.to_string(),
            kind: kind.to_string(),
            img: None,
            description: description.to_string(),
            mounted_position: None,
            mounted: false,
        });
        id
    }

    /// Set a weapon's mount flag directly.
    pub fn flag_mounted_position(&self, item: &ItemId, position: &PositionId) {
        let mut items = self.items.lock();
        if let Some(found) = items.iter_mut().find(|i| &i.id == item) {
            found.mounted_position = Some(position.clone());
        }
    }

    /// Set an upgrade's mount flag directly.
    pub fn flag_upgrade_mounted(&self, item: &ItemId) {
        let mut items = self.items.lock();
        if let Some(found) = items.iter_mut().find(|i| &i.id == item) {
            found.mounted = true;
        }
    }

    /// Snapshot of all items with their current flags.
    pub fn items_snapshot(&self) -> Vec<ItemDoc> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl HostPlatform for MemoryPlatform {
    async fn read_state(&self) -> Result<Option<Value>, HostError> {
        Ok(self.state.lock().clone())
    }

    async fn write_state(&self, state: Value) -> Result<(), HostError> {
        *self.state.lock() = Some(state);
        self.state_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn resolve_actor(&self, actor: &ActorRef) -> Result<Option<ActorSummary>, HostError> {
        Ok(self.actors.lock().get(actor).cloned())
    }

    async fn actor_tokens(&self, actor: &ActorRef) -> Result<Vec<TokenRef>, HostError> {
        Ok(self
            .actor_tokens
            .lock()
            .get(actor)
            .cloned()
            .unwrap_or_default())
    }

    async fn vehicle_tokens(&self) -> Result<Vec<TokenRef>, HostError> {
        Ok(self.vehicle_tokens.lock().clone())
    }

    async fn prototype_token(&self) -> Result<Option<TokenRef>, HostError> {
        Ok(self.prototype.lock().clone())
    }

    async fn users(&self) -> Result<Vec<UserInfo>, HostError> {
        Ok(self.users.lock().clone())
    }

    async fn permission(
        &self,
        doc: &DocRef,
        user: &UserId,
    ) -> Result<PermissionLevel, HostError> {
        Ok(self.level(doc, user))
    }

    async fn set_permission(
        &self,
        doc: &DocRef,
        user: &UserId,
        level: PermissionLevel,
    ) -> Result<(), HostError> {
        self.permission_writes
            .lock()
            .push((doc.clone(), user.clone(), level));
        self.permissions
            .lock()
            .insert((doc.clone(), user.clone()), level);
        Ok(())
    }

    async fn items(&self) -> Result<Vec<ItemDoc>, HostError> {
        Ok(self.items.lock().clone())
    }

    async fn set_mounted_position(
        &self,
        item: &ItemId,
        position: Option<&PositionId>,
    ) -> Result<(), HostError> {
        let mut items = self.items.lock();
        let found = items
            .iter_mut()
            .find(|i| &i.id == item)
            .ok_or_else(|| HostError::lookup(format!("unknown item {}", item.as_str())))?;
        found.mounted_position = position.cloned();
        Ok(())
    }

    async fn set_upgrade_mounted(&self, item: &ItemId, mounted: bool) -> Result<(), HostError> {
        let mut items = self.items.lock();
        let found = items
            .iter_mut()
            .find(|i| &i.id == item)
            .ok_or_else(|| HostError::lookup(format!("unknown item {}", item.as_str())))?;
        found.mounted = mounted;
        Ok(())
    }
}
