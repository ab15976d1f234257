//! Shared domain models.
//!
//! The persisted types mirror the flag blob stored on the vehicle
//! document, so serde field names follow the wire shape (`maxOccupants`,
//! `glassHpMax`, ...) rather than Rust convention.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque reference to an actor document, resolvable only by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRef(String);

impl ActorRef {
    /// Wrap a host-supplied reference string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a seating position, unique within a vehicle and stable
/// for the position's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(String);

impl PositionId {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a token document, live or prototype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRef(String);

impl TokenRef {
    /// Wrap a host-supplied token reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an item embedded in the vehicle document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap a host-supplied item identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of an end user known to the host session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a host-supplied user identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Document permission tiers of the host platform, lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// No access to the document.
    #[default]
    None,
    /// Partial visibility granted by the host.
    Limited,
    /// View-only access.
    Observer,
    /// Full control: the user can act as the document.
    Owner,
}

/// A named seating/mount slot on a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Unique within the vehicle, stable for the position's lifetime.
    pub id: PositionId,
    /// Display label.
    pub name: String,
    /// Display rank; not guaranteed unique or contiguous.
    #[serde(default)]
    pub order: i64,
    /// Configured capacity; a soft limit, see [`crate::rules`].
    #[serde(default = "default_max_occupants")]
    pub max_occupants: u32,
    /// Seated actors, in assignment order.
    #[serde(default)]
    pub occupants: Vec<ActorRef>,
    /// Whether this position appears as a mount target for weapons.
    #[serde(default)]
    pub can_control_weapons: bool,
    /// Whether occupying this position grants token-level vehicle control.
    #[serde(default)]
    pub grants_token_control: bool,
    /// Comma-separated skill names; parsed at read time, stored raw.
    #[serde(default)]
    pub skills: String,
    /// Whether glass integrity is tracked for this position.
    #[serde(default)]
    pub bulletproof_glass: bool,
    /// Current glass integrity, `0 <= glass_hp <= glass_hp_max`.
    #[serde(default)]
    pub glass_hp: u32,
    /// Glass integrity ceiling.
    #[serde(default)]
    pub glass_hp_max: u32,
}

fn default_max_occupants() -> u32 {
    1
}

impl Position {
    /// A freshly created position with default field values.
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            id: PositionId::generate(),
            name: name.into(),
            order,
            max_occupants: 1,
            occupants: Vec::new(),
            can_control_weapons: false,
            grants_token_control: false,
            skills: String::new(),
            bulletproof_glass: false,
            glass_hp: 0,
            glass_hp_max: 0,
        }
    }

    /// The `skills` field split into trimmed, non-empty entries.
    pub fn skill_list(&self) -> Vec<String> {
        self.skills
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Persisted seating state attached to the vehicle document under the
/// module's flag scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// All positions; display order comes from each position's `order`
    /// field, not from storage order.
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl VehicleState {
    /// Decode the host flag blob, treating a missing blob as the empty
    /// state (lazy creation on first access).
    pub fn decode(blob: Option<Value>) -> serde_json::Result<Self> {
        match blob {
            Some(value) => serde_json::from_value(value),
            None => Ok(Self::default()),
        }
    }

    /// Encode for storage as the module's flag blob.
    pub fn encode(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Look up a position by id.
    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| &p.id == id)
    }

    /// Mutable lookup by id.
    pub fn position_mut(&mut self, id: &PositionId) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| &p.id == id)
    }

    /// Remove an occupant from every position's list. Returns whether
    /// any seat changed.
    pub fn unseat_everywhere(&mut self, occupant: &ActorRef) -> bool {
        let mut changed = false;
        for position in &mut self.positions {
            let before = position.occupants.len();
            position.occupants.retain(|o| o != occupant);
            changed |= position.occupants.len() != before;
        }
        changed
    }

    /// All seated occupant references across every position.
    pub fn occupants(&self) -> impl Iterator<Item = &ActorRef> {
        self.positions.iter().flat_map(|p| p.occupants.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_decodes_wire_shape() {
        let blob = json!({
            "positions": [{
                "id": "abc123",
                "name": "Driver",
                "order": 1,
                "maxOccupants": 1,
                "occupants": ["Actor.xyz"],
                "canControlWeapons": false,
                "grantsTokenControl": true,
                "skills": "Drive Land Vehicle, Evasion",
                "bulletproofGlass": true,
                "glassHp": 8,
                "glassHpMax": 10
            }]
        });

        let state = VehicleState::decode(Some(blob)).expect("decode");
        let position = &state.positions[0];
        assert_eq!(position.id, PositionId::new("abc123"));
        assert_eq!(position.max_occupants, 1);
        assert!(position.grants_token_control);
        assert_eq!(position.occupants, vec![ActorRef::new("Actor.xyz")]);
        assert_eq!(position.glass_hp, 8);
        assert_eq!(position.glass_hp_max, 10);
    }

    #[test]
    fn state_tolerates_sparse_positions() {
        // Older saves carry only the fields the edit form had at the time.
        let blob = json!({
            "positions": [{ "id": "p1", "name": "Bench" }]
        });

        let state = VehicleState::decode(Some(blob)).expect("decode");
        let position = &state.positions[0];
        assert_eq!(position.max_occupants, 1);
        assert!(position.occupants.is_empty());
        assert!(!position.bulletproof_glass);
        assert_eq!(position.glass_hp_max, 0);
    }

    #[test]
    fn missing_blob_is_empty_state() {
        let state = VehicleState::decode(None).expect("decode");
        assert!(state.positions.is_empty());
    }

    #[test]
    fn encode_uses_wire_field_names() {
        let mut state = VehicleState::default();
        state.positions.push(Position::new("Gunner", 2));
        let value = state.encode().expect("encode");
        let fields = value["positions"][0].as_object().expect("object");
        assert!(fields.contains_key("maxOccupants"));
        assert!(fields.contains_key("canControlWeapons"));
        assert!(fields.contains_key("glassHpMax"));
    }

    #[test]
    fn skill_list_trims_and_drops_empties() {
        let mut position = Position::new("Driver", 1);
        position.skills = " Drive Land Vehicle , Evasion,,  ".to_string();
        assert_eq!(position.skill_list(), vec!["Drive Land Vehicle", "Evasion"]);

        position.skills = String::new();
        assert!(position.skill_list().is_empty());
    }

    #[test]
    fn unseat_everywhere_reports_change() {
        let rider = ActorRef::new("Actor.rider");
        let mut state = VehicleState::default();
        state.positions.push(Position::new("Driver", 1));
        state.positions.push(Position::new("Passenger", 2));
        state.positions[1].occupants.push(rider.clone());

        assert!(state.unseat_everywhere(&rider));
        assert!(state.occupants().next().is_none());
        assert!(!state.unseat_everywhere(&rider));
    }

    #[test]
    fn permission_levels_are_ordered() {
        assert!(PermissionLevel::None < PermissionLevel::Limited);
        assert!(PermissionLevel::Limited < PermissionLevel::Observer);
        assert!(PermissionLevel::Observer < PermissionLevel::Owner);
    }
}
