//! Occupancy and glass-integrity rules.
//!
//! Pure functions of a [`Position`] snapshot; no I/O. `max_occupants` is
//! a soft limit checked at assignment time, while the hard ceiling below
//! bounds the list length regardless of configuration. A position past
//! its soft limit but within the ceiling is "crammed" - a warning, not
//! a rejection.

use crate::models::Position;

/// Hard ceiling on occupants per position, independent of the configured
/// `max_occupants`.
pub const HARD_OCCUPANT_CEILING: usize = 2;

/// Whether the position has reached its configured capacity.
pub fn is_full(position: &Position) -> bool {
    position.occupants.len() >= position.max_occupants as usize
}

/// Whether the position holds more occupants than its configured
/// capacity allows.
pub fn is_crammed(position: &Position) -> bool {
    position.occupants.len() > position.max_occupants as usize
}

/// Whether one more occupant fits under the hard ceiling.
pub fn can_accept(position: &Position) -> bool {
    position.occupants.len() < HARD_OCCUPANT_CEILING
}

/// Clamp a glass integrity value into `0..=max`.
pub fn clamp_glass(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}
