//! Error type for host-platform calls.

use thiserror::Error;

/// Failures surfaced by the host-platform boundary.
///
/// Lookups that merely resolve to a missing document are not errors; the
/// platform reports those as `None` and callers treat them as absence.
#[derive(Debug, Error)]
pub enum HostError {
    /// The module-scoped flag blob could not be read or written.
    #[error("flag storage error: {0}")]
    Storage(String),

    /// A document lookup failed outright (as opposed to resolving to
    /// a missing document).
    #[error("document lookup error: {0}")]
    Lookup(String),

    /// A permission read or write was refused by the host.
    #[error("permission error: {0}")]
    Permission(String),
}

impl HostError {
    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a lookup error.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a permission error.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }
}
