//! Resolved caller identity.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// The authenticated caller, as resolved by the external identity layer.
///
/// Session validation happens upstream; the core only ever sees this
/// already-resolved triple and passes it explicitly through every
/// operation (no ambient security context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The caller's user ID.
    pub user_id: UserId,

    /// The caller's email address.
    pub email: String,

    /// True if the caller holds the admin role.
    pub is_admin: bool,
}

impl Identity {
    /// Creates a regular (non-admin) identity.
    pub fn user(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            is_admin: false,
        }
    }

    /// Creates an admin identity.
    pub fn admin(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            is_admin: true,
        }
    }

    /// Returns true if this identity owns the given user ID.
    pub fn owns(&self, owner_id: UserId) -> bool {
        self.user_id == owner_id
    }
}
