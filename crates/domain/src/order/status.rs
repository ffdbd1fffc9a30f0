//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► InProgress ──► Delivered
///           │        │
///           └────────┴──► Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal. Owners may only cancel a
/// pending order; every other edge is admin-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order was placed and awaits handling.
    #[default]
    Pending,

    /// Order is being prepared or shipped.
    InProgress,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Decides whether a transition to `target` is legal for the actor.
    ///
    /// Pure decision function: no I/O, no clock. Owners hold a single
    /// capability (cancel a pending order); admins may advance or cancel
    /// any non-terminal order.
    pub fn can_transition(self, target: OrderStatus, actor_is_admin: bool) -> bool {
        if self.is_terminal() || self == target {
            return false;
        }
        if !actor_is_admin {
            return self == OrderStatus::Pending && target == OrderStatus::Cancelled;
        }
        match self {
            OrderStatus::Pending => matches!(
                target,
                OrderStatus::InProgress | OrderStatus::Delivered | OrderStatus::Cancelled
            ),
            OrderStatus::InProgress => {
                matches!(target, OrderStatus::Delivered | OrderStatus::Cancelled)
            }
            OrderStatus::Delivered | OrderStatus::Cancelled => false,
        }
    }

    /// Parses an external status name into a variant.
    ///
    /// This is the single name↔variant mapping used at the API boundary;
    /// unrecognized names are rejected there as validation errors.
    pub fn parse(name: &str) -> Option<OrderStatus> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns the status name as persisted and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
