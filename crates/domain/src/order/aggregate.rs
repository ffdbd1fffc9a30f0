//! Order aggregate root and its owned line items.

use chrono::{DateTime, Utc};
use common::{Identity, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// One line of an order.
///
/// The unit price and product name are captured from the catalog at order
/// creation time (price snapshot); later catalog changes never affect
/// existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The catalog product this line refers to.
    pub product_id: ProductId,

    /// Product name at creation time, denormalized for display.
    pub product_name: String,

    /// Quantity ordered; always at least 1.
    pub quantity: u32,

    /// Price per unit at creation time.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns `unit_price * quantity` for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Order aggregate root.
///
/// Owns its line collection by value; lines never exist without a parent
/// order, and replacing an order's line set is the order's exclusive
/// responsibility. Persisted aggregates always satisfy:
/// - at least one line,
/// - `total` equals the exact sum of line totals,
/// - `status` moved only along legal state-machine edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identity, immutable after first persist.
    pub id: OrderId,

    /// The user who placed the order; immutable.
    pub owner_id: UserId,

    /// Owner email at creation time, denormalized for responses.
    pub owner_email: String,

    /// Free-form shipping address, non-empty.
    pub shipping_address: String,

    /// Free-form payment method label, non-empty.
    pub payment_method: String,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Exact sum of line totals, fixed at creation.
    pub total: Money,

    /// Set once at creation.
    pub created_at: DateTime<Utc>,

    /// Bumped on every mutation.
    pub updated_at: DateTime<Utc>,

    /// Owned line items, in request order.
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Computes the exact total over a set of lines.
    pub fn total_of(lines: &[OrderLine]) -> Money {
        lines.iter().map(OrderLine::line_total).sum()
    }
}

/// A fully validated order awaiting its first persist.
///
/// Produced by the lifecycle manager once every line has been priced
/// against the catalog; the store assigns the identity and applies the
/// stock decrements atomically with the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub owner_id: UserId,
    pub owner_email: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl OrderDraft {
    /// Builds a draft for the given caller, computing the total.
    pub fn new(
        identity: &Identity,
        shipping_address: impl Into<String>,
        payment_method: impl Into<String>,
        lines: Vec<OrderLine>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total = Order::total_of(&lines);
        Self {
            owner_id: identity.user_id,
            owner_email: identity.email.clone(),
            shipping_address: shipping_address.into(),
            payment_method: payment_method.into(),
            total,
            created_at,
            lines,
        }
    }

    /// Finalizes the draft into a pending aggregate with its assigned ID.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            owner_id: self.owner_id,
            owner_email: self.owner_email,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            status: OrderStatus::Pending,
            total: self.total,
            created_at: self.created_at,
            updated_at: self.created_at,
            lines: self.lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine::new(ProductId::new(1), "Alfajor", 3, Money::from_cents(130_000)),
            OrderLine::new(ProductId::new(2), "Brownie", 2, Money::from_cents(250)),
        ]
    }

    #[test]
    fn line_total_is_unit_price_times_quantity() {
        let line = OrderLine::new(ProductId::new(1), "Alfajor", 3, Money::from_cents(130_000));
        assert_eq!(line.line_total().cents(), 390_000);
    }

    #[test]
    fn total_is_exact_sum_of_line_totals() {
        assert_eq!(Order::total_of(&lines()).cents(), 390_000 + 500);
    }

    #[test]
    fn draft_computes_total_and_finalizes_pending() {
        let identity = Identity::user(UserId::new(9), "ana@example.com");
        let now = Utc::now();
        let draft = OrderDraft::new(&identity, "Main St 1", "card", lines(), now);
        assert_eq!(draft.total.cents(), 390_500);

        let order = draft.into_order(OrderId::new(1));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.owner_id, UserId::new(9));
        assert_eq!(order.owner_email, "ana@example.com");
        assert_eq!(order.created_at, now);
        assert_eq!(order.updated_at, now);
        assert_eq!(order.lines.len(), 2);
    }

    #[test]
    fn order_serialization_roundtrip() {
        let identity = Identity::user(UserId::new(9), "ana@example.com");
        let order =
            OrderDraft::new(&identity, "Main St 1", "card", lines(), Utc::now()).into_order(
                OrderId::new(4),
            );
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
