//! Domain error taxonomy.

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::order::OrderStatus;
use crate::store::StoreError;

/// Errors surfaced by order lifecycle operations.
///
/// Every variant maps to a single descriptive message; no storage
/// internals leak to callers.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed request input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Authenticated caller is not entitled to the operation.
    #[error("access to this order is denied")]
    Forbidden,

    /// Referenced product does not exist.
    #[error("product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// Referenced order does not exist.
    #[error("order {order_id} not found")]
    OrderNotFound { order_id: OrderId },

    /// A line's quantity exceeds the product's available stock,
    /// including races lost to concurrent orders.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// The state machine rejected the requested status edge.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A concurrent write collided and retries were exhausted.
    #[error("concurrent update conflict, please retry")]
    Conflict,

    /// Storage-layer failure; propagated as a generic internal error.
    #[error("storage error")]
    Store(#[source] StoreError),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound { product_id } => {
                OrderError::ProductNotFound { product_id }
            }
            StoreError::InsufficientStock { product_id } => {
                OrderError::InsufficientStock { product_id }
            }
            StoreError::OrderNotFound { order_id } => OrderError::OrderNotFound { order_id },
            StoreError::Conflict { .. } => OrderError::Conflict,
            other => OrderError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_domain_variants() {
        let err: OrderError = StoreError::InsufficientStock {
            product_id: ProductId::new(3),
        }
        .into();
        assert!(matches!(
            err,
            OrderError::InsufficientStock { product_id } if product_id == ProductId::new(3)
        ));

        let err: OrderError = StoreError::OrderNotFound {
            order_id: OrderId::new(8),
        }
        .into();
        assert!(matches!(err, OrderError::OrderNotFound { .. }));

        let err: OrderError = StoreError::Database("boom".to_string()).into();
        assert!(matches!(err, OrderError::Store(_)));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new(42),
        };
        assert!(err.to_string().contains("42"));

        let err = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert!(err.to_string().contains("DELIVERED"));
        assert!(err.to_string().contains("PENDING"));
    }
}
