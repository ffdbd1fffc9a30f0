//! Persistence ports the order core depends on.
//!
//! Implementations live in the `store` crate (in-memory and Postgres);
//! the lifecycle manager is generic over these traits and never touches
//! a concrete backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, Page, PageRequest, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{Order, OrderDraft, OrderStatus};

/// A catalog product as the order core sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: common::Money,
    pub stock: u32,
}

/// Errors raised by port implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Product does not exist.
    #[error("product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// A conditional decrement would drive stock below zero.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Order does not exist.
    #[error("order {order_id} not found")]
    OrderNotFound { order_id: OrderId },

    /// A compare-and-swap write observed a different current state.
    #[error("write conflict on order {order_id}")]
    Conflict { order_id: OrderId },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

/// Read and reserve access to the product catalog.
///
/// `decrement_stock` is the single most safety-critical contract in the
/// system: it must be linearizable with respect to concurrent callers on
/// the same product and must never let the stored stock go negative.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetches a product by ID, or `None` if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Atomically decrements stock if at least `quantity` units remain.
    ///
    /// Fails with `InsufficientStock` when the remaining stock cannot
    /// cover the quantity, leaving the stored value untouched.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), StoreError>;

    /// Lists products whose stock is strictly below the threshold.
    async fn list_low_stock(&self, threshold: u32) -> Result<Vec<Product>, StoreError>;
}

/// Durable storage for order aggregates.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a draft and applies its stock decrements as one atomic
    /// unit, assigning the order's identity.
    ///
    /// If any line's decrement fails (insufficient stock, including a
    /// race lost to a concurrent order), the whole creation aborts: no
    /// partial decrement and no order row survive.
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError>;

    /// Fetches an order with its lines, or `None` if absent.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Moves an order from one status to another with a fresh
    /// `updated_at`, guarded by the expected current status.
    ///
    /// Fails with `Conflict` if the stored status no longer equals
    /// `from` (a concurrent transition won).
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Order, StoreError>;

    /// Returns all orders owned by the given user.
    async fn list_orders_for_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Returns one page of all orders, newest-insert last.
    async fn list_orders_page(&self, request: PageRequest) -> Result<Page<Order>, StoreError>;
}
