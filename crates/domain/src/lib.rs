//! Domain layer for the sweetshop order backend.
//!
//! This crate provides the order placement and inventory consistency core:
//! - Order aggregate with owned line items and price snapshots
//! - OrderStatus state machine enforcing legal transitions
//! - Persistence ports (OrderStore, ProductCatalog) the core depends on
//! - OrderLifecycleManager orchestrating validation, reservation, and
//!   persistence with explicit caller identity

pub mod error;
pub mod order;
pub mod store;

pub use error::OrderError;
pub use order::{
    CreateOrder, LineItem, Order, OrderDraft, OrderLifecycleManager, OrderLine, OrderStatus,
};
pub use store::{OrderStore, Product, ProductCatalog, StoreError};
