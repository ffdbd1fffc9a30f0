//! Order aggregate, status state machine, and lifecycle manager.

mod aggregate;
mod commands;
mod manager;
mod status;

pub use aggregate::{Order, OrderDraft, OrderLine};
pub use commands::{CreateOrder, LineItem};
pub use manager::OrderLifecycleManager;
pub use status::OrderStatus;
