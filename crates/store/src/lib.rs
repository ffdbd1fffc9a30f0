//! Storage backends for the order core.
//!
//! Two implementations of the domain's persistence ports:
//! - [`MemoryStore`] — in-memory twin used by tests and the default server
//! - [`PgStore`] — PostgreSQL via sqlx, one transaction per order creation

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
