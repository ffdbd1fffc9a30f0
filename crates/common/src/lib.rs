//! Shared types for the sweetshop order backend.
//!
//! Identifier newtypes, the `Money` value object, the resolved caller
//! `Identity`, and paging types used by the admin listing.

pub mod identity;
pub mod money;
pub mod page;
pub mod types;

pub use identity::Identity;
pub use money::Money;
pub use page::{Page, PageRequest};
pub use types::{OrderId, ProductId, UserId};
