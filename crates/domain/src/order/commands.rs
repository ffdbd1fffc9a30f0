//! Order placement request types and their validation.

use common::ProductId;
use serde::Deserialize;

use crate::error::OrderError;

/// One requested line: a product reference and a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Request to place a new order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateOrder {
    pub shipping_address: String,
    pub payment_method: String,
    pub lines: Vec<LineItem>,
}

impl CreateOrder {
    pub fn new(
        shipping_address: impl Into<String>,
        payment_method: impl Into<String>,
        lines: Vec<LineItem>,
    ) -> Self {
        Self {
            shipping_address: shipping_address.into(),
            payment_method: payment_method.into(),
            lines,
        }
    }

    /// Checks the request shape before any catalog lookup or mutation.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.shipping_address.trim().is_empty() {
            return Err(OrderError::Validation(
                "shipping address must not be blank".to_string(),
            ));
        }
        if self.payment_method.trim().is_empty() {
            return Err(OrderError::Validation(
                "payment method must not be blank".to_string(),
            ));
        }
        if self.lines.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one line".to_string(),
            ));
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
        }
        Ok(())
    }
}
