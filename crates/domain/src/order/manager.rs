//! Order lifecycle orchestration.

use chrono::Utc;
use common::{Identity, OrderId, Page, PageRequest};

use crate::error::OrderError;
use crate::store::{OrderStore, Product, ProductCatalog};

use super::{CreateOrder, Order, OrderDraft, OrderLine, OrderStatus};

/// Orchestrates order placement and lifecycle transitions.
///
/// Generic over the persistence backend; every operation takes the
/// resolved caller identity explicitly and performs its capability check
/// before touching storage. Validation happens before any mutation, and
/// the backend applies stock decrements and the order insert as one
/// atomic unit.
pub struct OrderLifecycleManager<S> {
    store: S,
}

impl<S: OrderStore + ProductCatalog> OrderLifecycleManager<S> {
    /// Creates a manager over the given backend.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places a new order for the caller.
    ///
    /// Each line is priced against the catalog (price snapshot), checked
    /// against current stock, and reserved by the backend inside a single
    /// atomic unit of work with the order insert. A lost race on any line
    /// aborts the whole creation with `InsufficientStock`.
    #[tracing::instrument(skip(self, request), fields(owner_id = %identity.user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrder,
        identity: &Identity,
    ) -> Result<Order, OrderError> {
        request.validate()?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for item in &request.lines {
            let product = self
                .store
                .get_product(item.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound {
                    product_id: item.product_id,
                })?;

            if item.quantity > product.stock {
                metrics::counter!("orders_rejected_total", "reason" => "insufficient_stock")
                    .increment(1);
                return Err(OrderError::InsufficientStock {
                    product_id: product.id,
                });
            }

            lines.push(OrderLine::new(
                product.id,
                product.name,
                item.quantity,
                product.price,
            ));
        }

        let draft = OrderDraft::new(
            identity,
            request.shipping_address,
            request.payment_method,
            lines,
            Utc::now(),
        );

        let order = self.store.create_order(draft).await.map_err(|err| {
            metrics::counter!("orders_rejected_total", "reason" => "reservation_failed")
                .increment(1);
            OrderError::from(err)
        })?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "order created");
        Ok(order)
    }

    /// Loads an order, enforcing ownership.
    ///
    /// Admins may read any order; other callers only their own.
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn get_order(&self, id: OrderId, identity: &Identity) -> Result<Order, OrderError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id: id })?;

        if !identity.is_admin && !identity.owns(order.owner_id) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    /// Returns all orders owned by the caller.
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn list_for_owner(&self, identity: &Identity) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders_for_owner(identity.user_id).await?)
    }

    /// Returns one page of all orders, without ownership filter.
    ///
    /// Admin-scoped: callers without the admin capability are refused.
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn list_all(
        &self,
        request: PageRequest,
        identity: &Identity,
    ) -> Result<Page<Order>, OrderError> {
        if !identity.is_admin {
            return Err(OrderError::Forbidden);
        }
        Ok(self.store.list_orders_page(request).await?)
    }

    /// Sets an order's status to any target the state machine permits
    /// for an admin actor.
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn update_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        identity: &Identity,
    ) -> Result<Order, OrderError> {
        if !identity.is_admin {
            return Err(OrderError::Forbidden);
        }
        self.transition(id, new_status, true).await
    }

    /// Self-service cancellation of the caller's own pending order.
    ///
    /// Decremented stock is not restored on cancellation.
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn cancel_by_owner(
        &self,
        id: OrderId,
        identity: &Identity,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id: id })?;

        if !identity.owns(order.owner_id) {
            return Err(OrderError::Forbidden);
        }
        self.transition(id, OrderStatus::Cancelled, false).await
    }

    /// Lists products below a stock threshold (admin report).
    #[tracing::instrument(skip(self), fields(caller = %identity.user_id))]
    pub async fn list_low_stock(
        &self,
        threshold: u32,
        identity: &Identity,
    ) -> Result<Vec<Product>, OrderError> {
        if !identity.is_admin {
            return Err(OrderError::Forbidden);
        }
        Ok(self.store.list_low_stock(threshold).await?)
    }

    /// Applies one state-machine edge, persisting with a guard on the
    /// observed current status so a concurrent transition cannot be
    /// silently overwritten.
    async fn transition(
        &self,
        id: OrderId,
        target: OrderStatus,
        actor_is_admin: bool,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id: id })?;

        if !order.status.can_transition(target, actor_is_admin) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        let updated = self
            .store
            .update_order_status(id, order.status, target, Utc::now())
            .await?;

        metrics::counter!("order_status_transitions_total").increment(1);
        tracing::info!(order_id = %id, from = %order.status, to = %target, "order status changed");
        Ok(updated)
    }
}
