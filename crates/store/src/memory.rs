//! In-memory backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, Page, PageRequest, ProductId, UserId};
use domain::order::{Order, OrderDraft, OrderStatus};
use domain::store::{OrderStore, Product, ProductCatalog, StoreError};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_product_id: i64,
    next_order_id: i64,
}

/// In-memory backend implementing both persistence ports.
///
/// Provides the same contract as the PostgreSQL implementation. All of
/// order creation runs under one write lock, so the per-line stock checks
/// and the order insert are a single linearizable step; a failed check
/// leaves no partial decrement behind.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product with a fresh ID; used by tests and seeding.
    pub async fn insert_product(
        &self,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Product {
        let mut inner = self.inner.write().await;
        inner.next_product_id += 1;
        let product = Product {
            id: ProductId::new(inner.next_product_id),
            name: name.into(),
            price,
            stock,
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound { product_id: id })?;
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock { product_id: id });
        }
        product.stock -= quantity;
        Ok(())
    }

    async fn list_low_stock(&self, threshold: u32) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.stock < threshold)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        let mut inner = self.inner.write().await;

        // Aggregate required quantities so duplicate product lines are
        // checked against the combined demand.
        let mut required: HashMap<ProductId, u64> = HashMap::new();
        for line in &draft.lines {
            *required.entry(line.product_id).or_default() += u64::from(line.quantity);
        }

        for (product_id, quantity) in &required {
            let product = inner
                .products
                .get(product_id)
                .ok_or(StoreError::ProductNotFound {
                    product_id: *product_id,
                })?;
            if u64::from(product.stock) < *quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: *product_id,
                });
            }
        }

        // All checks passed while holding the write lock; apply.
        for (product_id, quantity) in &required {
            if let Some(product) = inner.products.get_mut(product_id) {
                product.stock -= *quantity as u32;
            }
        }

        inner.next_order_id += 1;
        let order = draft.into_order(OrderId::new(inner.next_order_id));
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound { order_id: id })?;
        if order.status != from {
            return Err(StoreError::Conflict { order_id: id });
        }
        order.status = to;
        order.updated_at = updated_at;
        Ok(order.clone())
    }

    async fn list_orders_for_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_orders_page(&self, request: PageRequest) -> Result<Page<Order>, StoreError> {
        let inner = self.inner.read().await;
        let total = inner.orders.len() as u64;
        let content: Vec<Order> = inner
            .orders
            .values()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .cloned()
            .collect();
        Ok(Page::new(content, request, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Identity;
    use domain::order::OrderLine;

    fn draft_for(product: &Product, quantity: u32, owner: i64) -> OrderDraft {
        let identity = Identity::user(UserId::new(owner), "ana@example.com");
        OrderDraft::new(
            &identity,
            "Main St 1",
            "card",
            vec![OrderLine::new(
                product.id,
                product.name.clone(),
                quantity,
                product.price,
            )],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_order_decrements_stock_and_assigns_id() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(130_000), 10)
            .await;

        let order = store.create_order(draft_for(&product, 3, 1)).await.unwrap();

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.total.cents(), 390_000);
        let remaining = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(remaining.stock, 7);
    }

    #[tokio::test]
    async fn create_order_fails_whole_when_one_line_short() {
        let store = MemoryStore::new();
        let plenty = store
            .insert_product("Alfajor", Money::from_cents(100), 10)
            .await;
        let scarce = store
            .insert_product("Brownie", Money::from_cents(200), 1)
            .await;

        let identity = Identity::user(UserId::new(1), "ana@example.com");
        let draft = OrderDraft::new(
            &identity,
            "Main St 1",
            "card",
            vec![
                OrderLine::new(plenty.id, "Alfajor", 2, plenty.price),
                OrderLine::new(scarce.id, "Brownie", 5, scarce.price),
            ],
            Utc::now(),
        );

        let err = store.create_order(draft).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { product_id } if product_id == scarce.id
        ));

        // No partial decrement survived.
        assert_eq!(store.get_product(plenty.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.get_product(scarce.id).await.unwrap().unwrap().stock, 1);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_product_lines_are_checked_against_combined_demand() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(100), 5)
            .await;

        let identity = Identity::user(UserId::new(1), "ana@example.com");
        let draft = OrderDraft::new(
            &identity,
            "Main St 1",
            "card",
            vec![
                OrderLine::new(product.id, "Alfajor", 3, product.price),
                OrderLine::new(product.id, "Alfajor", 3, product.price),
            ],
            Utc::now(),
        );

        let err = store.create_order(draft).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { .. }));
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn concurrent_creates_never_oversell() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(100), 5)
            .await;

        let mut handles = Vec::new();
        for owner in 0..4i64 {
            let store = store.clone();
            let product = product.clone();
            handles.push(tokio::spawn(async move {
                store.create_order(draft_for(&product, 2, owner)).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        // 4 orders of 2 against stock 5: exactly 2 fit.
        assert_eq!(succeeded, 2);
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn decrement_stock_is_conditional() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(100), 2)
            .await;

        store.decrement_stock(product.id, 2).await.unwrap();
        let err = store.decrement_stock(product.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { .. }));
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn update_order_status_guards_expected_current() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(100), 5)
            .await;
        let order = store.create_order(draft_for(&product, 1, 1)).await.unwrap();

        let updated = store
            .update_order_status(
                order.id,
                OrderStatus::Pending,
                OrderStatus::InProgress,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::InProgress);

        let err = store
            .update_order_status(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn list_for_owner_filters_and_page_counts() {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Alfajor", Money::from_cents(100), 100)
            .await;

        for owner in [1i64, 1, 2] {
            store
                .create_order(draft_for(&product, 1, owner))
                .await
                .unwrap();
        }

        let mine = store.list_orders_for_owner(UserId::new(1)).await.unwrap();
        assert_eq!(mine.len(), 2);

        let page = store
            .list_orders_page(PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn low_stock_lists_products_below_threshold() {
        let store = MemoryStore::new();
        store.insert_product("Alfajor", Money::from_cents(100), 2).await;
        store.insert_product("Brownie", Money::from_cents(100), 50).await;

        let low = store.list_low_stock(5).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Alfajor");
    }
}
