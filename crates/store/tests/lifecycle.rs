//! Integration tests for the order lifecycle over the in-memory backend.

use common::{Identity, Money, OrderId, PageRequest, ProductId, UserId};
use domain::OrderError;
use domain::order::{CreateOrder, LineItem, OrderLifecycleManager, OrderStatus};
use domain::store::{Product, ProductCatalog};
use store::MemoryStore;

fn owner() -> Identity {
    Identity::user(UserId::new(1), "ana@example.com")
}

fn other_user() -> Identity {
    Identity::user(UserId::new(2), "bruno@example.com")
}

fn admin() -> Identity {
    Identity::admin(UserId::new(99), "root@example.com")
}

async fn manager_with_product(
    price_cents: i64,
    stock: u32,
) -> (OrderLifecycleManager<MemoryStore>, Product) {
    let store = MemoryStore::new();
    let product = store
        .insert_product("Alfajor box", Money::from_cents(price_cents), stock)
        .await;
    (OrderLifecycleManager::new(store), product)
}

fn one_line_request(product_id: ProductId, quantity: u32) -> CreateOrder {
    CreateOrder::new(
        "Main St 1",
        "card",
        vec![LineItem::new(product_id, quantity)],
    )
}

#[tokio::test]
async fn placing_an_order_snapshots_price_and_decrements_stock() {
    // Product stock=10, price=1300.00; one line of qty 3.
    let (manager, product) = manager_with_product(130_000, 10).await;

    let order = manager
        .create_order(one_line_request(product.id, 3), &owner())
        .await
        .unwrap();

    assert_eq!(order.total.cents(), 390_000);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.owner_id, UserId::new(1));
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].unit_price.cents(), 130_000);
    assert_eq!(order.lines[0].product_name, "Alfajor box");

    let remaining = manager
        .store()
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.stock, 7);
}

#[tokio::test]
async fn total_is_exact_sum_across_lines() {
    let store = MemoryStore::new();
    let a = store.insert_product("A", Money::from_cents(999), 10).await;
    let b = store.insert_product("B", Money::from_cents(1), 10).await;
    let manager = OrderLifecycleManager::new(store);

    let request = CreateOrder::new(
        "Main St 1",
        "card",
        vec![LineItem::new(a.id, 7), LineItem::new(b.id, 3)],
    );
    let order = manager.create_order(request, &owner()).await.unwrap();

    assert_eq!(order.total.cents(), 999 * 7 + 3);
}

#[tokio::test]
async fn later_price_changes_do_not_affect_existing_orders() {
    let (manager, product) = manager_with_product(100, 10).await;

    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    // Simulate a catalog price change by reselling the rest at a new price.
    // The persisted order keeps its snapshot.
    let reloaded = manager.get_order(order.id, &owner()).await.unwrap();
    assert_eq!(reloaded.lines[0].unit_price.cents(), 100);
    assert_eq!(reloaded.total.cents(), 100);
}

#[tokio::test]
async fn unknown_product_fails_with_not_found_and_no_side_effects() {
    let (manager, product) = manager_with_product(100, 10).await;

    let request = CreateOrder::new(
        "Main St 1",
        "card",
        vec![
            LineItem::new(product.id, 2),
            LineItem::new(ProductId::new(999), 1),
        ],
    );
    let err = manager.create_order(request, &owner()).await.unwrap_err();
    assert!(matches!(err, OrderError::ProductNotFound { .. }));

    // Nothing was decremented and nothing was persisted.
    let untouched = manager
        .store()
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.stock, 10);
    assert!(manager.list_for_owner(&owner()).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_line_fails_whole_order() {
    let store = MemoryStore::new();
    let plenty = store.insert_product("A", Money::from_cents(100), 10).await;
    let scarce = store.insert_product("B", Money::from_cents(100), 2).await;
    let manager = OrderLifecycleManager::new(store);

    let request = CreateOrder::new(
        "Main St 1",
        "card",
        vec![LineItem::new(plenty.id, 5), LineItem::new(scarce.id, 3)],
    );
    let err = manager.create_order(request, &owner()).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::InsufficientStock { product_id } if product_id == scarce.id
    ));

    assert_eq!(
        manager
            .store()
            .get_product(plenty.id)
            .await
            .unwrap()
            .unwrap()
            .stock,
        10
    );
}

#[tokio::test]
async fn validation_failures_reject_before_any_mutation() {
    let (manager, product) = manager_with_product(100, 10).await;

    let empty_lines = CreateOrder::new("Main St 1", "card", vec![]);
    assert!(matches!(
        manager.create_order(empty_lines, &owner()).await,
        Err(OrderError::Validation(_))
    ));

    let zero_quantity = one_line_request(product.id, 0);
    assert!(matches!(
        manager.create_order(zero_quantity, &owner()).await,
        Err(OrderError::Validation(_))
    ));

    let blank_address = CreateOrder::new("  ", "card", vec![LineItem::new(product.id, 1)]);
    assert!(matches!(
        manager.create_order(blank_address, &owner()).await,
        Err(OrderError::Validation(_))
    ));

    assert_eq!(
        manager
            .store()
            .get_product(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock,
        10
    );
}

#[tokio::test]
async fn two_concurrent_orders_for_six_of_ten_leave_four() {
    let (manager, product) = manager_with_product(100, 10).await;
    let manager = std::sync::Arc::new(manager);

    let mut handles = Vec::new();
    for user in [owner(), other_user()] {
        let manager = manager.clone();
        let request = one_line_request(product.id, 6);
        handles.push(tokio::spawn(async move {
            manager.create_order(request, &user).await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(OrderError::InsufficientStock { .. }))));

    let remaining = manager
        .store()
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.stock, 4);
}

#[tokio::test]
async fn concurrent_demand_beyond_stock_never_oversells() {
    // Stock 5, six concurrent orders of 2: at most 2 can fit.
    let (manager, product) = manager_with_product(100, 5).await;
    let manager = std::sync::Arc::new(manager);

    let mut handles = Vec::new();
    for user_id in 10..16i64 {
        let manager = manager.clone();
        let identity = Identity::user(UserId::new(user_id), format!("u{user_id}@example.com"));
        let request = one_line_request(product.id, 2);
        handles.push(tokio::spawn(async move {
            manager.create_order(request, &identity).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 2);
    let remaining = manager
        .store()
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.stock, 1);
}

#[tokio::test]
async fn get_order_enforces_ownership() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    assert!(manager.get_order(order.id, &owner()).await.is_ok());
    assert!(manager.get_order(order.id, &admin()).await.is_ok());
    assert!(matches!(
        manager.get_order(order.id, &other_user()).await,
        Err(OrderError::Forbidden)
    ));
    assert!(matches!(
        manager.get_order(OrderId::new(404), &owner()).await,
        Err(OrderError::OrderNotFound { .. })
    ));
}

#[tokio::test]
async fn owner_cancel_only_from_pending_and_only_by_owner() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    assert!(matches!(
        manager.cancel_by_owner(order.id, &other_user()).await,
        Err(OrderError::Forbidden)
    ));

    let cancelled = manager.cancel_by_owner(order.id, &owner()).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // Terminal: a second cancel is rejected.
    assert!(matches!(
        manager.cancel_by_owner(order.id, &owner()).await,
        Err(OrderError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn cancel_after_delivery_is_invalid() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    manager
        .update_status(order.id, OrderStatus::Delivered, &admin())
        .await
        .unwrap();

    assert!(matches!(
        manager.cancel_by_owner(order.id, &owner()).await,
        Err(OrderError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn cancellation_does_not_restore_stock() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 4), &owner())
        .await
        .unwrap();

    manager.cancel_by_owner(order.id, &owner()).await.unwrap();

    let remaining = manager
        .store()
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.stock, 6);
}

#[tokio::test]
async fn admin_may_walk_the_full_status_chain() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    let in_progress = manager
        .update_status(order.id, OrderStatus::InProgress, &admin())
        .await
        .unwrap();
    assert_eq!(in_progress.status, OrderStatus::InProgress);
    assert!(in_progress.updated_at >= in_progress.created_at);

    let delivered = manager
        .update_status(order.id, OrderStatus::Delivered, &admin())
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    // Terminal states are never mutated further.
    assert!(matches!(
        manager
            .update_status(order.id, OrderStatus::Cancelled, &admin())
            .await,
        Err(OrderError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn status_update_requires_admin() {
    let (manager, product) = manager_with_product(100, 10).await;
    let order = manager
        .create_order(one_line_request(product.id, 1), &owner())
        .await
        .unwrap();

    assert!(matches!(
        manager
            .update_status(order.id, OrderStatus::InProgress, &owner())
            .await,
        Err(OrderError::Forbidden)
    ));
}

#[tokio::test]
async fn owner_listing_and_admin_paging() {
    let (manager, product) = manager_with_product(100, 100).await;

    for _ in 0..3 {
        manager
            .create_order(one_line_request(product.id, 1), &owner())
            .await
            .unwrap();
    }
    manager
        .create_order(one_line_request(product.id, 1), &other_user())
        .await
        .unwrap();

    let mine = manager.list_for_owner(&owner()).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|o| o.owner_id == UserId::new(1)));

    let page = manager
        .list_all(PageRequest::new(0, 2), &admin())
        .await
        .unwrap();
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);

    assert!(matches!(
        manager.list_all(PageRequest::default(), &owner()).await,
        Err(OrderError::Forbidden)
    ));
}

#[tokio::test]
async fn low_stock_report_is_admin_only() {
    let (manager, product) = manager_with_product(100, 3).await;

    let low = manager.list_low_stock(5, &admin()).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, product.id);

    assert!(matches!(
        manager.list_low_stock(5, &owner()).await,
        Err(OrderError::Forbidden)
    ));
}
