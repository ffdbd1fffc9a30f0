//! HTTP API server for the sweetshop order backend.
//!
//! Exposes the order placement and lifecycle endpoints over axum, with
//! structured logging (tracing) and Prometheus metrics. Caller identity
//! arrives as gateway-installed headers and is resolved by the
//! extractors in [`auth`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use common::Money;
use domain::order::OrderLifecycleManager;
use domain::store::{OrderStore, ProductCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MemoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + ProductCatalog + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/orders", post(routes::orders::create::<S>))
        .route("/api/orders", get(routes::orders::list::<S>))
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/api/orders/admin/all", get(routes::orders::admin_list::<S>))
        .route(
            "/api/orders/admin/low-stock",
            get(routes::orders::admin_low_stock::<S>),
        )
        .route("/api/orders/admin/{id}", get(routes::orders::admin_get::<S>))
        .route(
            "/api/orders/admin/{id}",
            put(routes::orders::admin_update_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given backend.
pub fn create_state<S: OrderStore + ProductCatalog + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        manager: OrderLifecycleManager::new(store),
    })
}

/// Seeds a handful of catalog products into a fresh in-memory store so
/// the default server has something to sell.
pub async fn seed_demo_catalog(store: &MemoryStore) {
    for (name, price_cents, stock) in [
        ("Alfajor box", 130_000, 10),
        ("Brownie", 2_500, 40),
        ("Lemon pie slice", 3_200, 25),
    ] {
        let product = store
            .insert_product(name, Money::from_cents(price_cents), stock)
            .await;
        tracing::info!(product_id = %product.id, name = %product.name, "seeded product");
    }
}
