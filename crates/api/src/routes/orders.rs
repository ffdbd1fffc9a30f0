//! Order placement, lifecycle, and admin endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, Page, PageRequest};
use domain::order::{CreateOrder, Order, OrderLifecycleManager, OrderStatus};
use domain::store::{OrderStore, Product, ProductCatalog};
use domain::OrderError;
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, AuthedUser};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub manager: OrderLifecycleManager<S>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl PageParams {
    fn into_request(self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.size.unwrap_or(defaults.size),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub owner_email: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub status: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let lines = order
            .lines
            .into_iter()
            .map(|line| OrderLineResponse {
                product_id: line.product_id.as_i64(),
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect();
        Self {
            id: order.id.as_i64(),
            owner_email: order.owner_email,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            status: order.status.as_str().to_string(),
            total_cents: order.total.cents(),
            created_at: order.created_at,
            lines,
        }
    }
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
        }
    }
}

// -- Handlers --

/// POST /api/orders — place a new order for the caller.
#[tracing::instrument(skip(state, request))]
pub async fn create<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthedUser(identity): AuthedUser,
    Json(request): Json<CreateOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.manager.create_order(request, &identity).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/orders — list the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthedUser(identity): AuthedUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.manager.list_for_owner(&identity).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/:id — load one order; owner or admin only.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthedUser(identity): AuthedUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.manager.get_order(OrderId::new(id), &identity).await?;
    Ok(Json(order.into()))
}

/// PUT /api/orders/:id/cancel — owner cancels their pending order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthedUser(identity): AuthedUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .manager
        .cancel_by_owner(OrderId::new(id), &identity)
        .await?;
    Ok(Json(order.into()))
}

/// GET /api/orders/admin/all — paged listing of every order.
#[tracing::instrument(skip(state))]
pub async fn admin_list<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(identity): AdminUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<OrderResponse>>, ApiError> {
    let page = state
        .manager
        .list_all(params.into_request(), &identity)
        .await?;
    Ok(Json(page.map(OrderResponse::from)))
}

/// GET /api/orders/admin/:id — load any order.
#[tracing::instrument(skip(state))]
pub async fn admin_get<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(identity): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.manager.get_order(OrderId::new(id), &identity).await?;
    Ok(Json(order.into()))
}

/// PUT /api/orders/admin/:id — set any order's status.
#[tracing::instrument(skip(state, request))]
pub async fn admin_update_status<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(identity): AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status = OrderStatus::parse(&request.status).ok_or_else(|| {
        ApiError::Order(OrderError::Validation(format!(
            "unrecognized status name: {}",
            request.status
        )))
    })?;

    let order = state
        .manager
        .update_status(OrderId::new(id), status, &identity)
        .await?;
    Ok(Json(order.into()))
}

/// GET /api/orders/admin/low-stock — products running low.
#[tracing::instrument(skip(state))]
pub async fn admin_low_stock<S: OrderStore + ProductCatalog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(identity): AdminUser,
    Query(params): Query<LowStockParams>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .manager
        .list_low_stock(params.threshold.unwrap_or(5), &identity)
        .await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}
