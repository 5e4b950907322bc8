//! JSON HTTP surface. Handlers stay thin; all checkout/payment logic lives
//! in the services.

use crate::checkout::{CheckoutReceipt, CheckoutService};
use crate::domain::aggregates::{Order, Payment, Product};
use crate::domain::ports::{Catalog, OrderStore};
use crate::domain::value_objects::Money;
use crate::error::{CommerceError, Result};
use crate::gateway::CallbackPayload;
use crate::infrastructure::SessionCarts;
use crate::payments::{PaymentService, PaymentSession, ReconcileOutcome};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub orders: Arc<dyn OrderStore>,
    pub carts: SessionCarts,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentService>,
    pub currency: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item))
        .route(
            "/api/v1/cart/:session/items/:product_id",
            axum::routing::delete(remove_item),
        )
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/orders/:id", get(get_order))
        .route(
            "/api/v1/orders/:id/payment",
            get(get_order_payment).post(start_payment),
        )
        .route("/api/v1/payments/callback", post(payment_callback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn validated<T: Validate>(value: T) -> Result<T> {
    value
        .validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    Ok(value)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "kirana-commerce" }))
}

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_in_stock().await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
}

async fn create_product(
    State(s): State<AppState>,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let r = validated(r)?;
    let product = Product::new(r.name, Money::new(r.price, &s.currency), r.stock);
    s.catalog.insert_product(product.clone()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let cart = s.carts.cart(&session).await;
    let products = s.catalog.products_by_ids(&cart.product_ids()).await?;
    let view = cart.resolve(&products, &s.currency);
    Ok(Json(serde_json::json!({
        "lines": view.lines,
        "total": view.total(),
    })))
}

fn default_qty() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_qty")]
    #[validate(range(min = 1))]
    pub qty: u32,
}

async fn add_item(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<StatusCode> {
    let r = validated(r)?;
    s.carts.add_item(&session, r.product_id, r.qty).await;
    Ok(StatusCode::CREATED)
}

async fn remove_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
) -> StatusCode {
    s.carts.remove_item(&session, product_id).await;
    StatusCode::NO_CONTENT
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    s.carts.clear(&session).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub session_id: String,
    pub user_id: Uuid,
    #[validate(email)]
    pub email: String,
}

async fn checkout(
    State(s): State<AppState>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutReceipt>)> {
    let r = validated(r)?;
    let receipt = s
        .checkout
        .create_order(r.user_id, &r.email, &r.session_id)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let order = s
        .orders
        .order(id)
        .await?
        .ok_or_else(|| CommerceError::OrderNotFound(id.to_string()))?;
    Ok(Json(order))
}

async fn get_order_payment(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>> {
    let payment = s
        .orders
        .payment_for_order(id)
        .await?
        .ok_or(CommerceError::PaymentRecordMissing(id))?;
    Ok(Json(payment))
}

async fn start_payment(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentSession>> {
    Ok(Json(s.payments.start_payment(id).await?))
}

/// Accepts the gateway's callback in either form-encoded or JSON form.
async fn payment_callback(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let payload = CallbackPayload::from_body(content_type, &body)?;
    let outcome = s.payments.reconcile(&payload).await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "already_paid": outcome == ReconcileOutcome::AlreadyPaid,
    })))
}
