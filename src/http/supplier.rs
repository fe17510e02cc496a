use axum::{extract::State, http::StatusCode, routing::{get, post, put}, Router};
use serde::Deserialize;

use crate::domain::aggregates::{NewProduct, Order, Product, ProductUpdate};
use crate::domain::value_objects::{OrderId, ProductId};
use crate::http::extract::{Json, Path, Query, SupplierCaller};
use crate::http::{ApiError, AppState, StatusFilter};
use crate::services::StatusUpdate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id/restock", post(restock))
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", put(update_order_status))
}

#[derive(Debug, Deserialize)]
pub struct Restock { pub quantity: u32 }

async fn create_product(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = s.marketplace.catalog.create_product(supplier, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(s.marketplace.catalog.list_supplier_products(supplier).await?))
}

async fn update_product(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(s.marketplace.catalog.update_product(supplier, id, update).await?))
}

async fn restock(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
    Path(id): Path<ProductId>,
    Json(r): Json<Restock>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(s.marketplace.catalog.restock(supplier, id, r.quantity).await?))
}

async fn list_orders(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
    Query(f): Query<StatusFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(s.marketplace.orders.list_supplier_orders(supplier, f.status).await?))
}

async fn update_order_status(
    State(s): State<AppState>,
    SupplierCaller(supplier): SupplierCaller,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(s.marketplace.orders.update_order_status(supplier, id, update).await?))
}
