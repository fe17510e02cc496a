use axum::{extract::State, http::StatusCode, routing::get, Router};

use crate::domain::aggregates::{Order, Product};
use crate::domain::value_objects::{OrderId, ProductId};
use crate::http::extract::{Json, Path, Query, VendorCaller};
use crate::http::{ApiError, AppState};
use crate::placement::PlaceOrder;
use crate::services::ProductQuery;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(search_products))
        .route("/products/:id", get(get_product))
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", get(track_order))
}

async fn search_products(
    State(s): State<AppState>,
    _vendor: VendorCaller,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(s.marketplace.catalog.search(query).await?))
}

async fn get_product(
    State(s): State<AppState>,
    _vendor: VendorCaller,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(s.marketplace.catalog.get_product(id).await?))
}

async fn place_order(
    State(s): State<AppState>,
    VendorCaller(vendor): VendorCaller,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let orders = s.marketplace.orders.clone();
    // Detached so a dropped connection cannot abandon the transaction midway.
    let order = tokio::spawn(async move { orders.place_order(vendor, request).await })
        .await
        .map_err(|e| ApiError::internal(format!("placement task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(s): State<AppState>,
    VendorCaller(vendor): VendorCaller,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(s.marketplace.orders.list_vendor_orders(vendor).await?))
}

async fn track_order(
    State(s): State<AppState>,
    VendorCaller(vendor): VendorCaller,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(s.marketplace.orders.track_order(vendor, id).await?))
}
