//! HTTP surface: one route group per role under `/api/v1`.

use axum::{routing::get, Json, Router};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::aggregates::OrderStatus;
use crate::Marketplace;

mod admin;
pub mod error;
pub mod extract;
mod supplier;
mod vendor;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub marketplace: Marketplace,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<OrderStatus>,
}

pub fn router(marketplace: Marketplace) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bazaar-setu"})) }))
        .nest("/api/v1/supplier", supplier::routes())
        .nest("/api/v1/vendor", vendor::routes())
        .nest("/api/v1/admin", admin::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { marketplace })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::AccountId;
    use crate::messaging::NoopPublisher;
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Marketplace::new(InMemoryStore::default(), Arc::new(NoopPublisher), "INR"))
    }

    async fn call(app: &Router, method: &str, uri: &str, who: Option<(AccountId, &str)>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = who {
            req = req.header("x-account-id", id.to_string()).header("x-account-role", role);
        }
        let req = match body {
            Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn pepper(quantity: u32) -> Value {
        json!({"name": "Black Pepper 1kg", "description": "Malabar", "category": "spices", "price": "5.00", "quantity": quantity})
    }

    fn order_for(product_id: &Value, quantity: i64) -> Value {
        json!({
            "items": [{"product_id": product_id, "quantity": quantity}],
            "shipping_address": {"street": "4 Market Lane", "city": "Kochi", "state": "KL", "zip_code": "682001", "country": "IN"}
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_caller_headers_are_required() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/v1/vendor/orders", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = call(&app, "GET", "/api/v1/vendor/orders", Some((AccountId::new(), "supplier")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_order_placement_over_http() {
        let app = app();
        let supplier = (AccountId::new(), "supplier");
        let vendor = (AccountId::new(), "vendor");

        let (status, product) = call(&app, "POST", "/api/v1/supplier/products", Some(supplier), Some(pepper(10))).await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = &product["id"];

        let (status, order) = call(&app, "POST", "/api/v1/vendor/orders", Some(vendor), Some(order_for(product_id, 3))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["total_amount"]["amount"], "15.00");
        assert_eq!(order["status"], "pending");
        assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));

        let (status, err) = call(&app, "POST", "/api/v1/vendor/orders", Some(vendor), Some(order_for(product_id, 8))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "insufficient_stock");
        assert_eq!(err["retryable"], true);
        assert_eq!(&err["product_id"], product_id);

        let uri = format!("/api/v1/vendor/products/{}", product_id.as_str().unwrap());
        let (_, current) = call(&app, "GET", &uri, Some(vendor), None).await;
        assert_eq!(current["available_quantity"], 7);
    }

    #[tokio::test]
    async fn test_invalid_order_bodies() {
        let app = app();
        let vendor = Some((AccountId::new(), "vendor"));

        let (status, err) = call(&app, "POST", "/api/v1/vendor/orders", vendor, Some(json!({"items": []}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"], "invalid_request");

        let missing = json!(AccountId::new().to_string());
        let (status, err) = call(&app, "POST", "/api/v1/vendor/orders", vendor, Some(order_for(&missing, 1))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"], "product_not_found");

        let (status, err) = call(&app, "POST", "/api/v1/vendor/orders", vendor, Some(order_for(&missing, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["retryable"], false);
    }

    #[tokio::test]
    async fn test_supplier_status_update_over_http() {
        let app = app();
        let supplier = (AccountId::new(), "supplier");
        let vendor = (AccountId::new(), "vendor");
        let (_, product) = call(&app, "POST", "/api/v1/supplier/products", Some(supplier), Some(pepper(4))).await;
        let (_, order) = call(&app, "POST", "/api/v1/vendor/orders", Some(vendor), Some(order_for(&product["id"], 1))).await;
        let uri = format!("/api/v1/supplier/orders/{}/status", order["id"].as_str().unwrap());

        let (status, err) = call(&app, "PUT", &uri, Some(supplier), Some(json!({"status": "shipped"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"], "invalid_status_transition");

        let (status, updated) = call(&app, "PUT", &uri, Some(supplier), Some(json!({"status": "confirmed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "confirmed");

        let (_, listed) = call(&app, "GET", "/api/v1/supplier/orders?status=confirmed", Some(supplier), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let (_, all) = call(&app, "GET", "/api/v1/admin/transactions", Some((AccountId::new(), "admin")), None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    }
}
