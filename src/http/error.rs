//! Mapping of service errors onto HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::ProductId;
use crate::placement::PlacementError;
use crate::store::StoreError;
use crate::MarketplaceError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: bool,
    product_id: Option<ProductId>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<ProductId>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into(), retryable: false, product_id: None }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message) }
    pub fn forbidden(message: impl Into<String>) -> Self { Self::new(StatusCode::FORBIDDEN, "forbidden", message) }
    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, "invalid_request", message) }
    pub fn internal(message: impl Into<String>) -> Self { Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message) }

    fn with_retry(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn code(&self) -> &'static str { self.code }
    pub fn is_retryable(&self) -> bool { self.retryable }
}

impl From<MarketplaceError> for ApiError {
    fn from(err: MarketplaceError) -> Self {
        let message = err.to_string();
        match err {
            MarketplaceError::ProductNotFound => Self::new(StatusCode::NOT_FOUND, "product_not_found", message),
            MarketplaceError::OrderNotFound => Self::new(StatusCode::NOT_FOUND, "order_not_found", message),
            MarketplaceError::ComplaintNotFound => Self::new(StatusCode::NOT_FOUND, "complaint_not_found", message),
            MarketplaceError::Validation(_) => Self::bad_request(message),
            MarketplaceError::Order(OrderError::InvalidStatusTransition { .. }) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_status_transition", message)
            }
            MarketplaceError::Order(OrderError::Finalized(_)) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "order_finalized", message)
            }
            MarketplaceError::Order(_) => Self::bad_request(message),
            MarketplaceError::Conflict(_) => {
                Self::new(StatusCode::CONFLICT, "transaction_conflict", message).with_retry()
            }
            MarketplaceError::Placement(e) => e.into(),
            MarketplaceError::Storage(e) => e.into(),
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        let status = match &err {
            PlacementError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PlacementError::ProductNotFound { .. } => StatusCode::NOT_FOUND,
            PlacementError::InsufficientStock { .. } | PlacementError::TransactionConflict(_) => StatusCode::CONFLICT,
            PlacementError::MultiSupplierOrderUnsupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            product_id: err.product_id(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "transaction_conflict", msg).with_retry(),
            other => {
                tracing::error!(error = %other, "storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "storage is unavailable")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { Self::new(rejection.status(), "invalid_request", rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self { Self::new(rejection.status(), "invalid_request", rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self { Self::bad_request(rejection.body_text()) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody { error: self.code, message: self.message, retryable: self.retryable, product_id: self.product_id };
        (self.status, axum::Json(body)).into_response()
    }
}
