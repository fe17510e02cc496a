use axum::{extract::State, http::StatusCode, routing::{get, post, put}, Router};
use serde::Deserialize;

use crate::domain::aggregates::{Complaint, ComplaintStatus, ComplaintUpdate, NewComplaint, Order, Priority};
use crate::domain::value_objects::ComplaintId;
use crate::http::extract::{AdminCaller, Json, Path, Query};
use crate::http::{ApiError, AppState, StatusFilter};
use crate::services::ResolveComplaint;
use crate::store::ComplaintFilter;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/complaints", get(list_complaints).post(open_complaint))
        .route("/complaints/:id", put(update_complaint))
        .route("/complaints/:id/resolve", post(resolve_complaint))
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplaintParams {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<Priority>,
}

async fn list_transactions(
    State(s): State<AppState>,
    _admin: AdminCaller,
    Query(f): Query<StatusFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(s.marketplace.orders.list_transactions(f.status).await?))
}

async fn open_complaint(
    State(s): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Json(input): Json<NewComplaint>,
) -> Result<(StatusCode, Json<Complaint>), ApiError> {
    let complaint = s.marketplace.complaints.open_complaint(admin, input).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

async fn list_complaints(
    State(s): State<AppState>,
    _admin: AdminCaller,
    Query(p): Query<ComplaintParams>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let filter = ComplaintFilter { status: p.status, priority: p.priority };
    Ok(Json(s.marketplace.complaints.list_complaints(filter).await?))
}

async fn update_complaint(
    State(s): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<ComplaintId>,
    Json(update): Json<ComplaintUpdate>,
) -> Result<Json<Complaint>, ApiError> {
    Ok(Json(s.marketplace.complaints.update_complaint(id, update).await?))
}

async fn resolve_complaint(
    State(s): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<ComplaintId>,
    Json(input): Json<ResolveComplaint>,
) -> Result<Json<Complaint>, ApiError> {
    Ok(Json(s.marketplace.complaints.resolve_complaint(id, input).await?))
}
