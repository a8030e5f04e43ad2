use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::AutoAssignment;
use crate::models::delivery::{DeliveryStatus, DeliveryView};
use crate::state::AppState;
use crate::workflows::deliveries::{self, DeliveryFilter, PlaceDelivery};
use crate::workflows::{Page, PageRequest};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(place_delivery).get(list_deliveries))
        .route("/deliveries/overdue", get(list_overdue))
        .route("/deliveries/:tracking_number", get(get_delivery))
        .route("/deliveries/:tracking_number/assign", post(assign_delivery))
        .route("/deliveries/:tracking_number/auto-assign", post(auto_assign_delivery))
        .route("/deliveries/:tracking_number/pickup", post(mark_picked_up))
        .route("/deliveries/:tracking_number/in-transit", post(mark_in_transit))
        .route("/deliveries/:tracking_number/deliver", post(mark_delivered))
        .route("/deliveries/:tracking_number/delay", post(mark_delayed))
        .route("/deliveries/:tracking_number/clear-delay", post(clear_delay))
        .route("/deliveries/:tracking_number/cancel", post(cancel_delivery))
}

#[derive(Deserialize)]
pub struct ListDeliveriesQuery {
    pub status: Option<DeliveryStatus>,
    pub agent_id: Option<Uuid>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub agent_id: Uuid,
}

#[derive(Deserialize)]
pub struct DelayRequest {
    pub estimated_delivery_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

async fn place_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceDelivery>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::place(&state, payload).map(|delivery| Json(delivery.into()))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDeliveriesQuery>,
) -> Result<Json<Page<DeliveryView>>, AppError> {
    let filter = DeliveryFilter {
        status: query.status,
        agent_id: query.agent_id,
    };
    let page = PageRequest {
        limit: query.limit,
        offset: query.offset,
    };

    let page = deliveries::list(&state, &filter, page)?;
    Ok(Json(Page {
        items: page.items.into_iter().map(DeliveryView::from).collect(),
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

async fn list_overdue(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DeliveryView>>, AppError> {
    let overdue = deliveries::overdue(&state, Utc::now())?;
    Ok(Json(overdue.into_iter().map(DeliveryView::from).collect()))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::get(&state, &tracking_number).map(|delivery| Json(delivery.into()))
}

async fn assign_delivery(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::assign(&state, &tracking_number, &payload.agent_id)
        .map(|delivery| Json(delivery.into()))
}

async fn auto_assign_delivery(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<AutoAssignment>, AppError> {
    deliveries::auto_assign(&state, &tracking_number).map(Json)
}

async fn mark_picked_up(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::mark_picked_up(&state, &tracking_number).map(|delivery| Json(delivery.into()))
}

async fn mark_in_transit(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::mark_in_transit(&state, &tracking_number).map(|delivery| Json(delivery.into()))
}

async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::mark_delivered(&state, &tracking_number).map(|delivery| Json(delivery.into()))
}

async fn mark_delayed(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
    Json(payload): Json<DelayRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::mark_delayed(
        &state,
        &tracking_number,
        payload.estimated_delivery_at,
        payload.reason,
    )
    .map(|delivery| Json(delivery.into()))
}

async fn clear_delay(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::clear_delay(&state, &tracking_number).map(|delivery| Json(delivery.into()))
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    deliveries::cancel(&state, &tracking_number, &payload.reason)
        .map(|delivery| Json(delivery.into()))
}
