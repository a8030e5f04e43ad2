use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::application::{AgentApplication, ApplicationStatus, RejectionCategory, VehicleType};
use crate::state::AppState;
use crate::workflows::applications::{self, ApplicationFilter, ApplicationSubmission, Approval};
use crate::workflows::{Page, PageRequest};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/applications", post(submit_application).get(list_applications))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/approve", post(approve_application))
        .route("/applications/:id/reject", post(reject_application))
        .route("/rejection-reasons", get(rejection_reasons))
}

#[derive(Deserialize)]
pub struct ListApplicationsQuery {
    pub status: Option<ApplicationStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub hub: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub approved_by: String,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: String,
    pub rejected_by: String,
}

#[derive(Serialize)]
pub struct RejectionReasonEntry {
    pub code: RejectionCategory,
    pub label: &'static str,
    pub requires_details: bool,
}

async fn submit_application(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ApplicationSubmission>,
) -> Result<Json<AgentApplication>, AppError> {
    applications::submit(&state, payload).map(Json)
}

async fn list_applications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Page<AgentApplication>>, AppError> {
    let filter = ApplicationFilter {
        status: query.status,
        vehicle_type: query.vehicle_type,
        hub: query.hub,
    };
    let page = PageRequest {
        limit: query.limit,
        offset: query.offset,
    };

    applications::list(&state, &filter, page).map(Json)
}

async fn get_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentApplication>, AppError> {
    applications::get(&state, &id).map(Json)
}

async fn approve_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<Approval>, AppError> {
    applications::approve(&state, &id, &payload.approved_by).map(Json)
}

async fn reject_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<AgentApplication>, AppError> {
    applications::reject(&state, &id, &payload.reason, &payload.rejected_by).map(Json)
}

async fn rejection_reasons() -> Json<Vec<RejectionReasonEntry>> {
    let entries = RejectionCategory::CATALOG
        .into_iter()
        .map(|category| RejectionReasonEntry {
            code: category,
            label: category.label(),
            requires_details: category == RejectionCategory::Other,
        })
        .collect();
    Json(entries)
}
