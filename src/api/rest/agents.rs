use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::agent::{Agent, Availability};
use crate::models::delivery::GeoPoint;
use crate::state::AppState;
use crate::workflows::agents::{self, AgentFilter};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/agents/:id", get(get_agent))
        .route("/agents/:id/availability", patch(update_availability))
        .route("/agents/:id/location", patch(update_location))
        .route("/agents/:id/rating", patch(update_rating))
}

#[derive(Deserialize)]
pub struct ListAgentsQuery {
    pub availability: Option<Availability>,
    pub hub: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability: Availability,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: f64,
}

async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAgentsQuery>,
) -> Result<Json<Vec<Agent>>, AppError> {
    let filter = AgentFilter {
        availability: query.availability,
        hub: query.hub,
    };
    agents::list(&state, &filter).map(Json)
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Agent>, AppError> {
    agents::get(&state, &id).map(Json)
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Agent>, AppError> {
    agents::set_availability(&state, &id, payload.availability).map(Json)
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Agent>, AppError> {
    agents::set_location(&state, &id, payload.location).map(Json)
}

async fn update_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRatingRequest>,
) -> Result<Json<Agent>, AppError> {
    agents::set_rating(&state, &id, payload.rating).map(Json)
}
