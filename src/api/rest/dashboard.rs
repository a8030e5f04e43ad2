use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::dashboard;
use crate::models::dashboard::DashboardView;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(get_dashboard))
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub refresh: bool,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardView> {
    if query.refresh {
        return Json(dashboard::refresh(&state));
    }
    Json(state.dashboard())
}
