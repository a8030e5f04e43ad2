use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::DeliveryView;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub load_score: f64,
    pub rating_score: f64,
    pub experience_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoAssignment {
    pub delivery: DeliveryView,
    pub agent_id: Uuid,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
}
