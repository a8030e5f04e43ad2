use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_ALERTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DelayedDelivery,
    AgentsUnavailable,
    UnassignedDeliveries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub active_deliveries: usize,
    pub available_agents: usize,
    pub unavailable_agents: usize,
    pub total_deliveries: usize,
    pub completed_deliveries: usize,
    pub delayed_deliveries: usize,
    pub unassigned_deliveries: usize,
    pub total_delivery_minutes: i64,
    pub average_delivery_minutes: Option<f64>,
    pub pending_applications: usize,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub snapshot: DashboardSnapshot,
    pub last_updated: Option<DateTime<Utc>>,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
