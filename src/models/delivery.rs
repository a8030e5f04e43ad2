use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub pickup: Location,
    pub dropoff: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub contact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    Online,
    Prepaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub priority: Priority,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Delayed,
    Cancelled,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Assigned => "Assigned",
            DeliveryStatus::PickedUp => "Picked Up",
            DeliveryStatus::InTransit => "In Transit",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Delayed => "Delayed",
            DeliveryStatus::Cancelled => "Cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Assigned, picked up or in transit: an agent is actively working it.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Assigned | DeliveryStatus::PickedUp | DeliveryStatus::InTransit
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub tracking_number: String,
    pub customer: Customer,
    pub agent_id: Option<Uuid>,
    pub route: Route,
    pub package: Package,
    pub status: DeliveryStatus,
    /// Progression state a delayed delivery resumes into.
    pub delayed_from: Option<DeliveryStatus>,
    pub delay_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusChange>,
    /// Bumped on every committed write.
    pub version: u64,
}

impl Delivery {
    /// Position on the main sequence, looking through a delay.
    pub fn progress_status(&self) -> DeliveryStatus {
        match (self.status, self.delayed_from) {
            (DeliveryStatus::Delayed, Some(from)) => from,
            (status, _) => status,
        }
    }

    pub fn delivery_minutes(&self) -> Option<i64> {
        self.delivered_at
            .map(|delivered_at| (delivered_at - self.created_at).num_minutes())
    }
}

/// Delivery as rendered to callers, with its derived display label.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub status_label: &'static str,
}

impl From<Delivery> for DeliveryView {
    fn from(delivery: Delivery) -> Self {
        let status_label = delivery.status.label();
        Self {
            delivery,
            status_label,
        }
    }
}
