use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::ApplicationStatus;
use crate::models::delivery::DeliveryStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationApproved,
    ApplicationRejected,
    DeliveryDelivered,
    DeliveryDelayed,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ApplicationApproved => "application_approved",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::DeliveryDelivered => "delivery_delivered",
            NotificationKind::DeliveryDelayed => "delivery_delayed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient: &str, subject_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            recipient: recipient.to_string(),
            subject_id,
            reason: None,
            estimated_delivery_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_eta(mut self, eta: DateTime<Utc>) -> Self {
        self.estimated_delivery_at = Some(eta);
        self
    }
}

/// Live feed entries pushed to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    ApplicationSubmitted {
        application_id: Uuid,
    },
    ApplicationDecided {
        application_id: Uuid,
        status: ApplicationStatus,
    },
    DeliveryUpdated {
        tracking_number: String,
        status: DeliveryStatus,
        status_label: &'static str,
        agent_id: Option<Uuid>,
    },
    NotificationRaised {
        notification: Notification,
    },
}
