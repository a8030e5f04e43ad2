use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::{AgentApplication, ContactInfo, VehicleType};
use crate::models::delivery::GeoPoint;

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub vehicle_type: VehicleType,
    pub registration_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub contact: ContactInfo,
    pub hub: Option<String>,
    pub availability: Availability,
    pub vehicle: VehicleDescriptor,
    pub rating: f64,
    pub completed_deliveries: u32,
    pub location: Option<GeoPoint>,
    pub approved_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn from_application(
        application: &AgentApplication,
        approved_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let applicant = &application.applicant;
        Self {
            id: application.id,
            application_id: application.id,
            name: applicant.name.clone(),
            contact: applicant.contact.clone(),
            hub: applicant.hub.clone(),
            availability: Availability::Available,
            vehicle: VehicleDescriptor {
                vehicle_type: applicant.vehicle_type,
                registration_number: applicant.vehicle_registration_number.clone(),
            },
            rating: 0.0,
            completed_deliveries: 0,
            location: None,
            approved_by: approved_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        return 0.0;
    }
    rating.clamp(0.0, MAX_RATING)
}
