use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::document::{DocumentSet, DocumentsStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernmentIdType {
    NationalId,
    Passport,
    DriversLicense,
    VoterId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Bicycle,
    Scooter,
    Motorcycle,
    Car,
    Van,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub name: String,
    pub contact: ContactInfo,
    pub age: u8,
    pub gender: String,
    pub government_id_type: GovernmentIdType,
    pub vehicle_type: VehicleType,
    pub vehicle_registration_number: String,
    #[serde(default)]
    pub hub: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentApplication {
    pub id: Uuid,
    pub applicant: ApplicantDetails,
    pub documents: DocumentSet,
    pub documents_status: DocumentsStatus,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    /// Bumped on every committed write.
    pub version: u64,
}

impl AgentApplication {
    pub fn new(applicant: ApplicantDetails, documents: DocumentSet, applied_at: DateTime<Utc>) -> Self {
        let documents_status = documents.status();
        Self {
            id: Uuid::new_v4(),
            applicant,
            documents,
            documents_status,
            status: ApplicationStatus::Pending,
            rejection_reason: None,
            applied_at,
            processed_at: None,
            processed_by: None,
            version: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    IncompleteDocuments,
    InvalidIdentityDocument,
    VehicleNotEligible,
    FailedBackgroundVerification,
    ApplicantUnreachable,
    Other,
}

impl RejectionCategory {
    pub const CATALOG: [RejectionCategory; 6] = [
        RejectionCategory::IncompleteDocuments,
        RejectionCategory::InvalidIdentityDocument,
        RejectionCategory::VehicleNotEligible,
        RejectionCategory::FailedBackgroundVerification,
        RejectionCategory::ApplicantUnreachable,
        RejectionCategory::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RejectionCategory::IncompleteDocuments => "Incomplete documents",
            RejectionCategory::InvalidIdentityDocument => "Invalid identity document",
            RejectionCategory::VehicleNotEligible => "Vehicle not eligible",
            RejectionCategory::FailedBackgroundVerification => "Failed background verification",
            RejectionCategory::ApplicantUnreachable => "Applicant unreachable",
            RejectionCategory::Other => "Other",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        Self::CATALOG
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Reason accepted by the reject operation after catalog lookup and bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason {
    pub category: RejectionCategory,
    pub text: String,
}

impl RejectionReason {
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("rejection reason cannot be empty".to_string());
        }

        match RejectionCategory::from_label(trimmed) {
            Some(RejectionCategory::Other) => {
                Err("a rejection marked Other needs its own justification".to_string())
            }
            Some(category) => Ok(Self {
                category,
                text: category.label().to_string(),
            }),
            None => {
                let len = trimmed.chars().count();
                if len > max_len {
                    return Err(format!(
                        "rejection reason is {len} characters, limit is {max_len}"
                    ));
                }
                Ok(Self {
                    category: RejectionCategory::Other,
                    text: trimmed.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RejectionCategory, RejectionReason};

    #[test]
    fn catalog_reason_is_stored_canonically() {
        let reason = RejectionReason::parse("  incomplete DOCUMENTS ", 500).unwrap();
        assert_eq!(reason.category, RejectionCategory::IncompleteDocuments);
        assert_eq!(reason.text, "Incomplete documents");
    }

    #[test]
    fn free_text_is_bounded() {
        let ok = RejectionReason::parse("Registration plate does not match", 40).unwrap();
        assert_eq!(ok.category, RejectionCategory::Other);

        let too_long = "x".repeat(41);
        assert!(RejectionReason::parse(&too_long, 40).is_err());
    }

    #[test]
    fn empty_and_bare_other_are_rejected() {
        assert!(RejectionReason::parse("", 500).is_err());
        assert!(RejectionReason::parse("   ", 500).is_err());
        assert!(RejectionReason::parse("other", 500).is_err());
    }
}
