use serde::{Deserialize, Serialize};

/// The four uploads an onboarding application is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdFront,
    IdBack,
    VehicleRegistrationCertificate,
    ProfileImage,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::IdFront,
        DocumentKind::IdBack,
        DocumentKind::VehicleRegistrationCertificate,
        DocumentKind::ProfileImage,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentKind::IdFront => "id_front",
            DocumentKind::IdBack => "id_back",
            DocumentKind::VehicleRegistrationCertificate => "vehicle_registration_certificate",
            DocumentKind::ProfileImage => "profile_image",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub storage_key: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    #[serde(default)]
    pub id_front: Option<DocumentRef>,
    #[serde(default)]
    pub id_back: Option<DocumentRef>,
    #[serde(default)]
    pub vehicle_registration_certificate: Option<DocumentRef>,
    #[serde(default)]
    pub profile_image: Option<DocumentRef>,
}

impl DocumentSet {
    pub fn get(&self, kind: DocumentKind) -> Option<&DocumentRef> {
        let slot = match kind {
            DocumentKind::IdFront => &self.id_front,
            DocumentKind::IdBack => &self.id_back,
            DocumentKind::VehicleRegistrationCertificate => &self.vehicle_registration_certificate,
            DocumentKind::ProfileImage => &self.profile_image,
        };
        slot.as_ref()
            .filter(|doc| !doc.storage_key.trim().is_empty())
    }

    pub fn slot_mut(&mut self, kind: DocumentKind) -> &mut Option<DocumentRef> {
        match kind {
            DocumentKind::IdFront => &mut self.id_front,
            DocumentKind::IdBack => &mut self.id_back,
            DocumentKind::VehicleRegistrationCertificate => {
                &mut self.vehicle_registration_certificate
            }
            DocumentKind::ProfileImage => &mut self.profile_image,
        }
    }

    pub fn missing(&self) -> Vec<DocumentKind> {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }

    pub fn status(&self) -> DocumentsStatus {
        if self.missing().is_empty() {
            DocumentsStatus::Complete
        } else {
            DocumentsStatus::Incomplete
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentsStatus {
    Complete,
    Incomplete,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAvailability {
    pub kind: DocumentKind,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{DocumentKind, DocumentRef, DocumentSet, DocumentsStatus};

    fn doc(key: &str) -> Option<DocumentRef> {
        Some(DocumentRef {
            storage_key: key.to_string(),
            content_type: "image/png".to_string(),
        })
    }

    #[test]
    fn all_four_documents_make_the_set_complete() {
        let set = DocumentSet {
            id_front: doc("a"),
            id_back: doc("b"),
            vehicle_registration_certificate: doc("c"),
            profile_image: doc("d"),
        };
        assert_eq!(set.status(), DocumentsStatus::Complete);
        assert!(set.missing().is_empty());
    }

    #[test]
    fn blank_storage_key_counts_as_absent() {
        let set = DocumentSet {
            id_front: doc("a"),
            id_back: doc("   "),
            vehicle_registration_certificate: doc("c"),
            profile_image: doc("d"),
        };
        assert_eq!(set.status(), DocumentsStatus::Incomplete);
        assert_eq!(set.missing(), vec![DocumentKind::IdBack]);
    }

    #[test]
    fn kind_parses_path_segments() {
        assert_eq!(
            DocumentKind::parse("vehicle_registration_certificate"),
            Some(DocumentKind::VehicleRegistrationCertificate)
        );
        assert_eq!(DocumentKind::parse("passport_scan"), None);
    }
}
