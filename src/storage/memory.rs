use axum::body::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    AgentRepository, ApplicationRepository, CasOutcome, DeliveryRepository, DocumentStore,
    StorageError, StoredDocument,
};
use crate::models::agent::Agent;
use crate::models::application::{AgentApplication, ApplicationStatus};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::document::DocumentRef;

#[derive(Default)]
pub struct InMemoryApplicationRepository {
    records: DashMap<Uuid, AgentApplication>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: AgentApplication) -> Result<(), StorageError> {
        match self.records.entry(application.id) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "application {} already exists",
                application.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(application);
                Ok(())
            }
        }
    }

    fn get(&self, id: &Uuid) -> Result<Option<AgentApplication>, StorageError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    fn list(&self) -> Result<Vec<AgentApplication>, StorageError> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        mut next: AgentApplication,
    ) -> Result<CasOutcome<ApplicationStatus>, StorageError> {
        let Some(mut current) = self.records.get_mut(&next.id) else {
            return Ok(CasOutcome::Missing);
        };

        if current.version != expected_version {
            return Ok(CasOutcome::Stale {
                current: current.status,
            });
        }

        next.version = expected_version + 1;
        *current = next;
        Ok(CasOutcome::Applied)
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    records: DashMap<Uuid, Agent>,
}

impl AgentRepository for InMemoryAgentRepository {
    fn insert_new(&self, agent: Agent) -> Result<(), StorageError> {
        match self.records.entry(agent.id) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "agent {} already exists",
                agent.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(agent);
                Ok(())
            }
        }
    }

    fn get(&self, id: &Uuid) -> Result<Option<Agent>, StorageError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    fn list(&self) -> Result<Vec<Agent>, StorageError> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn modify(
        &self,
        id: &Uuid,
        update: &mut dyn FnMut(&mut Agent),
    ) -> Result<Option<Agent>, StorageError> {
        let Some(mut agent) = self.records.get_mut(id) else {
            return Ok(None);
        };
        update(agent.value_mut());
        Ok(Some(agent.value().clone()))
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }
}

#[derive(Default)]
pub struct InMemoryDeliveryRepository {
    records: DashMap<String, Delivery>,
}

impl DeliveryRepository for InMemoryDeliveryRepository {
    fn insert(&self, delivery: Delivery) -> Result<(), StorageError> {
        match self.records.entry(delivery.tracking_number.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "delivery {} already exists",
                delivery.tracking_number
            ))),
            Entry::Vacant(slot) => {
                slot.insert(delivery);
                Ok(())
            }
        }
    }

    fn get(&self, tracking_number: &str) -> Result<Option<Delivery>, StorageError> {
        Ok(self
            .records
            .get(tracking_number)
            .map(|entry| entry.value().clone()))
    }

    fn list(&self) -> Result<Vec<Delivery>, StorageError> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        mut next: Delivery,
    ) -> Result<CasOutcome<DeliveryStatus>, StorageError> {
        let Some(mut current) = self.records.get_mut(&next.tracking_number) else {
            return Ok(CasOutcome::Missing);
        };

        if current.version != expected_version {
            return Ok(CasOutcome::Stale {
                current: current.status,
            });
        }

        next.version = expected_version + 1;
        *current = next;
        Ok(CasOutcome::Applied)
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    blobs: DashMap<String, StoredDocument>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, content_type: &str, bytes: Bytes) -> Result<DocumentRef, StorageError> {
        let storage_key = format!("doc-{}", Uuid::new_v4().simple());
        self.blobs.insert(
            storage_key.clone(),
            StoredDocument {
                content_type: content_type.to_string(),
                bytes,
            },
        );

        Ok(DocumentRef {
            storage_key,
            content_type: content_type.to_string(),
        })
    }

    fn get(&self, storage_key: &str) -> Result<Option<StoredDocument>, StorageError> {
        Ok(self.blobs.get(storage_key).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::InMemoryApplicationRepository;
    use crate::models::application::{
        AgentApplication, ApplicantDetails, ApplicationStatus, ContactInfo, GovernmentIdType,
        VehicleType,
    };
    use crate::models::document::DocumentSet;
    use crate::storage::{ApplicationRepository, CasOutcome, StorageError};

    fn application() -> AgentApplication {
        AgentApplication::new(
            ApplicantDetails {
                name: "Asha".to_string(),
                contact: ContactInfo {
                    email: "asha@example.com".to_string(),
                    phone: "+91 90000 00000".to_string(),
                },
                age: 29,
                gender: "female".to_string(),
                government_id_type: GovernmentIdType::NationalId,
                vehicle_type: VehicleType::Scooter,
                vehicle_registration_number: "KA01AB1234".to_string(),
                hub: None,
            },
            DocumentSet::default(),
            Utc::now(),
        )
    }

    #[test]
    fn duplicate_insert_is_a_conflict() {
        let repo = InMemoryApplicationRepository::default();
        let app = application();
        repo.insert(app.clone()).unwrap();
        assert!(matches!(repo.insert(app), Err(StorageError::Conflict(_))));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let repo = InMemoryApplicationRepository::default();
        let app = application();
        repo.insert(app.clone()).unwrap();

        let mut approved = app.clone();
        approved.status = ApplicationStatus::Approved;
        assert_eq!(
            repo.compare_and_swap(app.version, approved).unwrap(),
            CasOutcome::Applied
        );
        assert_eq!(repo.get(&app.id).unwrap().unwrap().version, app.version + 1);

        let mut rejected = app.clone();
        rejected.status = ApplicationStatus::Rejected;
        assert_eq!(
            repo.compare_and_swap(app.version, rejected).unwrap(),
            CasOutcome::Stale {
                current: ApplicationStatus::Approved
            }
        );
    }

    #[test]
    fn same_status_write_still_invalidates_older_snapshots() {
        let repo = InMemoryApplicationRepository::default();
        let app = application();
        repo.insert(app.clone()).unwrap();

        let mut touched = app.clone();
        touched.processed_by = Some("reviewer-1".to_string());
        assert_eq!(
            repo.compare_and_swap(app.version, touched).unwrap(),
            CasOutcome::Applied
        );

        let mut approved = app.clone();
        approved.status = ApplicationStatus::Approved;
        assert_eq!(
            repo.compare_and_swap(app.version, approved).unwrap(),
            CasOutcome::Stale {
                current: ApplicationStatus::Pending
            }
        );
        let stored = repo.get(&app.id).unwrap().unwrap();
        assert_eq!(stored.processed_by.as_deref(), Some("reviewer-1"));
    }

    #[test]
    fn compare_and_swap_on_unknown_record_reports_missing() {
        let repo = InMemoryApplicationRepository::default();
        assert_eq!(
            repo.compare_and_swap(0, application()).unwrap(),
            CasOutcome::Missing
        );
    }
}
