pub mod memory;

use std::sync::Arc;

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::models::agent::Agent;
use crate::models::application::{AgentApplication, ApplicationStatus};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::document::DocumentRef;

pub use memory::{
    InMemoryAgentRepository, InMemoryApplicationRepository, InMemoryDeliveryRepository,
    InMemoryDocumentStore,
};

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),
}

/// Result of a version-guarded write. `Stale` carries the status found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome<S> {
    Applied,
    Stale { current: S },
    Missing,
}

pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: AgentApplication) -> Result<(), StorageError>;
    fn get(&self, id: &Uuid) -> Result<Option<AgentApplication>, StorageError>;
    fn list(&self) -> Result<Vec<AgentApplication>, StorageError>;
    /// Stores `next` at `expected_version + 1` if the record is still at
    /// `expected_version`.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: AgentApplication,
    ) -> Result<CasOutcome<ApplicationStatus>, StorageError>;

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }
}

pub trait AgentRepository: Send + Sync {
    /// Fails with `StorageError::Conflict` when the id is already taken.
    fn insert_new(&self, agent: Agent) -> Result<(), StorageError>;
    fn get(&self, id: &Uuid) -> Result<Option<Agent>, StorageError>;
    fn list(&self) -> Result<Vec<Agent>, StorageError>;
    /// Applies `update` under the record lock; `None` if the agent is unknown.
    fn modify(
        &self,
        id: &Uuid,
        update: &mut dyn FnMut(&mut Agent),
    ) -> Result<Option<Agent>, StorageError>;

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }
}

pub trait DeliveryRepository: Send + Sync {
    fn insert(&self, delivery: Delivery) -> Result<(), StorageError>;
    fn get(&self, tracking_number: &str) -> Result<Option<Delivery>, StorageError>;
    fn list(&self) -> Result<Vec<Delivery>, StorageError>;
    /// Stores `next` at `expected_version + 1` if the record is still at
    /// `expected_version`.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: Delivery,
    ) -> Result<CasOutcome<DeliveryStatus>, StorageError>;

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub content_type: String,
    pub bytes: Bytes,
}

pub trait DocumentStore: Send + Sync {
    fn put(&self, content_type: &str, bytes: Bytes) -> Result<DocumentRef, StorageError>;
    fn get(&self, storage_key: &str) -> Result<Option<StoredDocument>, StorageError>;
}

#[derive(Clone)]
pub struct Repositories {
    pub applications: Arc<dyn ApplicationRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            applications: Arc::new(InMemoryApplicationRepository::default()),
            agents: Arc::new(InMemoryAgentRepository::default()),
            deliveries: Arc::new(InMemoryDeliveryRepository::default()),
            documents: Arc::new(InMemoryDocumentStore::default()),
        }
    }
}
