use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::config::Config;
use crate::models::dashboard::DashboardView;
use crate::models::notification::{Notification, WorkflowEvent};
use crate::observability::metrics::Metrics;
use crate::storage::{
    AgentRepository, ApplicationRepository, DeliveryRepository, DocumentStore, Repositories,
};

pub struct AppState {
    pub config: Config,
    pub applications: Arc<dyn ApplicationRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
    pub documents: Arc<dyn DocumentStore>,
    pub notification_tx: mpsc::Sender<Notification>,
    pub events_tx: broadcast::Sender<WorkflowEvent>,
    pub dashboard_tx: watch::Sender<DashboardView>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: Config,
        repositories: Repositories,
    ) -> (Self, mpsc::Receiver<Notification>) {
        let (notification_tx, notification_rx) = mpsc::channel(config.notification_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let (dashboard_tx, _unused_rx) = watch::channel(DashboardView::default());

        (
            Self {
                config,
                applications: repositories.applications,
                agents: repositories.agents,
                deliveries: repositories.deliveries,
                documents: repositories.documents,
                notification_tx,
                events_tx,
                dashboard_tx,
                metrics: Metrics::new(),
            },
            notification_rx,
        )
    }

    pub fn in_memory(config: Config) -> (Self, mpsc::Receiver<Notification>) {
        Self::new(config, Repositories::in_memory())
    }

    pub fn publish(&self, event: WorkflowEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn dashboard(&self) -> DashboardView {
        self.dashboard_tx.borrow().clone()
    }
}
