use std::sync::Arc;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

use crate::models::notification::{Notification, WorkflowEvent};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
}

pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            notification_id = %notification.id,
            kind = notification.kind.as_str(),
            recipient = %notification.recipient,
            subject_id = %notification.subject_id,
            "notification intent raised"
        );
        Ok(())
    }
}

/// Keeps every delivered notification in memory.
#[derive(Default)]
pub struct RecordingNotificationSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotificationSink {
    pub fn delivered(&self) -> Vec<Notification> {
        match self.delivered.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut guard = self
            .delivered
            .lock()
            .map_err(|_| NotificationError::Transport("recording sink poisoned".to_string()))?;
        guard.push(notification.clone());
        Ok(())
    }
}

/// Queues a notification for a transition that has already committed.
pub fn enqueue_notification(state: &AppState, notification: Notification) {
    let kind = notification.kind.as_str();

    state.publish(WorkflowEvent::NotificationRaised {
        notification: notification.clone(),
    });

    match state.notification_tx.try_send(notification) {
        Ok(()) => {
            state.metrics.notification_queue_depth.inc();
            state
                .metrics
                .notifications_total
                .with_label_values(&[kind, "queued"])
                .inc();
        }
        Err(TrySendError::Full(dropped)) => {
            state
                .metrics
                .notifications_total
                .with_label_values(&[kind, "dropped"])
                .inc();
            warn!(
                notification_id = %dropped.id,
                kind,
                "notification queue full; dropping notification"
            );
        }
        Err(TrySendError::Closed(dropped)) => {
            state
                .metrics
                .notifications_total
                .with_label_values(&[kind, "dropped"])
                .inc();
            warn!(
                notification_id = %dropped.id,
                kind,
                "notification queue closed; dropping notification"
            );
        }
    }
}

pub async fn run_notifier(
    state: Arc<AppState>,
    mut notification_rx: mpsc::Receiver<Notification>,
    sink: Arc<dyn NotificationSink>,
) {
    info!("notifier started");

    while let Some(notification) = notification_rx.recv().await {
        state.metrics.notification_queue_depth.dec();
        let kind = notification.kind.as_str();

        match sink.deliver(&notification) {
            Ok(()) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&[kind, "delivered"])
                    .inc();
            }
            Err(err) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&[kind, "failed"])
                    .inc();
                error!(
                    error = %err,
                    notification_id = %notification.id,
                    kind,
                    "failed to hand notification to sink"
                );
            }
        }
    }

    warn!("notifier stopped: queue channel closed");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{enqueue_notification, run_notifier, RecordingNotificationSink};
    use crate::config::Config;
    use crate::models::notification::{Notification, NotificationKind};
    use crate::state::AppState;

    #[tokio::test]
    async fn queued_notifications_reach_the_sink() {
        let (state, rx) = AppState::in_memory(Config::default());
        let state = Arc::new(state);
        let sink = Arc::new(RecordingNotificationSink::default());
        tokio::spawn(run_notifier(state.clone(), rx, sink.clone()));

        enqueue_notification(
            &state,
            Notification::new(
                NotificationKind::DeliveryDelivered,
                "reader@example.com",
                "TRK-1".to_string(),
            ),
        );

        for _ in 0..50 {
            if !sink.delivered().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].recipient, "reader@example.com");
    }

    #[test]
    fn full_queue_drops_without_failing() {
        let config = Config {
            notification_queue_size: 1,
            ..Config::default()
        };
        let (state, _rx) = AppState::in_memory(config);

        for _ in 0..3 {
            enqueue_notification(
                &state,
                Notification::new(
                    NotificationKind::ApplicationApproved,
                    "agent@example.com",
                    "app".to_string(),
                ),
            );
        }

        let dropped = state
            .metrics
            .notifications_total
            .with_label_values(&["application_approved", "dropped"])
            .get();
        assert_eq!(dropped, 2);
        assert_eq!(state.metrics.notification_queue_depth.get(), 1);
    }
}
