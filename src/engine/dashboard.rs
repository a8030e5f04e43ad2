use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::agent::{Agent, Availability};
use crate::models::application::{AgentApplication, ApplicationStatus};
use crate::models::dashboard::{Alert, AlertKind, DashboardSnapshot, DashboardView, MAX_ALERTS};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn compute_snapshot(
    applications: &[AgentApplication],
    agents: &[Agent],
    deliveries: &[Delivery],
) -> DashboardSnapshot {
    let mut snapshot = DashboardSnapshot {
        total_deliveries: deliveries.len(),
        ..DashboardSnapshot::default()
    };

    let mut timed_deliveries = 0usize;
    for delivery in deliveries {
        if delivery.status.is_active() {
            snapshot.active_deliveries += 1;
        }
        match delivery.status {
            DeliveryStatus::Delivered => {
                snapshot.completed_deliveries += 1;
                // Deliveries missing a timestamp are left out of the totals.
                if let Some(minutes) = delivery.delivery_minutes() {
                    snapshot.total_delivery_minutes += minutes.max(0);
                    timed_deliveries += 1;
                }
            }
            DeliveryStatus::Delayed => snapshot.delayed_deliveries += 1,
            DeliveryStatus::Pending if delivery.agent_id.is_none() => {
                snapshot.unassigned_deliveries += 1
            }
            _ => {}
        }
    }
    if timed_deliveries > 0 {
        snapshot.average_delivery_minutes =
            Some(snapshot.total_delivery_minutes as f64 / timed_deliveries as f64);
    }

    for agent in agents {
        match agent.availability {
            Availability::Available => snapshot.available_agents += 1,
            Availability::Unavailable => snapshot.unavailable_agents += 1,
        }
    }

    snapshot.pending_applications = applications
        .iter()
        .filter(|application| application.status == ApplicationStatus::Pending)
        .count();

    snapshot.alerts = build_alerts(agents, deliveries);
    snapshot
}

fn build_alerts(agents: &[Agent], deliveries: &[Delivery]) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = deliveries
        .iter()
        .filter(|delivery| delivery.status == DeliveryStatus::Delayed)
        .map(|delivery| Alert {
            kind: AlertKind::DelayedDelivery,
            message: match &delivery.delay_reason {
                Some(reason) => format!(
                    "Delivery {} is delayed ({reason}); new ETA {}",
                    delivery.tracking_number,
                    delivery.estimated_delivery_at.to_rfc3339()
                ),
                None => format!(
                    "Delivery {} is delayed; new ETA {}",
                    delivery.tracking_number,
                    delivery.estimated_delivery_at.to_rfc3339()
                ),
            },
            tracking_number: Some(delivery.tracking_number.clone()),
            raised_at: delivery.updated_at,
        })
        .collect();

    let unavailable: Vec<&Agent> = agents
        .iter()
        .filter(|agent| agent.availability == Availability::Unavailable)
        .collect();
    if let Some(raised_at) = unavailable.iter().map(|agent| agent.updated_at).max() {
        alerts.push(Alert {
            kind: AlertKind::AgentsUnavailable,
            message: format!("{} agent(s) currently unavailable", unavailable.len()),
            tracking_number: None,
            raised_at,
        });
    }

    let unassigned: Vec<&Delivery> = deliveries
        .iter()
        .filter(|delivery| delivery.status == DeliveryStatus::Pending && delivery.agent_id.is_none())
        .collect();
    if let Some(raised_at) = unassigned.iter().map(|delivery| delivery.created_at).max() {
        alerts.push(Alert {
            kind: AlertKind::UnassignedDeliveries,
            message: format!("{} delivery(ies) awaiting assignment", unassigned.len()),
            tracking_number: None,
            raised_at,
        });
    }

    alerts.sort_by(|a, b| {
        b.raised_at
            .cmp(&a.raised_at)
            .then_with(|| a.tracking_number.cmp(&b.tracking_number))
    });
    alerts.truncate(MAX_ALERTS);
    alerts
}

fn collect_snapshot(state: &AppState) -> Result<DashboardSnapshot, StorageError> {
    let applications = state.applications.list()?;
    let agents = state.agents.list()?;
    let deliveries = state.deliveries.list()?;
    Ok(compute_snapshot(&applications, &agents, &deliveries))
}

/// Recomputes and publishes the dashboard. A failed read keeps the previous
/// snapshot and its timestamp and flags the view as stale.
pub fn refresh(state: &AppState) -> DashboardView {
    let start = Instant::now();

    match collect_snapshot(state) {
        Ok(snapshot) => {
            state.metrics.observe_refresh("success", start.elapsed().as_secs_f64());
            state
                .metrics
                .dashboard_active_deliveries
                .set(snapshot.active_deliveries as i64);
            state
                .metrics
                .dashboard_available_agents
                .set(snapshot.available_agents as i64);
            state
                .metrics
                .dashboard_pending_applications
                .set(snapshot.pending_applications as i64);

            debug!(
                active_deliveries = snapshot.active_deliveries,
                pending_applications = snapshot.pending_applications,
                alerts = snapshot.alerts.len(),
                "dashboard refreshed"
            );

            let now = Utc::now();
            state.dashboard_tx.send_modify(|view| {
                view.snapshot = snapshot;
                view.last_updated = Some(now);
                view.stale = false;
                view.last_error = None;
            });
        }
        Err(err) => {
            state.metrics.observe_refresh("error", start.elapsed().as_secs_f64());
            warn!(error = %err, "dashboard refresh failed; serving last snapshot as stale");

            state.dashboard_tx.send_modify(|view| {
                view.stale = true;
                view.last_error = Some(err.to_string());
            });
        }
    }

    state.dashboard()
}

pub async fn run_dashboard_refresher(state: Arc<AppState>, period: Duration) {
    info!(period_secs = period.as_secs(), "dashboard refresher started");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        refresh(&state);
    }
}
