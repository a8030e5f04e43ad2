use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::eta::{estimate_delivery_at, is_overdue};
use crate::engine::notifier::enqueue_notification;
use crate::engine::scoring::rank_agents;
use crate::error::AppError;
use crate::geo::is_valid_point;
use crate::models::agent::Availability;
use crate::models::assignment::AutoAssignment;
use crate::models::delivery::{
    Customer, Delivery, DeliveryStatus, Location, Package, Route, StatusChange,
};
use crate::models::notification::{Notification, NotificationKind, WorkflowEvent};
use crate::state::AppState;
use crate::storage::CasOutcome;
use crate::workflows::{Page, PageRequest};

const WORKFLOW: &str = "delivery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    Assign,
    PickUp,
    StartTransit,
    Deliver,
    Delay,
    ClearDelay,
    Cancel,
}

impl DeliveryAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryAction::Assign => "assign",
            DeliveryAction::PickUp => "pick_up",
            DeliveryAction::StartTransit => "start_transit",
            DeliveryAction::Deliver => "deliver",
            DeliveryAction::Delay => "delay",
            DeliveryAction::ClearDelay => "clear_delay",
            DeliveryAction::Cancel => "cancel",
        }
    }

    /// Source and target of the four main-sequence steps.
    const fn forward_step(self) -> Option<(DeliveryStatus, DeliveryStatus)> {
        match self {
            DeliveryAction::Assign => Some((DeliveryStatus::Pending, DeliveryStatus::Assigned)),
            DeliveryAction::PickUp => Some((DeliveryStatus::Assigned, DeliveryStatus::PickedUp)),
            DeliveryAction::StartTransit => {
                Some((DeliveryStatus::PickedUp, DeliveryStatus::InTransit))
            }
            DeliveryAction::Deliver => Some((DeliveryStatus::InTransit, DeliveryStatus::Delivered)),
            DeliveryAction::Delay | DeliveryAction::ClearDelay | DeliveryAction::Cancel => None,
        }
    }
}

impl fmt::Display for DeliveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition table. Returns the status `action` moves a delivery into, or
/// `None` when the action is not permitted from here.
///
/// A main-sequence step taken while delayed is judged against the state the
/// delivery was delayed from, and resumes the sequence from there.
pub fn transition_target(
    status: DeliveryStatus,
    delayed_from: Option<DeliveryStatus>,
    action: DeliveryAction,
) -> Option<DeliveryStatus> {
    use DeliveryStatus::*;

    if status.is_terminal() {
        return None;
    }
    if action == DeliveryAction::Cancel {
        return Some(Cancelled);
    }

    let progress = match status {
        Delayed => delayed_from?,
        other => other,
    };

    match action {
        DeliveryAction::Delay => matches!(progress, Assigned | PickedUp | InTransit).then_some(Delayed),
        DeliveryAction::ClearDelay => (status == Delayed).then_some(progress),
        step => {
            let (source, target) = step.forward_step()?;
            (progress == source).then_some(target)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDelivery {
    pub customer: Customer,
    pub route: Route,
    pub package: Package,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub agent_id: Option<Uuid>,
}

pub fn place(state: &AppState, request: PlaceDelivery) -> Result<Delivery, AppError> {
    let customer = validate_customer(request.customer)?;
    let route = Route {
        pickup: validate_location(request.route.pickup, "pickup")?,
        dropoff: validate_location(request.route.dropoff, "dropoff")?,
    };
    let package = validate_package(request.package)?;

    let now = Utc::now();
    let estimated_delivery_at = estimate_delivery_at(
        &route,
        now,
        state.config.average_speed_kmh,
        state.config.handling_minutes,
    )?;

    let delivery = Delivery {
        tracking_number: next_tracking_number(),
        customer,
        agent_id: None,
        route,
        package,
        status: DeliveryStatus::Pending,
        delayed_from: None,
        delay_reason: None,
        cancellation_reason: None,
        estimated_delivery_at,
        created_at: now,
        updated_at: now,
        delivered_at: None,
        history: Vec::new(),
        version: 0,
    };

    state.deliveries.insert(delivery.clone())?;
    state.metrics.record_transition(WORKFLOW, "place", "applied");
    publish_update(state, &delivery);
    info!(
        tracking_number = %delivery.tracking_number,
        priority = ?delivery.package.priority,
        eta = %delivery.estimated_delivery_at,
        "delivery placed"
    );

    Ok(delivery)
}

pub fn get(state: &AppState, tracking_number: &str) -> Result<Delivery, AppError> {
    state
        .deliveries
        .get(tracking_number)?
        .ok_or_else(|| AppError::NotFound(format!("delivery {tracking_number} not found")))
}

/// Newest first.
pub fn list(state: &AppState, filter: &DeliveryFilter, page: PageRequest) -> Result<Page<Delivery>, AppError> {
    let mut deliveries: Vec<_> = state
        .deliveries
        .list()?
        .into_iter()
        .filter(|delivery| filter.status.is_none_or(|status| delivery.status == status))
        .filter(|delivery| filter.agent_id.is_none_or(|agent| delivery.agent_id == Some(agent)))
        .collect();
    deliveries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.tracking_number.cmp(&b.tracking_number))
    });

    Page::slice(deliveries, page, state.config.max_page_size)
}

/// Deliveries past their ETA that nobody has flagged yet, oldest ETA first.
pub fn overdue(state: &AppState, now: DateTime<Utc>) -> Result<Vec<Delivery>, AppError> {
    let mut deliveries: Vec<_> = state
        .deliveries
        .list()?
        .into_iter()
        .filter(|delivery| is_overdue(delivery, now))
        .collect();
    deliveries.sort_by(|a, b| a.estimated_delivery_at.cmp(&b.estimated_delivery_at));
    Ok(deliveries)
}

pub fn assign(state: &AppState, tracking_number: &str, agent_id: &Uuid) -> Result<Delivery, AppError> {
    ensure_available(state, agent_id)?;

    let agent_id = *agent_id;
    apply_transition(state, tracking_number, DeliveryAction::Assign, None, |delivery, _| {
        // Availability can change between the first check and the swap.
        ensure_available(state, &agent_id)?;
        delivery.agent_id = Some(agent_id);
        Ok(())
    })
}

fn ensure_available(state: &AppState, agent_id: &Uuid) -> Result<(), AppError> {
    let agent = state
        .agents
        .get(agent_id)?
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id} not found")))?;
    if agent.availability != Availability::Available {
        state.metrics.record_transition(WORKFLOW, "assign", "rejected");
        return Err(AppError::AgentUnavailable(agent_id.to_string()));
    }
    Ok(())
}

pub fn auto_assign(state: &AppState, tracking_number: &str) -> Result<AutoAssignment, AppError> {
    let delivery = get(state, tracking_number)?;
    if transition_target(delivery.status, delivery.delayed_from, DeliveryAction::Assign).is_none() {
        return Err(invalid_transition(&delivery, DeliveryAction::Assign));
    }

    let agents = state.agents.list()?;
    let deliveries = state.deliveries.list()?;
    let ranked = rank_agents(&agents, &deliveries, &delivery);
    let (winner, score, breakdown) = ranked.into_iter().next().ok_or(AppError::NoAvailableAgents)?;

    let agent_id = winner.id;
    let assigned = assign(state, tracking_number, &agent_id)?;
    info!(
        tracking_number = %tracking_number,
        agent_id = %agent_id,
        score,
        "delivery auto-assigned"
    );

    Ok(AutoAssignment {
        delivery: assigned.into(),
        agent_id,
        score,
        score_breakdown: breakdown,
    })
}

pub fn mark_picked_up(state: &AppState, tracking_number: &str) -> Result<Delivery, AppError> {
    apply_transition(state, tracking_number, DeliveryAction::PickUp, None, |_, _| Ok(()))
}

pub fn mark_in_transit(state: &AppState, tracking_number: &str) -> Result<Delivery, AppError> {
    apply_transition(state, tracking_number, DeliveryAction::StartTransit, None, |_, _| Ok(()))
}

pub fn mark_delivered(state: &AppState, tracking_number: &str) -> Result<Delivery, AppError> {
    let delivered = apply_transition(
        state,
        tracking_number,
        DeliveryAction::Deliver,
        None,
        |delivery, now| {
            delivery.delivered_at = Some(now.max(delivery.created_at));
            Ok(())
        },
    )?;

    if let Some(agent_id) = delivered.agent_id {
        let credited = state.agents.modify(&agent_id, &mut |agent| {
            agent.completed_deliveries = agent.completed_deliveries.saturating_add(1);
            agent.updated_at = Utc::now();
        });
        match credited {
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                tracking_number = %tracking_number,
                agent_id = %agent_id,
                "delivered by an agent that no longer exists"
            ),
            Err(err) => error!(
                error = %err,
                tracking_number = %tracking_number,
                agent_id = %agent_id,
                "failed to credit completed delivery"
            ),
        }
    }

    enqueue_notification(
        state,
        Notification::new(
            NotificationKind::DeliveryDelivered,
            &delivered.customer.contact,
            delivered.tracking_number.clone(),
        ),
    );

    Ok(delivered)
}

pub fn mark_delayed(
    state: &AppState,
    tracking_number: &str,
    estimated_delivery_at: DateTime<Utc>,
    reason: Option<String>,
) -> Result<Delivery, AppError> {
    let reason = reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());

    let delayed = apply_transition(
        state,
        tracking_number,
        DeliveryAction::Delay,
        reason.clone(),
        |delivery, _| {
            if estimated_delivery_at < delivery.created_at {
                return Err(AppError::Validation(
                    "new ETA cannot precede the order's creation".to_string(),
                ));
            }
            delivery.estimated_delivery_at = estimated_delivery_at;
            delivery.delay_reason = reason.clone();
            Ok(())
        },
    )?;

    let mut notification = Notification::new(
        NotificationKind::DeliveryDelayed,
        &delayed.customer.contact,
        delayed.tracking_number.clone(),
    )
    .with_eta(delayed.estimated_delivery_at);
    if let Some(reason) = reason {
        notification = notification.with_reason(reason);
    }
    enqueue_notification(state, notification);

    Ok(delayed)
}

pub fn clear_delay(state: &AppState, tracking_number: &str) -> Result<Delivery, AppError> {
    apply_transition(state, tracking_number, DeliveryAction::ClearDelay, None, |_, _| Ok(()))
}

pub fn cancel(state: &AppState, tracking_number: &str, reason: &str) -> Result<Delivery, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "cancellation reason cannot be empty".to_string(),
        ));
    }
    let reason = reason.to_string();

    apply_transition(
        state,
        tracking_number,
        DeliveryAction::Cancel,
        Some(reason.clone()),
        |delivery, _| {
            delivery.cancellation_reason = Some(reason.clone());
            Ok(())
        },
    )
}

/// Validates `action` against the table, lets `update` fill in
/// action-specific fields, then commits with a version-guarded swap.
fn apply_transition<F>(
    state: &AppState,
    tracking_number: &str,
    action: DeliveryAction,
    note: Option<String>,
    update: F,
) -> Result<Delivery, AppError>
where
    F: FnOnce(&mut Delivery, DateTime<Utc>) -> Result<(), AppError>,
{
    let current = get(state, tracking_number)?;
    let Some(target) = transition_target(current.status, current.delayed_from, action) else {
        state
            .metrics
            .record_transition(WORKFLOW, action.as_str(), "rejected");
        return Err(invalid_transition(&current, action));
    };

    let now = Utc::now();
    let mut next = current.clone();
    update(&mut next, now)?;

    if target == DeliveryStatus::Delayed {
        if current.status != DeliveryStatus::Delayed {
            next.delayed_from = Some(current.status);
        }
    } else {
        next.delayed_from = None;
        next.delay_reason = None;
    }
    next.status = target;
    next.updated_at = now;
    next.version = current.version + 1;
    next.history.push(StatusChange {
        from: current.status,
        to: target,
        at: now,
        note,
    });

    match state
        .deliveries
        .compare_and_swap(current.version, next.clone())?
    {
        CasOutcome::Applied => {
            state
                .metrics
                .record_transition(WORKFLOW, action.as_str(), "applied");
            info!(
                tracking_number = %tracking_number,
                from = current.status.label(),
                to = target.label(),
                "delivery status changed"
            );
            publish_update(state, &next);
            Ok(next)
        }
        CasOutcome::Stale { current: latest } => {
            state
                .metrics
                .record_transition(WORKFLOW, action.as_str(), "conflict");
            warn!(
                tracking_number = %tracking_number,
                expected = current.status.label(),
                found = latest.label(),
                action = action.as_str(),
                "delivery changed concurrently"
            );
            Err(AppError::InvalidTransition(format!(
                "cannot {action} delivery {tracking_number}: it changed concurrently and is now {}",
                latest.label()
            )))
        }
        CasOutcome::Missing => Err(AppError::NotFound(format!(
            "delivery {tracking_number} not found"
        ))),
    }
}

fn invalid_transition(delivery: &Delivery, action: DeliveryAction) -> AppError {
    AppError::InvalidTransition(format!(
        "cannot {action} delivery {} while it is {}",
        delivery.tracking_number,
        delivery.status.label()
    ))
}

fn publish_update(state: &AppState, delivery: &Delivery) {
    state.publish(WorkflowEvent::DeliveryUpdated {
        tracking_number: delivery.tracking_number.clone(),
        status: delivery.status,
        status_label: delivery.status.label(),
        agent_id: delivery.agent_id,
    });
}

fn next_tracking_number() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("TRK-{}", &raw[..12])
}

fn validate_customer(mut customer: Customer) -> Result<Customer, AppError> {
    customer.id = non_empty(&customer.id, "customer.id")?;
    customer.name = non_empty(&customer.name, "customer.name")?;
    customer.contact = non_empty(&customer.contact, "customer.contact")?;
    Ok(customer)
}

fn validate_location(mut location: Location, field: &str) -> Result<Location, AppError> {
    location.address = non_empty(&location.address, &format!("route.{field}.address"))?;
    if !is_valid_point(&location.point) {
        return Err(AppError::Validation(format!(
            "route.{field}.point is not a valid coordinate"
        )));
    }
    Ok(location)
}

fn validate_package(package: Package) -> Result<Package, AppError> {
    let positive = |value: f64| value.is_finite() && value > 0.0;
    if !positive(package.weight_kg) {
        return Err(AppError::Validation("package.weight_kg must be > 0".to_string()));
    }
    let dims = package.dimensions;
    if !(positive(dims.length_cm) && positive(dims.width_cm) && positive(dims.height_cm)) {
        return Err(AppError::Validation(
            "package.dimensions must all be > 0".to_string(),
        ));
    }
    Ok(package)
}

fn non_empty(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{transition_target, DeliveryAction};
    use crate::models::delivery::DeliveryStatus::{self, *};

    const FORWARD: [DeliveryAction; 4] = [
        DeliveryAction::Assign,
        DeliveryAction::PickUp,
        DeliveryAction::StartTransit,
        DeliveryAction::Deliver,
    ];

    #[test]
    fn main_sequence_advances_one_step_at_a_time() {
        let sequence = [Pending, Assigned, PickedUp, InTransit, Delivered];
        for (index, action) in FORWARD.into_iter().enumerate() {
            for (from_index, from) in sequence.into_iter().enumerate() {
                let expected = (from_index == index).then_some(sequence[index + 1]);
                assert_eq!(
                    transition_target(from, None, action),
                    expected,
                    "{action} from {from:?}"
                );
            }
        }
    }

    #[test]
    fn cancel_is_reachable_from_every_open_state_only() {
        let open = [Pending, Assigned, PickedUp, InTransit];
        for status in open {
            assert_eq!(transition_target(status, None, DeliveryAction::Cancel), Some(Cancelled));
        }
        assert_eq!(
            transition_target(Delayed, Some(PickedUp), DeliveryAction::Cancel),
            Some(Cancelled)
        );
        for status in [Delivered, Cancelled] {
            assert_eq!(transition_target(status, None, DeliveryAction::Cancel), None);
        }
    }

    #[test]
    fn delay_needs_an_agent_on_the_job() {
        assert_eq!(transition_target(Pending, None, DeliveryAction::Delay), None);
        for status in [Assigned, PickedUp, InTransit] {
            assert_eq!(transition_target(status, None, DeliveryAction::Delay), Some(Delayed));
        }
        assert_eq!(
            transition_target(Delayed, Some(InTransit), DeliveryAction::Delay),
            Some(Delayed)
        );
    }

    #[test]
    fn clearing_a_delay_resumes_where_it_left_off() {
        for status in [Assigned, PickedUp, InTransit] {
            assert_eq!(
                transition_target(Delayed, Some(status), DeliveryAction::ClearDelay),
                Some(status)
            );
        }
        assert_eq!(transition_target(InTransit, None, DeliveryAction::ClearDelay), None);
    }

    #[test]
    fn steps_while_delayed_follow_the_underlying_state() {
        assert_eq!(
            transition_target(Delayed, Some(InTransit), DeliveryAction::Deliver),
            Some(Delivered)
        );
        assert_eq!(
            transition_target(Delayed, Some(Assigned), DeliveryAction::Deliver),
            None
        );
    }

    #[test]
    fn delayed_without_origin_can_only_be_cancelled() {
        let status: DeliveryStatus = Delayed;
        assert_eq!(transition_target(status, None, DeliveryAction::ClearDelay), None);
        assert_eq!(transition_target(status, None, DeliveryAction::Deliver), None);
        assert_eq!(
            transition_target(status, None, DeliveryAction::Cancel),
            Some(Cancelled)
        );
    }
}
