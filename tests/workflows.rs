use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeDelta, Utc};

use delivery_workflows::config::Config;
use delivery_workflows::engine::dashboard::refresh;
use delivery_workflows::engine::notifier::{run_notifier, RecordingNotificationSink};
use delivery_workflows::error::AppError;
use delivery_workflows::models::application::{
    AgentApplication, ApplicantDetails, ApplicationStatus, ContactInfo, GovernmentIdType,
    VehicleType,
};
use delivery_workflows::models::agent::{Agent, Availability};
use delivery_workflows::models::delivery::{
    Customer, Delivery, DeliveryStatus, Dimensions, GeoPoint, Location, Package, PaymentMethod,
    Priority, Route, StatusChange,
};
use delivery_workflows::models::notification::NotificationKind;
use delivery_workflows::state::AppState;
use delivery_workflows::storage::{
    AgentRepository, ApplicationRepository, CasOutcome, DeliveryRepository,
    InMemoryAgentRepository, InMemoryApplicationRepository, InMemoryDeliveryRepository,
    Repositories, StorageError,
};
use delivery_workflows::workflows::applications::{self, ApplicationSubmission};
use delivery_workflows::workflows::deliveries::{self, PlaceDelivery};
use uuid::Uuid;

fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        applicant: ApplicantDetails {
            name: "Kiran".to_string(),
            contact: ContactInfo {
                email: "kiran@example.com".to_string(),
                phone: "+91-9222222222".to_string(),
            },
            age: 31,
            gender: "male".to_string(),
            government_id_type: GovernmentIdType::DriversLicense,
            vehicle_type: VehicleType::Motorcycle,
            vehicle_registration_number: "KA01XY9999".to_string(),
            hub: None,
        },
        documents: Default::default(),
    }
}

/// Wraps the in-memory store and fails every call while `down` is set.
#[derive(Default)]
struct FlakyApplications {
    inner: InMemoryApplicationRepository,
    down: AtomicBool,
}

impl FlakyApplications {
    fn check(&self) -> Result<(), StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

impl ApplicationRepository for FlakyApplications {
    fn insert(&self, application: AgentApplication) -> Result<(), StorageError> {
        self.check()?;
        self.inner.insert(application)
    }

    fn get(&self, id: &Uuid) -> Result<Option<AgentApplication>, StorageError> {
        self.check()?;
        self.inner.get(id)
    }

    fn list(&self) -> Result<Vec<AgentApplication>, StorageError> {
        self.check()?;
        self.inner.list()
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: AgentApplication,
    ) -> Result<CasOutcome<ApplicationStatus>, StorageError> {
        self.check()?;
        self.inner.compare_and_swap(expected_version, next)
    }
}

#[test]
fn concurrent_approvals_create_exactly_one_agent() {
    let (state, _rx) = AppState::in_memory(Config::default());
    let application = applications::submit(&state, submission()).unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|reviewer| {
                let state = &state;
                let id = application.id;
                scope.spawn(move || applications::approve(state, &id, &format!("reviewer-{reviewer}")))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let approved = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(approved, 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, AppError::InvalidState(_))));
    assert_eq!(state.agents.count().unwrap(), 1);
}

#[test]
fn concurrent_approve_and_reject_settle_on_one_decision() {
    let (state, _rx) = AppState::in_memory(Config::default());
    let application = applications::submit(&state, submission()).unwrap();
    let id = application.id;

    let (approve, reject) = std::thread::scope(|scope| {
        let approve = scope.spawn(|| applications::approve(&state, &id, "reviewer-a"));
        let reject = scope.spawn(|| {
            applications::reject(&state, &id, "Vehicle not eligible", "reviewer-b")
        });
        (approve.join().unwrap(), reject.join().unwrap())
    });

    assert!(approve.is_ok() ^ reject.is_ok());
    let stored = applications::get(&state, &id).unwrap();
    let agents = state.agents.count().unwrap();
    match stored.status {
        ApplicationStatus::Approved => assert_eq!(agents, 1),
        ApplicationStatus::Rejected => assert_eq!(agents, 0),
        ApplicationStatus::Pending => panic!("no decision landed"),
    }
}

#[test]
fn storage_outage_surfaces_as_transient_error() {
    let flaky = Arc::new(FlakyApplications::default());
    let repositories = Repositories {
        applications: flaky.clone(),
        ..Repositories::in_memory()
    };
    let (state, _rx) = AppState::new(Config::default(), repositories);

    flaky.down.store(true, Ordering::SeqCst);
    let err = applications::submit(&state, submission()).unwrap_err();
    assert!(matches!(err, AppError::TransientStorage(_)));
    assert_eq!(err.kind(), "transient_storage");
}

#[test]
fn dashboard_keeps_last_snapshot_when_refresh_fails() {
    let flaky = Arc::new(FlakyApplications::default());
    let repositories = Repositories {
        applications: flaky.clone(),
        ..Repositories::in_memory()
    };
    let (state, _rx) = AppState::new(Config::default(), repositories);
    applications::submit(&state, submission()).unwrap();

    let fresh = refresh(&state);
    assert!(!fresh.stale);
    assert_eq!(fresh.snapshot.pending_applications, 1);

    flaky.down.store(true, Ordering::SeqCst);
    let stale = refresh(&state);
    assert!(stale.stale);
    assert!(stale.last_error.is_some());
    assert_eq!(stale.last_updated, fresh.last_updated);
    assert_eq!(stale.snapshot, fresh.snapshot);

    flaky.down.store(false, Ordering::SeqCst);
    let recovered = refresh(&state);
    assert!(!recovered.stale);
    assert!(recovered.last_error.is_none());
}

#[tokio::test]
async fn decisions_reach_the_notification_sink() {
    let (state, rx) = AppState::in_memory(Config::default());
    let state = Arc::new(state);
    let sink = Arc::new(RecordingNotificationSink::default());
    tokio::spawn(run_notifier(state.clone(), rx, sink.clone()));

    let first = applications::submit(&state, submission()).unwrap();
    let second = applications::submit(&state, submission()).unwrap();
    applications::approve(&state, &first.id, "reviewer-1").unwrap();
    applications::reject(&state, &second.id, "Applicant unreachable", "reviewer-1").unwrap();

    let mut delivered = Vec::new();
    for _ in 0..50 {
        delivered = sink.delivered();
        if delivered.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(delivered.len(), 2);
    assert!(delivered
        .iter()
        .any(|n| n.kind == NotificationKind::ApplicationApproved && n.recipient == "kiran@example.com"));
    let rejected = delivered
        .iter()
        .find(|n| n.kind == NotificationKind::ApplicationRejected)
        .unwrap();
    assert_eq!(rejected.reason.as_deref(), Some("Applicant unreachable"));
}

#[test]
fn listing_by_status_follows_decisions() {
    let (state, _rx) = AppState::in_memory(Config::default());
    let first = applications::submit(&state, submission()).unwrap();
    let second = applications::submit(&state, submission()).unwrap();
    applications::reject(&state, &first.id, "Incomplete documents", "reviewer-1").unwrap();

    let pending = applications::list_by_status(&state, ApplicationStatus::Pending).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let rejected = applications::list_by_status(&state, ApplicationStatus::Rejected).unwrap();
    assert_eq!(rejected[0].rejection_reason.as_deref(), Some("Incomplete documents"));
    assert!(applications::list_by_status(&state, ApplicationStatus::Approved)
        .unwrap()
        .is_empty());
}

fn order() -> PlaceDelivery {
    let location = |address: &str, lat: f64, lng: f64| Location {
        address: address.to_string(),
        point: GeoPoint { lat, lng },
    };
    PlaceDelivery {
        customer: Customer {
            id: "cust-7".to_string(),
            name: "Meera".to_string(),
            contact: "+91-9333333333".to_string(),
        },
        route: Route {
            pickup: location("Koramangala", 12.9352, 77.6245),
            dropoff: location("Indiranagar", 12.9784, 77.6408),
        },
        package: Package {
            weight_kg: 1.2,
            dimensions: Dimensions {
                length_cm: 20.0,
                width_cm: 15.0,
                height_cm: 5.0,
            },
            priority: Priority::Medium,
            payment_method: PaymentMethod::Card,
            description: None,
        },
    }
}

fn assigned_delivery(state: &AppState) -> (Delivery, Uuid) {
    let application = applications::submit(state, submission()).unwrap();
    let agent = applications::approve(state, &application.id, "reviewer-1")
        .unwrap()
        .agent;
    let delivery = deliveries::place(state, order()).unwrap();
    let delivery = deliveries::assign(state, &delivery.tracking_number, &agent.id).unwrap();
    (delivery, agent.id)
}

type ReadHook = Box<dyn FnOnce(&InMemoryDeliveryRepository) + Send>;

/// Runs a one-shot hook after the next read, so a writer holds a snapshot
/// that another change has already overtaken.
#[derive(Default)]
struct HookedDeliveries {
    inner: InMemoryDeliveryRepository,
    after_read: Mutex<Option<ReadHook>>,
}

impl HookedDeliveries {
    fn arm(&self, hook: ReadHook) {
        *self.after_read.lock().unwrap() = Some(hook);
    }
}

impl DeliveryRepository for HookedDeliveries {
    fn insert(&self, delivery: Delivery) -> Result<(), StorageError> {
        self.inner.insert(delivery)
    }

    fn get(&self, tracking_number: &str) -> Result<Option<Delivery>, StorageError> {
        let found = self.inner.get(tracking_number)?;
        let hook = self.after_read.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        Ok(found)
    }

    fn list(&self) -> Result<Vec<Delivery>, StorageError> {
        self.inner.list()
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: Delivery,
    ) -> Result<CasOutcome<DeliveryStatus>, StorageError> {
        self.inner.compare_and_swap(expected_version, next)
    }
}

#[test]
fn concurrent_pickups_advance_exactly_once() {
    let (state, _rx) = AppState::in_memory(Config::default());
    let (delivery, _) = assigned_delivery(&state);
    let tracking_number = delivery.tracking_number.as_str();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| deliveries::mark_picked_up(&state, tracking_number)))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, AppError::InvalidTransition(_))));

    let stored = deliveries::get(&state, tracking_number).unwrap();
    assert_eq!(stored.status, DeliveryStatus::PickedUp);
    assert_eq!(stored.history.len(), 2);
}

#[test]
fn racing_delay_and_clear_never_lose_history() {
    let (state, _rx) = AppState::in_memory(Config::default());
    let (delivery, _) = assigned_delivery(&state);
    let tracking_number = delivery.tracking_number.as_str();
    let later = delivery.estimated_delivery_at + TimeDelta::hours(1);
    deliveries::mark_delayed(&state, tracking_number, later, Some("rain".to_string())).unwrap();

    let shared = &state;
    let outcomes: Vec<bool> = std::thread::scope(|scope| {
        let mut handles = Vec::new();
        for round in 0..4 {
            handles.push(scope.spawn(move || {
                let eta = later + TimeDelta::minutes(round);
                deliveries::mark_delayed(shared, tracking_number, eta, None).is_ok()
            }));
            handles.push(scope.spawn(move || deliveries::clear_delay(shared, tracking_number).is_ok()));
        }
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let committed = outcomes.iter().filter(|ok| **ok).count();
    let stored = deliveries::get(&state, tracking_number).unwrap();
    // assign + first delay + every transition that reported success
    assert_eq!(stored.history.len(), 2 + committed);
    assert_eq!(stored.version, 2 + committed as u64);
}

#[test]
fn clear_delay_on_an_overtaken_snapshot_is_refused() {
    let hooked = Arc::new(HookedDeliveries::default());
    let repositories = Repositories {
        deliveries: hooked.clone(),
        ..Repositories::in_memory()
    };
    let (state, _rx) = AppState::new(Config::default(), repositories);
    let (delivery, _) = assigned_delivery(&state);
    let tracking_number = delivery.tracking_number.clone();
    let later = delivery.estimated_delivery_at + TimeDelta::hours(1);
    deliveries::mark_delayed(&state, &tracking_number, later, Some("first".to_string())).unwrap();

    let key = tracking_number.clone();
    hooked.arm(Box::new(move |inner| {
        let current = inner.get(&key).unwrap().unwrap();
        let mut redelayed = current.clone();
        redelayed.estimated_delivery_at = later + TimeDelta::hours(2);
        redelayed.history.push(StatusChange {
            from: DeliveryStatus::Delayed,
            to: DeliveryStatus::Delayed,
            at: Utc::now(),
            note: Some("second delay".to_string()),
        });
        assert_eq!(
            inner.compare_and_swap(current.version, redelayed).unwrap(),
            CasOutcome::Applied
        );
    }));

    let err = deliveries::clear_delay(&state, &tracking_number).unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let stored = deliveries::get(&state, &tracking_number).unwrap();
    assert_eq!(stored.status, DeliveryStatus::Delayed);
    assert_eq!(stored.estimated_delivery_at, later + TimeDelta::hours(2));
    let notes: Vec<_> = stored.history.iter().map(|change| change.note.as_deref()).collect();
    assert_eq!(notes, vec![None, Some("first"), Some("second delay")]);
}

#[test]
fn agent_going_unavailable_mid_assignment_is_not_assigned() {
    let agents = Arc::new(InMemoryAgentRepository::default());
    let hooked = Arc::new(HookedDeliveries::default());
    let repositories = Repositories {
        agents: agents.clone(),
        deliveries: hooked.clone(),
        ..Repositories::in_memory()
    };
    let (state, _rx) = AppState::new(Config::default(), repositories);
    let application = applications::submit(&state, submission()).unwrap();
    let agent_id = applications::approve(&state, &application.id, "reviewer-1")
        .unwrap()
        .agent
        .id;
    let delivery = deliveries::place(&state, order()).unwrap();

    hooked.arm(Box::new(move |_| {
        agents
            .modify(&agent_id, &mut |agent: &mut Agent| {
                agent.availability = Availability::Unavailable
            })
            .unwrap();
    }));

    let err = deliveries::assign(&state, &delivery.tracking_number, &agent_id).unwrap_err();
    assert!(matches!(err, AppError::AgentUnavailable(_)));

    let stored = deliveries::get(&state, &delivery.tracking_number).unwrap();
    assert_eq!(stored.status, DeliveryStatus::Pending);
    assert!(stored.agent_id.is_none());
}
