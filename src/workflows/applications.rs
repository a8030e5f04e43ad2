use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::normalize_documents;
use crate::engine::notifier::enqueue_notification;
use crate::error::AppError;
use crate::models::agent::Agent;
use crate::models::application::{
    AgentApplication, ApplicantDetails, ApplicationStatus, RejectionReason, VehicleType,
};
use crate::models::document::DocumentSet;
use crate::models::notification::{Notification, NotificationKind, WorkflowEvent};
use crate::state::AppState;
use crate::storage::CasOutcome;
use crate::workflows::{require_actor, Page, PageRequest};

const WORKFLOW: &str = "application";

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSubmission {
    pub applicant: ApplicantDetails,
    #[serde(default)]
    pub documents: DocumentSet,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub hub: Option<String>,
}

impl ApplicationFilter {
    fn matches(&self, application: &AgentApplication) -> bool {
        self.status.is_none_or(|status| application.status == status)
            && self
                .vehicle_type
                .is_none_or(|vehicle| application.applicant.vehicle_type == vehicle)
            && self.hub.as_deref().is_none_or(|hub| {
                application
                    .applicant
                    .hub
                    .as_deref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(hub))
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub application: AgentApplication,
    pub agent: Agent,
}

pub fn submit(state: &AppState, submission: ApplicationSubmission) -> Result<AgentApplication, AppError> {
    let applicant = validate_applicant(submission.applicant)?;
    let documents = normalize_documents(&state.config, submission.documents)?;

    let application = AgentApplication::new(applicant, documents, Utc::now());
    state.applications.insert(application.clone())?;

    state.metrics.record_transition(WORKFLOW, "submit", "applied");
    state.publish(WorkflowEvent::ApplicationSubmitted {
        application_id: application.id,
    });
    info!(
        application_id = %application.id,
        documents_status = ?application.documents_status,
        "agent application submitted"
    );

    Ok(application)
}

pub fn get(state: &AppState, application_id: &Uuid) -> Result<AgentApplication, AppError> {
    state
        .applications
        .get(application_id)?
        .ok_or_else(|| AppError::NotFound(format!("application {application_id} not found")))
}

pub fn list_by_status(state: &AppState, status: ApplicationStatus) -> Result<Vec<AgentApplication>, AppError> {
    let filter = ApplicationFilter {
        status: Some(status),
        ..ApplicationFilter::default()
    };
    filtered(state, &filter)
}

pub fn list(
    state: &AppState,
    filter: &ApplicationFilter,
    page: PageRequest,
) -> Result<Page<AgentApplication>, AppError> {
    let applications = filtered(state, filter)?;
    Page::slice(applications, page, state.config.max_page_size)
}

/// Oldest first.
fn filtered(state: &AppState, filter: &ApplicationFilter) -> Result<Vec<AgentApplication>, AppError> {
    let mut applications: Vec<_> = state
        .applications
        .list()?
        .into_iter()
        .filter(|application| filter.matches(application))
        .collect();
    applications.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then(a.id.cmp(&b.id)));
    Ok(applications)
}

pub fn approve(state: &AppState, application_id: &Uuid, approved_by: &str) -> Result<Approval, AppError> {
    let approved_by = require_actor(approved_by, "approved_by")?;
    let current = get(state, application_id)?;
    ensure_pending(state, &current, "approve")?;

    let now = Utc::now();
    let mut approved = current.clone();
    approved.status = ApplicationStatus::Approved;
    approved.rejection_reason = None;
    approved.processed_at = Some(now);
    approved.processed_by = Some(approved_by.clone());
    approved.version = current.version + 1;

    commit_decision(state, current.version, approved.clone(), "approve")?;

    let agent = Agent::from_application(&approved, &approved_by, now);
    if let Err(err) = state.agents.insert_new(agent.clone()) {
        error!(
            error = %err,
            application_id = %application_id,
            "agent materialization failed; reverting approval"
        );
        let mut reverted = current;
        reverted.version = approved.version + 1;
        let revert = state
            .applications
            .compare_and_swap(approved.version, reverted);
        if !matches!(revert, Ok(CasOutcome::Applied)) {
            error!(application_id = %application_id, outcome = ?revert, "approval revert failed");
        }
        state.metrics.record_transition(WORKFLOW, "approve", "reverted");
        return Err(err.into());
    }

    info!(
        application_id = %application_id,
        agent_id = %agent.id,
        approved_by = %approved_by,
        "application approved; agent created"
    );
    state.publish(WorkflowEvent::ApplicationDecided {
        application_id: approved.id,
        status: approved.status,
    });
    enqueue_notification(
        state,
        Notification::new(
            NotificationKind::ApplicationApproved,
            &approved.applicant.contact.email,
            approved.id.to_string(),
        ),
    );

    Ok(Approval {
        application: approved,
        agent,
    })
}

pub fn reject(
    state: &AppState,
    application_id: &Uuid,
    reason: &str,
    rejected_by: &str,
) -> Result<AgentApplication, AppError> {
    let rejected_by = require_actor(rejected_by, "rejected_by")?;
    let reason = RejectionReason::parse(reason, state.config.rejection_reason_max_len)
        .map_err(AppError::Validation)?;

    let current = get(state, application_id)?;
    ensure_pending(state, &current, "reject")?;

    let expected_version = current.version;
    let mut rejected = current;
    rejected.version = expected_version + 1;
    rejected.status = ApplicationStatus::Rejected;
    rejected.rejection_reason = Some(reason.text.clone());
    rejected.processed_at = Some(Utc::now());
    rejected.processed_by = Some(rejected_by.clone());

    commit_decision(state, expected_version, rejected.clone(), "reject")?;

    info!(
        application_id = %application_id,
        rejected_by = %rejected_by,
        category = ?reason.category,
        "application rejected"
    );
    state.publish(WorkflowEvent::ApplicationDecided {
        application_id: rejected.id,
        status: rejected.status,
    });
    enqueue_notification(
        state,
        Notification::new(
            NotificationKind::ApplicationRejected,
            &rejected.applicant.contact.email,
            rejected.id.to_string(),
        )
        .with_reason(reason.text),
    );

    Ok(rejected)
}

fn ensure_pending(state: &AppState, application: &AgentApplication, action: &str) -> Result<(), AppError> {
    if application.status == ApplicationStatus::Pending {
        return Ok(());
    }

    state.metrics.record_transition(WORKFLOW, action, "rejected");
    Err(AppError::InvalidState(format!(
        "cannot {action} application {}: already {}",
        application.id,
        application.status.label()
    )))
}

fn commit_decision(
    state: &AppState,
    expected_version: u64,
    next: AgentApplication,
    action: &str,
) -> Result<(), AppError> {
    let application_id = next.id;
    match state
        .applications
        .compare_and_swap(expected_version, next)?
    {
        CasOutcome::Applied => {
            state.metrics.record_transition(WORKFLOW, action, "applied");
            Ok(())
        }
        CasOutcome::Stale { current } => {
            state.metrics.record_transition(WORKFLOW, action, "conflict");
            warn!(
                application_id = %application_id,
                current = current.label(),
                action,
                "application decided concurrently"
            );
            Err(AppError::InvalidState(format!(
                "cannot {action} application {application_id}: it changed concurrently and is now {}",
                current.label()
            )))
        }
        CasOutcome::Missing => Err(AppError::NotFound(format!(
            "application {application_id} not found"
        ))),
    }
}

fn validate_applicant(mut applicant: ApplicantDetails) -> Result<ApplicantDetails, AppError> {
    applicant.name = required(&applicant.name, "name")?;
    applicant.gender = required(&applicant.gender, "gender")?;
    applicant.vehicle_registration_number =
        required(&applicant.vehicle_registration_number, "vehicle_registration_number")?
            .to_ascii_uppercase();
    applicant.contact.phone = required(&applicant.contact.phone, "contact.phone")?;
    applicant.contact.email = required(&applicant.contact.email, "contact.email")?;
    if !applicant.contact.email.contains('@') {
        return Err(AppError::Validation(
            "contact.email must be an e-mail address".to_string(),
        ));
    }
    if applicant.age == 0 {
        return Err(AppError::Validation("age is required".to_string()));
    }
    applicant.hub = applicant
        .hub
        .map(|hub| hub.trim().to_string())
        .filter(|hub| !hub.is_empty());

    Ok(applicant)
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
