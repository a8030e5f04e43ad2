use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::is_valid_point;
use crate::models::agent::{clamp_rating, Agent, Availability};
use crate::models::delivery::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub availability: Option<Availability>,
    pub hub: Option<String>,
}

pub fn list(state: &AppState, filter: &AgentFilter) -> Result<Vec<Agent>, AppError> {
    let mut agents: Vec<_> = state
        .agents
        .list()?
        .into_iter()
        .filter(|agent| {
            filter
                .availability
                .is_none_or(|availability| agent.availability == availability)
        })
        .filter(|agent| {
            filter.hub.as_deref().is_none_or(|hub| {
                agent
                    .hub
                    .as_deref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(hub))
            })
        })
        .collect();
    agents.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(agents)
}

pub fn get(state: &AppState, agent_id: &Uuid) -> Result<Agent, AppError> {
    state
        .agents
        .get(agent_id)?
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id} not found")))
}

pub fn set_availability(
    state: &AppState,
    agent_id: &Uuid,
    availability: Availability,
) -> Result<Agent, AppError> {
    let agent = modify(state, agent_id, |agent| agent.availability = availability)?;
    info!(agent_id = %agent_id, availability = ?availability, "agent availability changed");
    Ok(agent)
}

pub fn set_location(state: &AppState, agent_id: &Uuid, location: GeoPoint) -> Result<Agent, AppError> {
    if !is_valid_point(&location) {
        return Err(AppError::Validation(
            "location is not a valid coordinate".to_string(),
        ));
    }
    modify(state, agent_id, |agent| agent.location = Some(location))
}

pub fn set_rating(state: &AppState, agent_id: &Uuid, rating: f64) -> Result<Agent, AppError> {
    if !rating.is_finite() {
        return Err(AppError::Validation("rating must be a number".to_string()));
    }
    let rating = clamp_rating(rating);
    modify(state, agent_id, |agent| agent.rating = rating)
}

fn modify<F>(state: &AppState, agent_id: &Uuid, mut update: F) -> Result<Agent, AppError>
where
    F: FnMut(&mut Agent),
{
    state
        .agents
        .modify(agent_id, &mut |agent| {
            update(agent);
            agent.updated_at = Utc::now();
        })?
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id} not found")))
}
