use std::collections::HashMap;

use uuid::Uuid;

use crate::geo::haversine_km;
use crate::models::agent::{Agent, Availability, MAX_RATING};
use crate::models::assignment::ScoreBreakdown;
use crate::models::delivery::Delivery;

const DISTANCE_WEIGHT: f64 = 0.40;
const LOAD_WEIGHT: f64 = 0.30;
const RATING_WEIGHT: f64 = 0.20;
const EXPERIENCE_WEIGHT: f64 = 0.10;

const UNKNOWN_LOCATION_SCORE: f64 = 0.1;
const EXPERIENCE_HALF_POINT: f64 = 20.0;

pub fn compute_score(agent: &Agent, active_load: usize, delivery: &Delivery) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        distance_score: distance_score(agent, delivery),
        load_score: load_score(active_load),
        rating_score: rating_score(agent.rating),
        experience_score: experience_score(agent.completed_deliveries),
    };

    let score = weighted_score(&breakdown);
    (score, breakdown)
}

pub fn weighted_score(breakdown: &ScoreBreakdown) -> f64 {
    (breakdown.distance_score * DISTANCE_WEIGHT)
        + (breakdown.load_score * LOAD_WEIGHT)
        + (breakdown.rating_score * RATING_WEIGHT)
        + (breakdown.experience_score * EXPERIENCE_WEIGHT)
}

/// Ranks available agents for a delivery, best first. `deliveries` is the
/// current delivery table, used to count each agent's active load.
pub fn rank_agents<'a>(
    agents: &'a [Agent],
    deliveries: &[Delivery],
    delivery: &Delivery,
) -> Vec<(&'a Agent, f64, ScoreBreakdown)> {
    let mut load: HashMap<Uuid, usize> = HashMap::new();
    for active in deliveries.iter().filter(|d| d.status.is_active()) {
        if let Some(agent_id) = active.agent_id {
            *load.entry(agent_id).or_default() += 1;
        }
    }

    let mut ranked: Vec<_> = agents
        .iter()
        .filter(|agent| agent.availability == Availability::Available)
        .map(|agent| {
            let active_load = load.get(&agent.id).copied().unwrap_or(0);
            let (score, breakdown) = compute_score(agent, active_load, delivery);
            (agent, score, breakdown)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    ranked
}

fn distance_score(agent: &Agent, delivery: &Delivery) -> f64 {
    match &agent.location {
        Some(location) => {
            let distance_km = haversine_km(location, &delivery.route.pickup.point);
            1.0 / (1.0 + distance_km.max(0.0))
        }
        None => UNKNOWN_LOCATION_SCORE,
    }
}

fn load_score(active_load: usize) -> f64 {
    1.0 / (1.0 + active_load as f64)
}

fn rating_score(rating: f64) -> f64 {
    (rating / MAX_RATING).clamp(0.0, 1.0)
}

fn experience_score(completed: u32) -> f64 {
    let completed = completed as f64;
    completed / (completed + EXPERIENCE_HALF_POINT)
}
