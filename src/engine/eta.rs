use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::delivery::{Delivery, DeliveryStatus, Route};

/// Straight-line travel time at the configured average speed plus a fixed
/// allowance for pickup and handover.
pub fn estimate_delivery_at(
    route: &Route,
    created_at: DateTime<Utc>,
    average_speed_kmh: f64,
    handling_minutes: i64,
) -> Result<DateTime<Utc>, AppError> {
    let distance_km = haversine_km(&route.pickup.point, &route.dropoff.point);
    let travel_minutes = if average_speed_kmh > 0.0 {
        (distance_km / average_speed_kmh * 60.0).ceil()
    } else {
        0.0
    };
    if !travel_minutes.is_finite() || travel_minutes >= i64::MAX as f64 {
        return Err(out_of_range(distance_km));
    }

    (travel_minutes as i64)
        .checked_add(handling_minutes.max(0))
        .and_then(TimeDelta::try_minutes)
        .and_then(|eta| created_at.checked_add_signed(eta))
        .ok_or_else(|| out_of_range(distance_km))
}

fn out_of_range(distance_km: f64) -> AppError {
    AppError::Validation(format!(
        "cannot estimate a delivery time for a {distance_km:.1} km route"
    ))
}

/// Still moving, not already flagged, and past its ETA.
pub fn is_overdue(delivery: &Delivery, now: DateTime<Utc>) -> bool {
    !delivery.status.is_terminal()
        && delivery.status != DeliveryStatus::Delayed
        && delivery.estimated_delivery_at < now
}
