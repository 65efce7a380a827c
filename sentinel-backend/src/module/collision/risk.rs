//! Distance-threshold risk rules.
//!
//! Everything here is pure: the engine gathers distance samples and these
//! functions turn them into a [`RiskAssessment`].

use chrono::{DateTime, Utc};
use sentinel_common::{NoradId, ObjectType, RiskAssessment, RiskLevel};

/// Closest approach at or below which a pair is CRITICAL, km
pub const CRITICAL_KM: f64 = 5.0;
pub const HIGH_KM: f64 = 25.0;
pub const MEDIUM_KM: f64 = 100.0;
/// Objects beyond this range are neither rated nor counted as nearby
pub const MONITORING_KM: f64 = 500.0;
/// Nearby objects inside this range add to the debris score
const VERY_CLOSE_KM: f64 = 50.0;

/// Separation between two objects at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub object_a: NoradId,
    pub object_b: NoradId,
    pub distance_km: f64,
    pub at: DateTime<Utc>,
}

/// A sampled neighbor together with what kind of object it is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub sample: DistanceSample,
    pub object_type: ObjectType,
}

/// Risk level for a closest approach, `None` past the monitoring range.
pub fn classify(distance_km: f64) -> Option<RiskLevel> {
    if distance_km <= CRITICAL_KM {
        Some(RiskLevel::Critical)
    } else if distance_km <= HIGH_KM {
        Some(RiskLevel::High)
    } else if distance_km <= MEDIUM_KM {
        Some(RiskLevel::Medium)
    } else if distance_km <= MONITORING_KM {
        Some(RiskLevel::Low)
    } else {
        None
    }
}

/// Rough collision probability in percent, always within [0, 100].
///
/// `closest_km` is `None` when no neighbor could be sampled at all.
pub fn collision_probability(
    closest_km: Option<f64>,
    nearby_count: usize,
    object_type: ObjectType,
) -> f64 {
    let base = match closest_km {
        Some(d) if d <= CRITICAL_KM => 25.0,
        Some(d) if d <= HIGH_KM => 10.0,
        Some(d) if d <= MEDIUM_KM => 2.0,
        Some(d) if d <= MONITORING_KM => 0.1,
        _ => 0.01,
    };

    let density = 1.0 + nearby_count as f64 * 0.1;
    let type_multiplier = match object_type {
        ObjectType::Debris => 1.5,
        ObjectType::RocketBody => 1.2,
        _ => 1.0,
    };

    (base * density * type_multiplier).clamp(0.0, 100.0)
}

/// Congestion score in [0, 100] from the altitude band and nearby objects.
pub fn debris_score(altitude_km: Option<f64>, nearby: &[Neighbor]) -> f64 {
    let altitude_score = match altitude_km {
        Some(h) if (400.0..=600.0).contains(&h) => 30.0,
        Some(h) if (700.0..=900.0).contains(&h) => 20.0,
        Some(h) if h >= 35_000.0 => 25.0,
        Some(_) => 10.0,
        None => 0.0,
    };

    let neighbor_score: f64 = nearby
        .iter()
        .map(|n| {
            let kind = match n.object_type {
                ObjectType::Debris => 3.0,
                ObjectType::RocketBody => 2.0,
                _ => 0.0,
            };
            let close = if n.sample.distance_km <= VERY_CLOSE_KM { 5.0 } else { 0.0 };
            kind + 1.0 + close
        })
        .sum();

    (altitude_score + neighbor_score).clamp(0.0, 100.0)
}

/// Combine the neighbors sampled for one object into its assessment.
pub fn assess_neighbors(
    object_type: ObjectType,
    altitude_km: Option<f64>,
    neighbors: &[Neighbor],
) -> RiskAssessment {
    let closest = neighbors
        .iter()
        .map(|n| n.sample.distance_km)
        .min_by(f64::total_cmp);

    let nearby: Vec<Neighbor> = neighbors
        .iter()
        .filter(|n| n.sample.distance_km <= MONITORING_KM)
        .copied()
        .collect();

    RiskAssessment {
        level: closest.and_then(classify).unwrap_or(RiskLevel::Low),
        probability_pct: collision_probability(closest, nearby.len(), object_type),
        nearby_count: nearby.len(),
        closest_km: closest.filter(|d| *d <= MONITORING_KM),
        debris_score: debris_score(altitude_km, &nearby),
    }
}
