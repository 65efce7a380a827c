use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use sentinel_common::{ConjunctionEvent, NoradId, RiskAssessment, RiskLevel, SatelliteData};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::risk::{DistanceSample, MEDIUM_KM, Neighbor, assess_neighbors, classify};
use crate::module::orbit::{EARTH_RADIUS_KM, PropagationError, Propagator, StateVector};

/// Scores every tracked object against its neighbors at one shared instant.
pub struct CollisionEngine {
    propagator: Arc<dyn Propagator>,
    permits: Arc<Semaphore>,
}

impl CollisionEngine {
    pub fn new(propagator: Arc<dyn Propagator>, max_concurrent: usize) -> Self {
        Self {
            propagator,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    async fn propagate(
        &self,
        satellite: &SatelliteData,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        if satellite.line1.is_empty() || satellite.line2.is_empty() {
            return Err(PropagationError::InvalidElements(format!(
                "missing TLE for {}",
                satellite.norad_id
            )));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PropagationError::Propagation(e.to_string()))?;

        self.propagator
            .position_velocity(&satellite.line1, &satellite.line2, &satellite.name, at)
            .await
    }

    /// States for every satellite that propagates; failures are logged and left out.
    async fn propagate_all(
        &self,
        satellites: &[SatelliteData],
        at: DateTime<Utc>,
    ) -> HashMap<NoradId, StateVector> {
        let results = join_all(satellites.iter().map(|sat| async move {
            (sat.norad_id, self.propagate(sat, at).await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(norad_id, result)| match result {
                Ok(state) => Some((norad_id, state)),
                Err(e) => {
                    tracing::warn!("Skipping NORAD {} in risk pass: {}", norad_id, e);
                    None
                }
            })
            .collect()
    }

    fn score(
        target: &SatelliteData,
        target_state: &StateVector,
        satellites: &[SatelliteData],
        states: &HashMap<NoradId, StateVector>,
        at: DateTime<Utc>,
    ) -> RiskAssessment {
        let neighbors: Vec<Neighbor> = satellites
            .iter()
            .filter(|other| other.norad_id != target.norad_id)
            .filter_map(|other| {
                let state = states.get(&other.norad_id)?;
                Some(Neighbor {
                    sample: DistanceSample {
                        object_a: target.norad_id,
                        object_b: other.norad_id,
                        distance_km: target_state.distance_to(state),
                        at,
                    },
                    object_type: other.object_type,
                })
            })
            .collect();

        let altitude = target_state.radius_km() - EARTH_RADIUS_KM;
        assess_neighbors(target.object_type, Some(altitude), &neighbors)
    }

    /// Assess one object against `satellites` at `at`.
    pub async fn assess(
        &self,
        target: &SatelliteData,
        satellites: &[SatelliteData],
        at: DateTime<Utc>,
    ) -> Result<RiskAssessment, PropagationError> {
        let target_state = self.propagate(target, at).await?;
        let states = self.propagate_all(satellites, at).await;
        Ok(Self::score(target, &target_state, satellites, &states, at))
    }

    /// Assess every object in `satellites`, keyed by NORAD id.
    ///
    /// Objects that fail to propagate are absent from the result.
    pub async fn assess_all(
        &self,
        satellites: &[SatelliteData],
        at: DateTime<Utc>,
    ) -> HashMap<NoradId, RiskAssessment> {
        let states = self.propagate_all(satellites, at).await;

        let assessments: HashMap<NoradId, RiskAssessment> = satellites
            .iter()
            .filter_map(|target| {
                let state = states.get(&target.norad_id)?;
                Some((
                    target.norad_id,
                    Self::score(target, state, satellites, &states, at),
                ))
            })
            .collect();

        let high_risk = assessments.values().filter(|a| a.level.is_high_risk()).count();
        tracing::info!(
            "Assessed collision risk for {}/{} satellites ({} high risk)",
            assessments.len(),
            satellites.len(),
            high_risk
        );
        assessments
    }

    /// Hourly close-approach scan over `[start, start + hours)`.
    ///
    /// Samples are one hour apart, so a pass shorter than that between
    /// samples is not seen.
    pub async fn predict_conjunctions(
        &self,
        first: &SatelliteData,
        second: &SatelliteData,
        hours: u32,
        start: DateTime<Utc>,
    ) -> Vec<ConjunctionEvent> {
        let mut events = Vec::new();

        for hour in 0..hours {
            let at = start + Duration::hours(i64::from(hour));
            let (a, b) = tokio::join!(self.propagate(first, at), self.propagate(second, at));

            let (a, b) = match (a, b) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!("Conjunction sample at {} skipped: {}", at, e);
                    continue;
                }
            };

            let distance_km = a.distance_to(&b);
            if distance_km <= MEDIUM_KM {
                events.push(ConjunctionEvent {
                    time: at,
                    distance_km,
                    risk_level: classify(distance_km).unwrap_or(RiskLevel::Low),
                });
            }
        }

        tracing::info!(
            "Found {} conjunction events between {} and {} over {}h",
            events.len(),
            first.norad_id,
            second.norad_id,
            hours
        );
        events
    }
}
