use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropagationError {
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),

    #[error("Propagation failed: {0}")]
    Propagation(String),
}

/// Earth-centered inertial (TEME) position and velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    /// km
    pub position: [f64; 3],
    /// km/s
    pub velocity: [f64; 3],
}

impl StateVector {
    pub fn radius_km(&self) -> f64 {
        norm(&self.position)
    }

    pub fn speed_km_s(&self) -> f64 {
        norm(&self.velocity)
    }

    /// Straight-line distance between two states, km
    pub fn distance_to(&self, other: &StateVector) -> f64 {
        let d = [
            self.position[0] - other.position[0],
            self.position[1] - other.position[1],
            self.position[2] - other.position[2],
        ];
        norm(&d)
    }
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Propagation adapter: element set plus instant in, state vector out
#[async_trait]
pub trait Propagator: Send + Sync {
    async fn position_velocity(
        &self,
        line1: &str,
        line2: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError>;
}

/// SGP4/SDP4 propagation via the `sgp4` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Propagator;

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self
    }

    fn propagate(
        line1: &str,
        line2: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let elements =
            sgp4::Elements::from_tle(Some(name.to_string()), line1.as_bytes(), line2.as_bytes())
                .map_err(|e| PropagationError::InvalidElements(e.to_string()))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| PropagationError::InvalidElements(e.to_string()))?;

        let minutes = (at.naive_utc() - elements.datetime).num_milliseconds() as f64 / 60_000.0;
        let prediction = constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| PropagationError::Propagation(e.to_string()))?;

        Ok(StateVector {
            position: prediction.position,
            velocity: prediction.velocity,
        })
    }
}

#[async_trait]
impl Propagator for Sgp4Propagator {
    async fn position_velocity(
        &self,
        line1: &str,
        line2: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        Self::propagate(line1, line2, name, at)
    }
}
