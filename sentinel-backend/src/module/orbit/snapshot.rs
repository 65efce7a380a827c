//! Orbital snapshot derivation from a propagated state.
//!
//! Ground position uses a spherical Earth and GMST rotation only (no polar
//! motion or nutation), which is ample for a dashboard-grade subpoint.

use chrono::{DateTime, Utc};
use sentinel_common::{OrbitalSnapshot, TleRecord};
use std::f64::consts::PI;

use super::propagator::StateVector;

/// Mean Earth radius, km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth gravitational parameter, km^3/s^2
const EARTH_MU: f64 = 398_600.4418;

const MINUTES_PER_DAY: f64 = 1440.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Greenwich mean sidereal time at `at`, degrees in [0, 360)
pub fn gmst_degrees(at: DateTime<Utc>) -> f64 {
    let julian_date = at.timestamp_millis() as f64 / 86_400_000.0 + 2_440_587.5;
    let days_since_j2000 = julian_date - 2_451_545.0;
    (280.460_618_37 + 360.985_647_366_29 * days_since_j2000).rem_euclid(360.0)
}

/// Wrap a longitude into [-180, 180)
fn wrap_longitude(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Build the snapshot for `record` from its state at `at`.
pub fn orbital_snapshot(record: &TleRecord, state: &StateVector, at: DateTime<Utc>) -> OrbitalSnapshot {
    let [x, y, z] = state.position;
    let radius = state.radius_km();
    let speed = state.speed_km_s();

    let (latitude, longitude, altitude) = if radius > 0.0 {
        let latitude = (z / radius).asin().to_degrees();
        let longitude = wrap_longitude(y.atan2(x).to_degrees() - gmst_degrees(at));
        (Some(latitude), Some(longitude), Some(radius - EARTH_RADIUS_KM))
    } else {
        (None, None, None)
    };

    let inclination = record.inclination_deg();
    let eccentricity = record.eccentricity();
    let mean_motion = record.mean_motion().filter(|mm| *mm > 0.0);

    let period_minutes = mean_motion.map(|mm| MINUTES_PER_DAY / mm);
    let semi_major_axis = mean_motion.map(|mm| {
        let n = mm * 2.0 * PI / SECONDS_PER_DAY;
        (EARTH_MU / (n * n)).cbrt()
    });
    let (apogee_km, perigee_km) = match (semi_major_axis, eccentricity) {
        (Some(a), Some(e)) => (
            Some(a * (1.0 + e) - EARTH_RADIUS_KM),
            Some(a * (1.0 - e) - EARTH_RADIUS_KM),
        ),
        _ => (None, None),
    };

    OrbitalSnapshot {
        latitude,
        longitude,
        altitude_km: altitude,
        velocity_kmh: Some(speed * 3600.0),
        velocity_ms: Some(speed * 1000.0),
        period_minutes,
        apogee_km,
        perigee_km,
        inclination_deg: inclination,
        eccentricity,
        footprint_radius_km: altitude.filter(|h| *h > 0.0).map(footprint_radius_km),
    }
}

/// Horizon distance for a satellite at `altitude_km`
pub fn footprint_radius_km(altitude_km: f64) -> f64 {
    (2.0 * EARTH_RADIUS_KM * altitude_km + altitude_km * altitude_km).sqrt()
}
