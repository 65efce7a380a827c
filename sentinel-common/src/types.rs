use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// NORAD ID type (tracked object unique identifier)
pub type NoradId = u32;

/// One two-line element set as delivered by the catalog.
///
/// Records are created by the parser and never mutated afterwards; a cache
/// refresh replaces the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TleRecord {
    pub norad_id: NoradId,
    /// Synthesized when the source carries no name line
    pub name: String,
    pub line1: String,
    pub line2: String,
    /// Element set epoch (line 1, columns 19-32)
    pub epoch: DateTime<Utc>,
}

impl TleRecord {
    /// Inclination in degrees (line 2, columns 9-16)
    pub fn inclination_deg(&self) -> Option<f64> {
        field_f64(&self.line2, 8, 16)
    }

    /// Eccentricity (line 2, columns 27-33, leading decimal point implied)
    pub fn eccentricity(&self) -> Option<f64> {
        let digits = self.line2.get(26..33)?.trim();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        format!("0.{}", digits).parse().ok()
    }

    /// Mean motion in revolutions per day (line 2, columns 53-63)
    pub fn mean_motion(&self) -> Option<f64> {
        field_f64(&self.line2, 52, 63)
    }
}

fn field_f64(line: &str, start: usize, end: usize) -> Option<f64> {
    line.get(start..end.min(line.len()))?.trim().parse().ok()
}

/// Object type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Payload,
    RocketBody,
    Debris,
    #[default]
    Unknown,
}

impl ObjectType {
    /// Classify an object from its catalog name
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

        if has_any(&["rocket", "r/b", "stage", "booster"]) {
            ObjectType::RocketBody
        } else if has_any(&["debris", "fragment", "piece"]) {
            ObjectType::Debris
        } else if has_any(&["starlink", "satellite", "sat", "mission"]) {
            ObjectType::Payload
        } else {
            ObjectType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Payload => "PAYLOAD",
            ObjectType::RocketBody => "ROCKET_BODY",
            ObjectType::Debris => "DEBRIS",
            ObjectType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Collision risk level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// HIGH and CRITICAL satellites are reported in the batch summary
    pub fn is_high_risk(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Collision and debris risk for one satellite.
///
/// Valid only for the TLE batch it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Heuristic probability of collision in the next 24h, percent
    pub probability_pct: f64,
    /// Objects within the monitoring range (500 km)
    pub nearby_count: usize,
    /// Closest approach, absent when nothing is within monitoring range
    pub closest_km: Option<f64>,
    /// Debris environment score, 0-100
    pub debris_score: f64,
}

/// Position and motion summary derived from a propagated state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalSnapshot {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_km: Option<f64>,
    pub velocity_kmh: Option<f64>,
    pub velocity_ms: Option<f64>,
    pub period_minutes: Option<f64>,
    pub apogee_km: Option<f64>,
    pub perigee_km: Option<f64>,
    pub inclination_deg: Option<f64>,
    pub eccentricity: Option<f64>,
    pub footprint_radius_km: Option<f64>,
}

/// Space weather conditions, every field best-effort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceWeather {
    /// F10.7 solar flux
    pub solar_flux_f107: Option<f64>,
    /// Planetary Kp index
    pub geomagnetic_kp: Option<f64>,
    /// Solar wind speed, km/s
    pub solar_wind_speed: Option<f64>,
    /// Interplanetary magnetic field Bt, nT
    pub magnetic_field_bt: Option<f64>,
    /// Atmospheric drag multiplier (1.0 = nominal)
    pub atmospheric_drag_factor: Option<f64>,
}

impl SpaceWeather {
    pub fn is_empty(&self) -> bool {
        self.solar_flux_f107.is_none()
            && self.geomagnetic_kp.is_none()
            && self.solar_wind_speed.is_none()
            && self.magnetic_field_bt.is_none()
    }
}

/// Coarse space weather outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub forecast_hours: u32,
    pub solar_flux_trend: String,
    pub geomagnetic_risk: String,
    pub atmospheric_drag_trend: String,
}

/// A satellite with everything the backend knows about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteData {
    pub name: String,
    pub norad_id: NoradId,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
    #[serde(default)]
    pub object_type: ObjectType,
    #[serde(default)]
    pub orbital: Option<OrbitalSnapshot>,
    #[serde(default)]
    pub space_weather: Option<SpaceWeather>,
    #[serde(default)]
    pub risk: Option<RiskAssessment>,
    pub last_updated: DateTime<Utc>,
    pub data_source: String,
}

impl SatelliteData {
    pub fn from_record(record: &TleRecord, data_source: &str) -> Self {
        Self {
            name: record.name.clone(),
            norad_id: record.norad_id,
            line1: record.line1.clone(),
            line2: record.line2.clone(),
            epoch: record.epoch,
            object_type: ObjectType::from_name(&record.name),
            orbital: None,
            space_weather: None,
            risk: None,
            last_updated: Utc::now(),
            data_source: data_source.to_string(),
        }
    }

    pub fn altitude_km(&self) -> Option<f64> {
        self.orbital.as_ref().and_then(|o| o.altitude_km)
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk.as_ref().is_some_and(|r| r.level.is_high_risk())
    }
}

/// Batch response for one catalog query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteBatch {
    pub satellites: Vec<SatelliteData>,
    pub total_count: usize,
    pub query_time: DateTime<Utc>,
    pub space_weather_summary: Option<SpaceWeather>,
    /// NORAD IDs assessed HIGH or CRITICAL
    pub high_risk_satellites: Vec<NoradId>,
}

/// A sampled close approach between two objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionEvent {
    pub time: DateTime<Utc>,
    pub distance_km: f64,
    pub risk_level: RiskLevel,
}

/// Snapshot of the upstream gateway's session and quota state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub configured: bool,
    pub session_valid: bool,
    pub session_expires: Option<DateTime<Utc>>,
    pub requests_this_hour: u32,
    pub requests_this_minute: u32,
    pub rate_limit_hour: u32,
    pub rate_limit_minute: u32,
    pub last_request: Option<DateTime<Utc>>,
}

/// Catalog size without orbital, weather or risk work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteCount {
    pub total_active_satellites: usize,
    pub timestamp: DateTime<Utc>,
    pub data_source: String,
}

/// Catalog breakdown by object type, keyed by the type's wire name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub total_satellites: usize,
    pub type_breakdown: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}

/// Result of a conjunction scan between two catalog objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionPrediction {
    pub satellite1: NoradId,
    pub satellite2: NoradId,
    pub prediction_window_hours: u32,
    pub conjunction_events: Vec<ConjunctionEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   24179.50000000  .00016717  00000-0  10270-3 0  9005";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn iss() -> TleRecord {
        TleRecord {
            norad_id: 25544,
            name: "ISS (ZARYA)".to_string(),
            line1: ISS_LINE1.to_string(),
            line2: ISS_LINE2.to_string(),
            epoch: Utc::now(),
        }
    }

    #[test]
    fn test_element_columns() {
        let record = iss();
        assert_eq!(record.inclination_deg(), Some(51.6416));
        assert_eq!(record.eccentricity(), Some(0.0006703));
        assert_eq!(record.mean_motion(), Some(15.72125391));
    }

    #[test]
    fn test_element_columns_short_line() {
        let mut record = iss();
        record.line2 = "2 25544".to_string();
        assert_eq!(record.inclination_deg(), None);
        assert_eq!(record.eccentricity(), None);
        assert_eq!(record.mean_motion(), None);
    }

    #[test]
    fn test_object_type_from_name() {
        assert_eq!(ObjectType::from_name("CZ-4C R/B"), ObjectType::RocketBody);
        assert_eq!(ObjectType::from_name("FENGYUN 1C DEB PIECE"), ObjectType::Debris);
        assert_eq!(ObjectType::from_name("STARLINK-1007"), ObjectType::Payload);
        assert_eq!(ObjectType::from_name("SATELLITE-43013"), ObjectType::Payload);
        assert_eq!(ObjectType::from_name("POLAR-43013"), ObjectType::Unknown);
    }

    #[test]
    fn test_risk_level_ordering_and_wire_format() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert!(RiskLevel::High.is_high_risk());
        assert!(!RiskLevel::Medium.is_high_risk());
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(serde_json::to_string(&ObjectType::RocketBody).unwrap(), "\"ROCKET_BODY\"");
    }
}
