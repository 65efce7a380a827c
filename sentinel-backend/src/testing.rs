//! In-process doubles for the catalog's collaborators

use crate::config::SentinelConfig;
use crate::module::catalog::{CatalogManager, CatalogSources};
use crate::module::orbit::{PropagationError, Propagator, StateVector};
use crate::module::tle::{GatewayError, TleSource};
use crate::module::weather::WeatherSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_common::{GatewayStatus, SpaceWeather};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// ISS, NOAA-19 and a GEO object
pub const CATALOG: &str = "\
1 25544U 98067A   24179.50000000  .00016717  00000-0  10270-3 0  9005
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
1 33591U 09005A   24179.25000000  .00000131  00000-0  97349-4 0  9996
2 33591  99.0993 225.6052 0013713 254.1786 105.7875 14.12941133793182
1 41866U 16071A   24179.75000000 -.00000261  00000-0  00000+0 0  9994
2 41866   0.0242 282.7351 0001022 150.0722 227.0601  1.00271555 27963
";

pub struct FakeSource {
    body: Result<String, fn() -> GatewayError>,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn serving(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Ok(body.to_string()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: fn() -> GatewayError) -> Arc<Self> {
        Arc::new(Self {
            body: Err(error),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TleSource for FakeSource {
    async fn fetch_catalog(&self, _limit: usize, _days: u32) -> Result<String, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        match &self.body {
            Ok(body) => Ok(body.clone()),
            Err(error) => Err(error()),
        }
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            configured: true,
            session_valid: true,
            session_expires: None,
            requests_this_hour: self.fetches() as u32,
            requests_this_minute: self.fetches() as u32,
            rate_limit_hour: 300,
            rate_limit_minute: 30,
            last_request: None,
        }
    }

    fn source_name(&self) -> &str {
        "Fake"
    }
}

/// Places objects on the x axis by NORAD id: 25544 and 33591 are 10 km apart
pub struct AxisPropagator;

#[async_trait]
impl Propagator for AxisPropagator {
    async fn position_velocity(
        &self,
        line1: &str,
        _line2: &str,
        _name: &str,
        _at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let x = match line1.get(2..7) {
            Some("25544") => 6800.0,
            Some("33591") => 6810.0,
            Some("41866") => 42_164.0,
            other => return Err(PropagationError::Propagation(format!("unknown {:?}", other))),
        };
        Ok(StateVector {
            position: [x, 0.0, 0.0],
            velocity: [0.0, 7.5, 0.0],
        })
    }
}

pub struct FixedWeather;

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn current_conditions(&self) -> Option<SpaceWeather> {
        Some(SpaceWeather {
            solar_flux_f107: Some(180.0),
            geomagnetic_kp: Some(3.0),
            solar_wind_speed: None,
            magnetic_field_bt: None,
            atmospheric_drag_factor: Some(1.09),
        })
    }
}

/// Defaults with persistence under `data_dir`, or off when `None`
pub fn config(data_dir: Option<&TempDir>) -> SentinelConfig {
    let mut config = SentinelConfig::default();
    match data_dir {
        Some(dir) => config.data_dir = dir.path().to_string_lossy().to_string(),
        None => config.cache.persist = false,
    }
    config
}

pub fn manager(source: Arc<FakeSource>, data_dir: Option<&TempDir>) -> Arc<CatalogManager> {
    CatalogManager::new(
        CatalogSources {
            tle: source,
            propagator: Arc::new(AxisPropagator),
            weather: Some(Arc::new(FixedWeather)),
        },
        &config(data_dir),
    )
}
