//! Space-weather collaborator
//!
//! Weather is advisory: every source failure degrades to an absent field,
//! never to an error for the caller.

use async_trait::async_trait;
use sentinel_common::{SpaceWeather, WeatherForecast};

mod noaa;
pub use noaa::NoaaWeatherClient;

/// Drag factor is never reported above this multiple of nominal
const MAX_DRAG_FACTOR: f64 = 2.0;

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Latest conditions, `None` when nothing could be fetched
    async fn current_conditions(&self) -> Option<SpaceWeather>;

    async fn forecast(&self, hours: u32) -> Option<WeatherForecast> {
        let current = self.current_conditions().await?;
        Some(forecast_from(&current, hours))
    }
}

/// Atmospheric drag multiplier from solar flux and Kp.
///
/// F10.7 above 150 adds up to 30% per 100 sfu, Kp above 4 adds up to 20% per
/// 5 points. `None` when neither input is known.
pub fn drag_factor(f107: Option<f64>, kp: Option<f64>) -> Option<f64> {
    if f107.is_none() && kp.is_none() {
        return None;
    }

    let mut factor = 1.0;
    if let Some(f107) = f107.filter(|f| *f > 150.0) {
        factor += (f107 - 150.0) / 100.0 * 0.3;
    }
    if let Some(kp) = kp.filter(|k| *k > 4.0) {
        factor += (kp - 4.0) / 5.0 * 0.2;
    }
    Some(factor.min(MAX_DRAG_FACTOR))
}

/// Persistence forecast: conditions are assumed to hold for `hours`.
pub fn forecast_from(current: &SpaceWeather, hours: u32) -> WeatherForecast {
    let geomagnetic_risk = if current.geomagnetic_kp.unwrap_or(0.0) < 4.0 {
        "low"
    } else {
        "moderate"
    };
    let drag_trend = if current.atmospheric_drag_factor.unwrap_or(1.0) > 1.1 {
        "increasing"
    } else {
        "stable"
    };

    WeatherForecast {
        forecast_hours: hours,
        solar_flux_trend: "stable".to_string(),
        geomagnetic_risk: geomagnetic_risk.to_string(),
        atmospheric_drag_trend: drag_trend.to_string(),
    }
}
