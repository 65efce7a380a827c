//! NOAA SWPC space-weather client.
//!
//! SWPC products are JSON tables: either an array of rows whose first row is
//! a header, or an array of objects. Values may be numbers or numeric
//! strings. Only the newest row of each product is used.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use sentinel_common::SpaceWeather;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

use super::{WeatherSource, drag_factor};
use crate::config::WeatherConfig;

const SOLAR_FLUX_PATH: &str = "/products/10cm-radio-flux/10cm-flux-7-day.json";
const KP_INDEX_PATH: &str = "/products/noaa-planetary-k-index.json";
const SOLAR_WIND_MAG_PATH: &str = "/products/solar-wind/mag-2-hour.json";
const SOLAR_WIND_PLASMA_PATH: &str = "/products/solar-wind/plasma-2-hour.json";

/// Column of the newest row to read, or object keys to try in order
struct Column {
    index: usize,
    keys: &'static [&'static str],
}

const F107: Column = Column { index: 1, keys: &["flux", "f10_7"] };
const KP: Column = Column { index: 1, keys: &["Kp", "kp", "kp_index"] };
/// `[time_tag, bx, by, bz, lon, lat, bt]`
const BT: Column = Column { index: 6, keys: &["bt", "magnetic_field"] };
/// `[time_tag, density, speed, temperature]`
const WIND_SPEED: Column = Column { index: 2, keys: &["speed", "wind_speed"] };

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Value of `column` in the newest row of a SWPC product
fn latest_value(product: &Value, column: &Column) -> Option<f64> {
    let latest = product.as_array()?.last()?;
    match latest {
        Value::Array(row) => row.get(column.index).and_then(as_f64),
        Value::Object(row) => column.keys.iter().find_map(|key| row.get(*key).and_then(as_f64)),
        _ => None,
    }
}

/// Client for the four SWPC products behind [`SpaceWeather`]
pub struct NoaaWeatherClient {
    base_url: String,
    client: Client,
    cache_ttl: Duration,
    cached: Mutex<Option<(DateTime<Utc>, SpaceWeather)>>,
}

impl NoaaWeatherClient {
    pub fn new(config: &WeatherConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("orbit-sentinel/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            cache_ttl: Duration::seconds(config.cache_seconds),
            cached: Mutex::new(None),
        })
    }

    fn cached_at(&self, now: DateTime<Utc>) -> Option<SpaceWeather> {
        let cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|(fetched_at, _)| now - *fetched_at < self.cache_ttl)
            .map(|(_, weather)| weather.clone())
    }

    async fn fetch_value(&self, path: &str, column: &Column) -> Option<f64> {
        let url = format!("{}{}", self.base_url, path);
        let result = async {
            self.client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        }
        .await;

        match result {
            Ok(product) => {
                let value = latest_value(&product, column);
                if value.is_none() {
                    tracing::warn!("No usable value in {}", path);
                }
                value
            }
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}", path, e);
                None
            }
        }
    }

    async fn fetch_conditions(&self) -> SpaceWeather {
        let (f107, kp, bt, speed) = tokio::join!(
            self.fetch_value(SOLAR_FLUX_PATH, &F107),
            self.fetch_value(KP_INDEX_PATH, &KP),
            self.fetch_value(SOLAR_WIND_MAG_PATH, &BT),
            self.fetch_value(SOLAR_WIND_PLASMA_PATH, &WIND_SPEED),
        );

        SpaceWeather {
            solar_flux_f107: f107,
            geomagnetic_kp: kp,
            solar_wind_speed: speed,
            magnetic_field_bt: bt,
            atmospheric_drag_factor: drag_factor(f107, kp),
        }
    }
}

#[async_trait]
impl WeatherSource for NoaaWeatherClient {
    async fn current_conditions(&self) -> Option<SpaceWeather> {
        let now = Utc::now();
        if let Some(weather) = self.cached_at(now) {
            tracing::debug!("Returning cached space weather data");
            return (!weather.is_empty()).then_some(weather);
        }

        // An all-failed fetch is cached for the TTL as well
        let weather = self.fetch_conditions().await;
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some((now, weather.clone()));

        if weather.is_empty() {
            tracing::error!("All space weather sources failed");
            return None;
        }
        Some(weather)
    }
}
