//! Catalog aggregator - cache, gateway, parser, orbit and risk in one place
use super::error::CatalogError;
use crate::config::SentinelConfig;
use crate::module::collision::CollisionEngine;
use crate::module::orbit::{Propagator, Sgp4Propagator, orbital_snapshot};
use crate::module::tle::{
    CacheKey, RecordBatch, SpaceTrackGateway, TleCache, TleSource, parse_tle_text,
};
use crate::module::weather::{NoaaWeatherClient, WeatherSource};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use sentinel_common::{
    ConjunctionPrediction, GatewayStatus, NoradId, OrbitalSnapshot, SatelliteBatch, SatelliteCount,
    SatelliteData, SpaceWeather, TleRecord, TypeSummary, WeatherForecast,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Batch size searched by single-satellite lookups
const LOOKUP_LIMIT: usize = 1000;
/// Batch size scanned for high-risk objects
const HIGH_RISK_LIMIT: usize = 500;
/// Batch size used to count the catalog
const COUNT_LIMIT: usize = 10_000;
const TYPE_SUMMARY_LIMIT: usize = 2000;
/// Longest conjunction or forecast window, hours
pub const MAX_WINDOW_HOURS: u32 = 168;

/// What to compute for each satellite in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogQuery {
    pub limit: usize,
    pub include_orbital: bool,
    pub include_weather: bool,
    pub include_risk: bool,
}

impl CatalogQuery {
    /// Records only, no derived data
    pub fn bare(limit: usize) -> Self {
        Self {
            limit,
            include_orbital: false,
            include_weather: false,
            include_risk: false,
        }
    }

    pub fn full(limit: usize) -> Self {
        Self {
            limit,
            include_orbital: true,
            include_weather: true,
            include_risk: true,
        }
    }
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::full(50)
    }
}

/// Collaborators the manager is assembled from
pub struct CatalogSources {
    pub tle: Arc<dyn TleSource>,
    pub propagator: Arc<dyn Propagator>,
    /// `None` when space weather is disabled
    pub weather: Option<Arc<dyn WeatherSource>>,
}

/// Catalog manager - main coordinator, built once and shared
pub struct CatalogManager {
    tle: Arc<dyn TleSource>,
    propagator: Arc<dyn Propagator>,
    weather: Option<Arc<dyn WeatherSource>>,
    cache: TleCache,
    engine: CollisionEngine,
    /// Serializes cache fills so a miss costs one upstream request
    fill_lock: Mutex<()>,
    epoch_window_days: u32,
    persist_dir: Option<PathBuf>,
}

impl CatalogManager {
    pub fn new(sources: CatalogSources, config: &SentinelConfig) -> Arc<Self> {
        let persist_dir = config
            .cache
            .persist
            .then(|| PathBuf::from(&config.data_dir));

        Arc::new(Self {
            engine: CollisionEngine::new(
                sources.propagator.clone(),
                config.collision.max_concurrent_assessments,
            ),
            tle: sources.tle,
            propagator: sources.propagator,
            weather: sources.weather,
            cache: TleCache::new(Duration::minutes(config.cache.ttl_minutes)),
            fill_lock: Mutex::new(()),
            epoch_window_days: config.space_track.epoch_window_days,
            persist_dir,
        })
    }

    /// Manager wired to Space-Track, SGP4 and NOAA
    pub fn from_config(config: &SentinelConfig) -> anyhow::Result<Arc<Self>> {
        if !config.space_track.has_credentials() {
            tracing::warn!("Space-Track credentials not configured; catalog requests will fail");
        }

        let weather: Option<Arc<dyn WeatherSource>> = if config.weather.enabled {
            Some(Arc::new(NoaaWeatherClient::new(&config.weather)?))
        } else {
            None
        };

        Ok(Self::new(
            CatalogSources {
                tle: Arc::new(SpaceTrackGateway::new(config.space_track.clone())?),
                propagator: Arc::new(Sgp4Propagator::new()),
                weather,
            },
            config,
        ))
    }

    /// Load persisted cache entries. Failures only cost an upstream fetch.
    pub async fn initialize(&self) {
        let Some(dir) = &self.persist_dir else {
            return;
        };

        match self.cache.load_from_dir(dir).await {
            Ok(count) => tracing::info!("Catalog manager initialized ({} cache entries)", count),
            Err(e) => tracing::warn!("Ignoring unreadable TLE cache: {:#}", e),
        }
    }

    async fn persist(&self) {
        if let Some(dir) = &self.persist_dir {
            if let Err(e) = self.cache.save_to_dir(dir).await {
                tracing::warn!("Failed to persist TLE cache: {:#}", e);
            }
        }
    }

    /// Fetch, parse and store one catalog slot
    async fn fill(&self, limit: usize, key: &CacheKey) -> Result<RecordBatch, CatalogError> {
        tracing::info!("Fetching fresh TLE data (limit={})", limit);

        let text = self.tle.fetch_catalog(limit, self.epoch_window_days).await?;
        let records = parse_tle_text(&text, limit, Utc::now());
        if records.is_empty() {
            return Err(CatalogError::Unavailable(
                "upstream returned no parseable TLE data".to_string(),
            ));
        }

        let batch = self.cache.put(key, records).await;
        self.persist().await;
        Ok(batch)
    }

    fn check_limit(limit: usize) -> Result<(), CatalogError> {
        if limit == 0 {
            return Err(CatalogError::InvalidRequest("limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Up to `limit` records, from cache when fresh
    async fn records(&self, limit: usize) -> Result<RecordBatch, CatalogError> {
        Self::check_limit(limit)?;

        let key = CacheKey::for_limit(limit);
        if let Some(batch) = self.cache.get(&key).await {
            return Ok(batch);
        }

        let _guard = self.fill_lock.lock().await;
        // Another caller may have filled the slot while we waited
        if let Some(batch) = self.cache.get(&key).await {
            return Ok(batch);
        }
        self.fill(limit, &key).await
    }

    /// Replace the cache slot for `limit` with fresh upstream data.
    pub async fn refresh(&self, limit: usize) -> Result<usize, CatalogError> {
        Self::check_limit(limit)?;
        let key = CacheKey::for_limit(limit);
        let _guard = self.fill_lock.lock().await;
        let batch = self.fill(limit, &key).await?;
        Ok(batch.len())
    }

    async fn snapshot(&self, record: &TleRecord, at: DateTime<Utc>) -> Option<OrbitalSnapshot> {
        match self
            .propagator
            .position_velocity(&record.line1, &record.line2, &record.name, at)
            .await
        {
            Ok(state) => Some(orbital_snapshot(record, &state, at)),
            Err(e) => {
                tracing::warn!("Error calculating orbital data for {}: {}", record.name, e);
                None
            }
        }
    }

    pub async fn active_satellites(&self, query: CatalogQuery) -> Result<SatelliteBatch, CatalogError> {
        let records = self.records(query.limit).await?;
        let now = Utc::now();
        let selected: Vec<&TleRecord> = records.iter().take(query.limit).collect();

        let weather = async {
            if query.include_weather {
                self.current_weather().await
            } else {
                None
            }
        };
        let orbital = async {
            if query.include_orbital {
                join_all(selected.iter().map(|record| self.snapshot(record, now))).await
            } else {
                vec![None; selected.len()]
            }
        };
        let (space_weather, snapshots) = tokio::join!(weather, orbital);

        let source_name = self.tle.source_name();
        let mut satellites: Vec<SatelliteData> = selected
            .iter()
            .zip(snapshots)
            .map(|(record, orbital)| {
                let mut satellite = SatelliteData::from_record(record, source_name);
                satellite.orbital = orbital;
                satellite.space_weather = space_weather.clone();
                satellite
            })
            .collect();

        if satellites.is_empty() {
            return Err(CatalogError::Unavailable("no satellites in catalog".to_string()));
        }

        if query.include_risk && satellites.len() > 1 {
            let mut assessments = self.engine.assess_all(&satellites, now).await;
            for satellite in &mut satellites {
                satellite.risk = assessments.remove(&satellite.norad_id);
            }
        }

        let high_risk_satellites: Vec<NoradId> = satellites
            .iter()
            .filter(|s| s.is_high_risk())
            .map(|s| s.norad_id)
            .collect();

        tracing::info!(
            "Returning {} satellites ({} high risk)",
            satellites.len(),
            high_risk_satellites.len()
        );

        Ok(SatelliteBatch {
            total_count: satellites.len(),
            satellites,
            query_time: now,
            space_weather_summary: space_weather,
            high_risk_satellites,
        })
    }

    pub async fn satellite(&self, norad_id: NoradId) -> Result<SatelliteData, CatalogError> {
        self.active_satellites(CatalogQuery::full(LOOKUP_LIMIT))
            .await?
            .satellites
            .into_iter()
            .find(|s| s.norad_id == norad_id)
            .ok_or(CatalogError::NotFound(norad_id))
    }

    pub async fn high_risk_satellites(&self) -> Result<Vec<SatelliteData>, CatalogError> {
        let mut query = CatalogQuery::bare(HIGH_RISK_LIMIT);
        query.include_risk = true;

        Ok(self
            .active_satellites(query)
            .await?
            .satellites
            .into_iter()
            .filter(SatelliteData::is_high_risk)
            .collect())
    }

    pub async fn satellite_count(&self) -> Result<SatelliteCount, CatalogError> {
        let batch = self.active_satellites(CatalogQuery::bare(COUNT_LIMIT)).await?;
        Ok(SatelliteCount {
            total_active_satellites: batch.total_count,
            timestamp: batch.query_time,
            data_source: self.tle.source_name().to_string(),
        })
    }

    pub async fn type_summary(&self) -> Result<TypeSummary, CatalogError> {
        let batch = self
            .active_satellites(CatalogQuery::bare(TYPE_SUMMARY_LIMIT))
            .await?;

        let mut type_breakdown = BTreeMap::new();
        for satellite in &batch.satellites {
            *type_breakdown
                .entry(satellite.object_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        Ok(TypeSummary {
            total_satellites: batch.satellites.len(),
            type_breakdown,
            timestamp: batch.query_time,
        })
    }

    fn check_window(hours: u32) -> Result<(), CatalogError> {
        if (1..=MAX_WINDOW_HOURS).contains(&hours) {
            Ok(())
        } else {
            Err(CatalogError::InvalidRequest(format!(
                "hours must be between 1 and {}",
                MAX_WINDOW_HOURS
            )))
        }
    }

    pub async fn predict_conjunctions(
        &self,
        norad_id1: NoradId,
        norad_id2: NoradId,
        hours: u32,
    ) -> Result<ConjunctionPrediction, CatalogError> {
        Self::check_window(hours)?;

        let records = self.records(LOOKUP_LIMIT).await?;
        let source_name = self.tle.source_name();
        let find = |norad_id: NoradId| {
            records
                .iter()
                .find(|r| r.norad_id == norad_id)
                .map(|r| SatelliteData::from_record(r, source_name))
                .ok_or(CatalogError::NotFound(norad_id))
        };
        let first = find(norad_id1)?;
        let second = find(norad_id2)?;

        let conjunction_events = self
            .engine
            .predict_conjunctions(&first, &second, hours, Utc::now())
            .await;

        Ok(ConjunctionPrediction {
            satellite1: norad_id1,
            satellite2: norad_id2,
            prediction_window_hours: hours,
            conjunction_events,
        })
    }

    pub fn gateway_status(&self) -> GatewayStatus {
        self.tle.status()
    }

    pub async fn current_weather(&self) -> Option<SpaceWeather> {
        self.weather.as_ref()?.current_conditions().await
    }

    pub async fn weather_forecast(&self, hours: u32) -> Result<WeatherForecast, CatalogError> {
        Self::check_window(hours)?;

        let weather = self
            .weather
            .as_ref()
            .ok_or_else(|| CatalogError::Unavailable("space weather is disabled".to_string()))?;
        weather
            .forecast(hours)
            .await
            .ok_or_else(|| CatalogError::Unavailable("space weather forecast unavailable".to_string()))
    }
}
