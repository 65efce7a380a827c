use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persisted cache files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub space_track: SpaceTrackConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub collision: CollisionConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Upstream catalog credentials and quota
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceTrackConfig {
    #[serde(default = "default_space_track_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_rate_limit_per_hour")]
    pub rate_limit_per_hour: u32,

    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,

    /// Only objects with an epoch newer than now minus this window are queried
    #[serde(default = "default_epoch_window_days")]
    pub epoch_window_days: u32,

    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,

    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_minutes")]
    pub ttl_minutes: i64,

    /// Persist cache entries under `data_dir`
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    #[serde(default = "default_max_concurrent_assessments")]
    pub max_concurrent_assessments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_noaa_url")]
    pub base_url: String,

    #[serde(default = "default_weather_cache_secs")]
    pub cache_seconds: i64,

    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_refresh_interval_minutes")]
    pub interval_minutes: u64,

    /// Catalog sizes kept warm by the background task
    #[serde(default = "default_refresh_limits")]
    pub limits: Vec<usize>,

    #[serde(default = "default_true")]
    pub perform_initial_update: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_space_track_url() -> String {
    "https://www.space-track.org".to_string()
}

fn default_rate_limit_per_hour() -> u32 {
    300
}

fn default_rate_limit_per_minute() -> u32 {
    30
}

fn default_session_ttl_minutes() -> i64 {
    30
}

fn default_epoch_window_days() -> u32 {
    30
}

fn default_login_timeout_secs() -> u64 {
    30
}

fn default_query_timeout_secs() -> u64 {
    60
}

fn default_cache_ttl_minutes() -> i64 {
    120
}

fn default_max_concurrent_assessments() -> usize {
    5
}

fn default_noaa_url() -> String {
    "https://services.swpc.noaa.gov".to_string()
}

fn default_weather_cache_secs() -> i64 {
    300
}

fn default_weather_timeout_secs() -> u64 {
    30
}

fn default_refresh_interval_minutes() -> u64 {
    120
}

fn default_refresh_limits() -> Vec<usize> {
    vec![100]
}

fn default_true() -> bool {
    true
}

impl Default for SpaceTrackConfig {
    fn default() -> Self {
        Self {
            base_url: default_space_track_url(),
            username: String::new(),
            password: String::new(),
            rate_limit_per_hour: default_rate_limit_per_hour(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            session_ttl_minutes: default_session_ttl_minutes(),
            epoch_window_days: default_epoch_window_days(),
            login_timeout_secs: default_login_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl SpaceTrackConfig {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl_minutes(),
            persist: true,
        }
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_assessments: default_max_concurrent_assessments(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_noaa_url(),
            cache_seconds: default_weather_cache_secs(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_refresh_interval_minutes(),
            limits: default_refresh_limits(),
            perform_initial_update: true,
        }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            space_track: SpaceTrackConfig::default(),
            cache: CacheConfig::default(),
            collision: CollisionConfig::default(),
            weather: WeatherConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl SentinelConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SentinelConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    /// Credentials from the environment override the file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(username) = non_empty("SPACE_TRACK_USERNAME") {
            self.space_track.username = username;
        }
        if let Some(password) = non_empty("SPACE_TRACK_PASSWORD") {
            self.space_track.password = password;
        }
        if let Some(base_url) = non_empty("SPACE_TRACK_BASE_URL") {
            self.space_track.base_url = base_url;
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
