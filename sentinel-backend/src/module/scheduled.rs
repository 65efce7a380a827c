//! Scheduled task manager - keeps the TLE cache warm
//!
//! Catalog slots listed in the refresh config are re-fetched on a fixed
//! cadence so user requests rarely pay for an upstream round trip.

use super::catalog::{CatalogError, CatalogManager};
use crate::config::RefreshConfig;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const MAX_ATTEMPTS: u32 = 3;
/// Refreshes run this long after each interval boundary
const UPDATE_OFFSET_SECS: i64 = 120;
const REFRESH_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    pub refresh_interval_minutes: u64,

    /// Catalog limits refreshed on each run
    pub limits: Vec<usize>,

    /// First retry waits this long, later ones proportionally longer
    pub retry_delay: Duration,

    pub perform_initial_update: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: 120,
            limits: vec![100],
            retry_delay: Duration::from_secs(60),
            perform_initial_update: true,
        }
    }
}

impl From<&RefreshConfig> for ScheduledTaskConfig {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            refresh_interval_minutes: config.interval_minutes.max(1),
            limits: config.limits.clone(),
            perform_initial_update: config.perform_initial_update,
            ..Self::default()
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    catalog: Arc<CatalogManager>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduledTaskConfig, catalog: Arc<CatalogManager>) -> Self {
        Self {
            config,
            catalog,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        let handle = self.start_refresh_task();
        self.task_handles.push(handle);

        tracing::info!(
            "Started {} scheduled tasks (TLE refresh every {} min for limits {:?})",
            self.task_handles.len(),
            self.config.refresh_interval_minutes,
            self.config.limits
        );
    }

    fn start_refresh_task(&self) -> JoinHandle<()> {
        let catalog = self.catalog.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            if config.perform_initial_update {
                tracing::info!("Performing initial TLE refresh...");
                Self::run_refresh(&catalog, &config).await;
            }

            loop {
                let now = Utc::now();
                let next_trigger = Self::calculate_next_update_time(now, config.refresh_interval_minutes);
                let sleep_duration = (next_trigger - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(60));

                tracing::info!(
                    "Next TLE refresh at: {} (in {:.1} min)",
                    next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                    sleep_duration.as_secs_f64() / 60.0
                );

                tokio::time::sleep(sleep_duration).await;
                Self::run_refresh(&catalog, &config).await;
            }
        })
    }

    /// Next interval boundary plus the offset, strictly after `now`
    fn calculate_next_update_time(now: DateTime<Utc>, interval_minutes: u64) -> DateTime<Utc> {
        let interval_secs = (interval_minutes.max(1) * 60) as i64;
        let elapsed = now.timestamp() - UPDATE_OFFSET_SECS;
        let next = (elapsed.div_euclid(interval_secs) + 1) * interval_secs + UPDATE_OFFSET_SECS;

        DateTime::from_timestamp(next, 0)
            .unwrap_or_else(|| now + chrono::Duration::seconds(interval_secs))
    }

    async fn run_refresh(catalog: &Arc<CatalogManager>, config: &ScheduledTaskConfig) {
        for &limit in &config.limits {
            let result = refresh_with_retries(
                move || async move {
                    match tokio::time::timeout(REFRESH_TIMEOUT, catalog.refresh(limit)).await {
                        Ok(result) => result,
                        Err(_) => Err(CatalogError::Unavailable(format!(
                            "refresh timed out after {} seconds",
                            REFRESH_TIMEOUT.as_secs()
                        ))),
                    }
                },
                config.retry_delay,
            )
            .await;

            match result {
                Ok(count) => tracing::info!("TLE refresh (limit={}): {} satellites", limit, count),
                Err(e) => tracing::error!("TLE refresh (limit={}) failed: {}", limit, e),
            }
        }
    }

    /// Gracefully shutdown all tasks
    pub fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}

/// Run `attempt` up to three times, waiting `base_delay * n` after the n-th
/// transient failure. Non-transient failures return immediately.
async fn refresh_with_retries<F, Fut>(mut attempt: F, base_delay: Duration) -> Result<usize, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize, CatalogError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(count) => return Ok(count),
            Err(e) if e.is_transient() && tries < MAX_ATTEMPTS => {
                let delay = base_delay * tries;
                tracing::warn!(
                    "TLE refresh failed (attempt {}/{}): {}. Retrying in {}s...",
                    tries,
                    MAX_ATTEMPTS,
                    e,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
