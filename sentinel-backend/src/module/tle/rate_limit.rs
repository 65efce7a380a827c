use chrono::{DateTime, Duration, Utc};

use super::error::{GatewayError, QuotaScope};

/// Per-minute and per-hour request counters for the upstream quota.
///
/// Windows roll forward lazily when checked; nothing runs in the background.
#[derive(Debug, Clone, Default)]
pub struct RateLimitWindow {
    pub count_minute: u32,
    pub count_hour: u32,
    pub reset_minute_at: Option<DateTime<Utc>>,
    pub reset_hour_at: Option<DateTime<Utc>>,
}

impl RateLimitWindow {
    /// Reserve one request slot at `now`, or fail without consuming one.
    pub fn check(
        &mut self,
        now: DateTime<Utc>,
        per_minute: u32,
        per_hour: u32,
    ) -> Result<(), GatewayError> {
        self.roll_forward(now);

        if self.count_hour >= per_hour {
            tracing::warn!("Upstream hourly rate limit reached ({}/hour)", per_hour);
            return Err(GatewayError::RateLimited {
                scope: QuotaScope::Hour,
                limit: per_hour,
            });
        }
        if self.count_minute >= per_minute {
            tracing::warn!("Upstream minute rate limit reached ({}/minute)", per_minute);
            return Err(GatewayError::RateLimited {
                scope: QuotaScope::Minute,
                limit: per_minute,
            });
        }

        self.count_minute += 1;
        self.count_hour += 1;
        Ok(())
    }

    fn roll_forward(&mut self, now: DateTime<Utc>) {
        if self.reset_hour_at.is_none_or(|reset| now >= reset) {
            self.count_hour = 0;
            self.reset_hour_at = Some(now + Duration::hours(1));
        }
        if self.reset_minute_at.is_none_or(|reset| now >= reset) {
            self.count_minute = 0;
            self.reset_minute_at = Some(now + Duration::minutes(1));
        }
    }
}
