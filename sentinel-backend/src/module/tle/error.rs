use thiserror::Error;

/// Which quota window was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    Minute,
    Hour,
}

impl std::fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaScope::Minute => write!(f, "per-minute"),
            QuotaScope::Hour => write!(f, "per-hour"),
        }
    }
}

/// Failures of one gateway call. None of them are retried automatically.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream credentials are not configured")]
    MissingCredentials,

    #[error("upstream rejected login: {0}")]
    Auth(String),

    #[error("{scope} rate limit reached ({limit} requests)")]
    RateLimited { scope: QuotaScope, limit: u32 },

    #[error("upstream session expired")]
    SessionExpired,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl GatewayError {
    /// Auth failures need an operator to fix the configuration
    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::MissingCredentials | GatewayError::Auth(_))
    }

    /// Worth another attempt later without operator action
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::SessionExpired
                | GatewayError::UpstreamUnavailable(_)
        )
    }
}
