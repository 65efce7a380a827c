use sentinel_common::NoradId;
use thiserror::Error;

use crate::module::tle::GatewayError;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// No usable data could be produced; never reported as an empty success
    #[error("satellite data unavailable: {0}")]
    Unavailable(String),

    #[error("satellite {0} not found")]
    NotFound(NoradId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Upstream(#[from] GatewayError),
}

impl CatalogError {
    /// A later refresh may succeed without operator action
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Unavailable(_) => true,
            CatalogError::Upstream(e) => e.is_transient(),
            CatalogError::NotFound(_) | CatalogError::InvalidRequest(_) => false,
        }
    }
}
