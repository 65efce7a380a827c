//! TLE acquisition pipeline
//!
//! ## Main Components
//! - `SpaceTrackGateway`: authenticated, rate-limited catalog client
//! - `parse_tle_text`: fixed-width two-line text into `TleRecord`s
//! - `TleCache`: freshness-bounded store, one slot per query shape

// ============ Errors ============
mod error;
pub use error::{GatewayError, QuotaScope};

// ============ Upstream Gateway ============
mod rate_limit;
mod session;

mod gateway;
pub use gateway::{SpaceTrackGateway, TleSource};

// ============ Parser ============
mod parser;
pub use parser::{parse_tle_epoch, parse_tle_text};

// ============ Cache ============
mod cache;
pub use cache::{CacheKey, RecordBatch, TleCache};
