//! Catalog aggregator
//!
//! `CatalogManager` is the single entry point the HTTP layer and the
//! scheduler talk to. It owns the TLE cache and the risk engine.

mod error;
pub use error::CatalogError;

mod manager;
pub use manager::{CatalogManager, CatalogQuery, CatalogSources, MAX_WINDOW_HOURS};
