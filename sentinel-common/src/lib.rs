//! Shared data model for Orbit Sentinel.
//!
//! These types form the response schema produced by the backend and are
//! serialized as JSON over the HTTP surface.

pub mod types;

pub use types::*;
