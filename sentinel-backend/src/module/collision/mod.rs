//! Collision risk assessment
//!
//! `risk` holds the threshold rules; `CollisionEngine` runs them across a
//! fleet with bounded propagation concurrency.

mod risk;
pub use risk::{
    CRITICAL_KM, DistanceSample, HIGH_KM, MEDIUM_KM, MONITORING_KM, Neighbor, assess_neighbors,
    classify, collision_probability, debris_score,
};

mod engine;
pub use engine::CollisionEngine;
