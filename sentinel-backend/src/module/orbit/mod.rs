//! Orbit propagation adapter and derived orbital parameters

mod propagator;
pub use propagator::{PropagationError, Propagator, Sgp4Propagator, StateVector};

mod snapshot;
pub use snapshot::{EARTH_RADIUS_KM, footprint_radius_km, gmst_degrees, orbital_snapshot};
