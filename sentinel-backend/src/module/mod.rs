// ============ Catalog Pipeline ============
pub mod catalog;
pub mod collision;
pub mod orbit;
pub mod tle;
pub mod weather;

// ============ Background Tasks ============
pub mod scheduled;
