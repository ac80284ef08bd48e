//! Domain models - core types for zone membership tracking
//!
//! - `types` - `Zone`, `Coordinate`, `VehicleStatus`, `ZoneEvent`
//! - `geo` - haversine great-circle distance
//! - `error` - `GeofenceError` kinds

pub mod error;
pub mod geo;
pub mod types;

pub use error::GeofenceError;
