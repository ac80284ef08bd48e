//! Error kinds surfaced by the geofence core

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    /// Latitude/longitude outside the valid range. Rejected before any state changes.
    #[error("invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    /// Status requested for a vehicle that never sent an update
    #[error("vehicle not found: {0}")]
    UnknownVehicle(String),
    /// Bad zone catalog entry. Only raised at startup.
    #[error("invalid zone definition: {0}")]
    InvalidZoneDefinition(String),
}
