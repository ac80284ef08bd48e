//! Immutable zone catalog, loaded once at startup

use crate::domain::error::GeofenceError;
use crate::domain::types::{Coordinate, Zone};
use rustc_hash::FxHashSet;
use tracing::info;

/// Ordered, validated set of zones. Definition order is preserved and used as
/// the overlap tie-break by the containment resolver.
#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    zones: Vec<Zone>,
}

impl ZoneCatalog {
    /// Validate zone definitions and build the catalog.
    ///
    /// Fails on empty or duplicate ids, a center outside the valid coordinate
    /// range, or a radius that is not a positive finite number.
    pub fn new(zones: Vec<Zone>) -> Result<Self, GeofenceError> {
        validate_zones(&zones)?;

        info!(
            zones = %zones.len(),
            ids = ?zones.iter().map(|z| z.id.as_str()).collect::<Vec<_>>(),
            "zone_catalog_loaded"
        );

        Ok(Self { zones })
    }

    /// All zones in definition order
    #[inline]
    pub fn lookup(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Check every zone definition, stopping at the first bad one
fn validate_zones(zones: &[Zone]) -> Result<(), GeofenceError> {
    let mut seen = FxHashSet::default();

    for zone in zones {
        if zone.id.trim().is_empty() {
            return Err(GeofenceError::InvalidZoneDefinition("zone id is empty".to_string()));
        }
        if !seen.insert(zone.id.as_str()) {
            return Err(GeofenceError::InvalidZoneDefinition(format!(
                "duplicate zone id '{}'",
                zone.id
            )));
        }
        if !(zone.radius_m.is_finite() && zone.radius_m > 0.0) {
            return Err(GeofenceError::InvalidZoneDefinition(format!(
                "zone '{}' has non-positive radius {}",
                zone.id, zone.radius_m
            )));
        }
        if Coordinate::new(zone.center_lat, zone.center_lng).is_err() {
            return Err(GeofenceError::InvalidZoneDefinition(format!(
                "zone '{}' has out-of-range center ({}, {})",
                zone.id, zone.center_lat, zone.center_lng
            )));
        }
    }

    Ok(())
}
