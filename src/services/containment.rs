//! Point-in-zone resolution with overlap policy
//!
//! A zone contains a point iff the haversine distance to its center is at most
//! its radius. When several zones contain the point, the smallest radius wins;
//! equal radii fall back to catalog definition order.

use crate::domain::geo::distance_to;
use crate::domain::types::{Coordinate, Zone};
use crate::services::zone_catalog::ZoneCatalog;
use std::sync::Arc;

/// Resolves a coordinate to the single current zone
#[derive(Debug, Clone)]
pub struct ContainmentResolver {
    catalog: Arc<ZoneCatalog>,
}

impl ContainmentResolver {
    pub fn new(catalog: Arc<ZoneCatalog>) -> Self {
        Self { catalog }
    }

    /// Current zone for a validated coordinate, or None if outside all zones
    pub fn resolve(&self, coordinate: &Coordinate) -> Option<&Zone> {
        self.catalog
            .lookup()
            .iter()
            .filter(|zone| contains(zone, coordinate))
            // min_by keeps the first of equal elements, so ties go to definition order
            .min_by(|a, b| a.radius_m.total_cmp(&b.radius_m))
    }
}

/// Inclusive containment test
#[inline]
pub fn contains(zone: &Zone, coordinate: &Coordinate) -> bool {
    distance_to(coordinate, zone.center_lat, zone.center_lng) <= zone.radius_m
}
