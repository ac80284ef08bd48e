//! Geofence service - the operations exposed to the HTTP layer
//!
//! Validates input, drives the vehicle state store and records metrics.
//! All state is owned by the service instance, so independent instances can
//! coexist (one per test, for example).

use crate::domain::error::GeofenceError;
use crate::domain::types::{
    Coordinate, LocationUpdateOutcome, VehicleStatus, Zone, ZoneEvent, ZoneEventType,
};
use crate::infra::config::Config;
use crate::infra::metrics::{Metrics, StoreGauges};
use crate::services::containment::ContainmentResolver;
use crate::services::event_log::EventLog;
use crate::services::vehicle_store::VehicleStateStore;
use crate::services::zone_catalog::ZoneCatalog;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct GeofenceService {
    catalog: Arc<ZoneCatalog>,
    store: VehicleStateStore,
    event_log: Arc<EventLog>,
    metrics: Arc<Metrics>,
}

impl GeofenceService {
    pub fn new(catalog: ZoneCatalog, event_log: EventLog, metrics: Arc<Metrics>) -> Self {
        let catalog = Arc::new(catalog);
        let event_log = Arc::new(event_log);
        let store =
            VehicleStateStore::new(ContainmentResolver::new(catalog.clone()), event_log.clone());
        Self { catalog, store, event_log, metrics }
    }

    /// Build the service from configuration. Fails if the zone catalog is invalid.
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Result<Self, GeofenceError> {
        let catalog = ZoneCatalog::new(config.zones().to_vec())?;
        let event_log = EventLog::new(config.events_max_retained(), config.events_default_limit());
        Ok(Self::new(catalog, event_log, metrics))
    }

    /// Apply a GPS fix for a vehicle.
    ///
    /// Out-of-range coordinates are rejected before any state is touched.
    /// A missing timestamp defaults to the arrival time.
    pub fn apply_location_update(
        &self,
        vehicle_id: &str,
        latitude: f64,
        longitude: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<LocationUpdateOutcome, GeofenceError> {
        let start = Instant::now();

        let coordinate = match Coordinate::new(latitude, longitude) {
            Ok(c) => c,
            Err(e) => {
                self.metrics.record_rejected();
                warn!(
                    vehicle_id = %vehicle_id,
                    lat = %latitude,
                    lng = %longitude,
                    "location_update_rejected"
                );
                return Err(e);
            }
        };
        let timestamp = timestamp.unwrap_or_else(Utc::now);

        let (status, generated_events) = self.store.apply_update(vehicle_id, coordinate, timestamp);

        let enters =
            generated_events.iter().filter(|e| e.event_type == ZoneEventType::Enter).count();
        let exits = generated_events.len() - enters;
        self.metrics.record_update(start.elapsed().as_micros() as u64, enters as u64, exits as u64);

        Ok(LocationUpdateOutcome { status, generated_events })
    }

    /// Current state of a vehicle
    pub fn get_status(&self, vehicle_id: &str) -> Result<VehicleStatus, GeofenceError> {
        self.store.get(vehicle_id).ok_or_else(|| {
            self.metrics.record_unknown_vehicle();
            debug!(vehicle_id = %vehicle_id, "status_unknown_vehicle");
            GeofenceError::UnknownVehicle(vehicle_id.to_string())
        })
    }

    /// Recent events, newest first
    pub fn list_events(&self, vehicle_id: Option<&str>, limit: Option<usize>) -> Vec<ZoneEvent> {
        self.event_log.query(vehicle_id, limit)
    }

    /// Configured zones in definition order
    pub fn list_zones(&self) -> &[Zone] {
        self.catalog.lookup()
    }

    /// Store sizes for metrics reporting
    pub fn gauges(&self) -> StoreGauges {
        StoreGauges {
            tracked_vehicles: self.store.len(),
            retained_events: self.event_log.len(),
            evicted_events: self.event_log.evicted_total(),
            zones: self.catalog.len(),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_service() -> GeofenceService {
        let config = Config::default().with_zones(vec![
            Zone::new("downtown", 12.9716, 77.5946, 5000.0),
            Zone::new("airport", 12.9611, 77.6387, 3000.0),
        ]);
        GeofenceService::from_config(&config, Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_invalid_coordinate_has_no_side_effects() {
        let service = create_service();

        let err = service.apply_location_update("TX1", 100.0, 0.0, None).unwrap_err();
        assert!(matches!(err, GeofenceError::InvalidCoordinate { .. }));

        assert!(matches!(service.get_status("TX1"), Err(GeofenceError::UnknownVehicle(_))));
        assert!(service.list_events(None, None).is_empty());
        assert_eq!(service.metrics().rejected_total(), 1);
        assert_eq!(service.metrics().updates_total(), 0);
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let service = create_service();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let outcome = service.apply_location_update("TX1", 12.9716, 77.5946, Some(ts)).unwrap();

        assert_eq!(outcome.status.last_updated, ts);
        assert_eq!(outcome.generated_events[0].timestamp, ts);
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let service = create_service();
        let before = Utc::now();

        let outcome = service.apply_location_update("TX1", 0.0, 0.0, None).unwrap();

        assert!(outcome.status.last_updated >= before);
        assert!(outcome.status.last_updated <= Utc::now());
    }

    #[test]
    fn test_gauges_reflect_state() {
        let service = create_service();
        service.apply_location_update("A", 12.9716, 77.5946, None).unwrap();
        service.apply_location_update("B", 13.5, 78.0, None).unwrap();

        let gauges = service.gauges();
        assert_eq!(gauges.tracked_vehicles, 2);
        assert_eq!(gauges.retained_events, 1);
        assert_eq!(gauges.zones, 2);
    }

    #[test]
    fn test_from_config_rejects_bad_catalog() {
        let config = Config::default().with_zones(vec![Zone::new("bad", 0.0, 0.0, 0.0)]);
        let result = GeofenceService::from_config(&config, Arc::new(Metrics::new()));
        assert!(matches!(result, Err(GeofenceError::InvalidZoneDefinition(_))));
    }
}
