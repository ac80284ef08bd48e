//! Shared types for the geofence gateway

use crate::domain::error::GeofenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Valid latitude range in degrees
pub const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees
pub const LNG_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A validated WGS84 position in degrees.
///
/// Construction goes through [`Coordinate::new`], so any `Coordinate` held by
/// the core is known to be in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validate and build a coordinate.
    ///
    /// NaN and infinities fail the range check as well.
    ///
    /// # Example
    ///
    /// ```
    /// use geofence_gateway::domain::types::Coordinate;
    ///
    /// assert!(Coordinate::new(12.9716, 77.5946).is_ok());
    /// assert!(Coordinate::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeofenceError> {
        if LAT_RANGE.contains(&latitude) && LNG_RANGE.contains(&longitude) {
            Ok(Self { latitude, longitude })
        } else {
            Err(GeofenceError::InvalidCoordinate { latitude, longitude })
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Circular geofence zone as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub center_lat: f64,
    pub center_lng: f64,
    /// Radius in meters
    pub radius_m: f64,
}

impl Zone {
    pub fn new(id: &str, center_lat: f64, center_lng: f64, radius_m: f64) -> Self {
        Self { id: id.to_string(), center_lat, center_lng, radius_m }
    }
}

/// Zone transition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneEventType {
    Enter,
    Exit,
}

/// An emitted enter/exit event. Immutable once appended to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEvent {
    pub event_type: ZoneEventType,
    pub vehicle_id: String,
    pub zone_id: String,
    pub timestamp: DateTime<Utc>,
    pub from_zone: Option<String>,
    pub to_zone: Option<String>,
}

/// Events produced by a single update (never more than two)
pub type TransitionEvents = SmallVec<[ZoneEvent; 2]>;

/// Last known position and zone membership of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    pub vehicle_id: String,
    pub current_zone: Option<String>,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub last_updated: DateTime<Utc>,
}

impl VehicleStatus {
    pub fn new(
        vehicle_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
        current_zone: Option<String>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            current_zone,
            last_latitude: coordinate.latitude(),
            last_longitude: coordinate.longitude(),
            last_updated: timestamp,
        }
    }
}

/// Result of applying one location update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateOutcome {
    pub status: VehicleStatus,
    pub generated_events: TransitionEvents,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coordinate_bounds_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(90.000001, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
    }

    #[test]
    fn test_coordinate_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_event_serializes_nulls() {
        let event = ZoneEvent {
            event_type: ZoneEventType::Enter,
            vehicle_id: "TX123".to_string(),
            zone_id: "downtown".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            from_zone: None,
            to_zone: Some("downtown".to_string()),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "enter");
        assert_eq!(json["vehicleId"], "TX123");
        assert_eq!(json["zoneId"], "downtown");
        assert!(json["fromZone"].is_null());
        assert!(json.as_object().unwrap().contains_key("fromZone"));
        assert_eq!(json["toZone"], "downtown");
        assert_eq!(json["timestamp"], "2024-01-01T12:00:00Z");
    }

    #[test]
    fn test_status_serializes_current_zone_null() {
        let coord = Coordinate::new(13.5, 78.0).unwrap();
        let status = VehicleStatus::new("TX123", coord, Utc::now(), None);

        let json = serde_json::to_value(&status).unwrap();
        assert!(json.as_object().unwrap().contains_key("currentZone"));
        assert!(json["currentZone"].is_null());
        assert_eq!(json["lastLatitude"], 13.5);
        assert_eq!(json["lastLongitude"], 78.0);
    }

    #[test]
    fn test_zone_wire_shape() {
        let zone = Zone::new("airport", 12.9611, 77.6387, 3000.0);
        let json = serde_json::to_value(&zone).unwrap();
        assert_eq!(json["id"], "airport");
        assert_eq!(json["center_lat"], 12.9611);
        assert_eq!(json["center_lng"], 77.6387);
        assert_eq!(json["radius_m"], 3000.0);
    }
}
