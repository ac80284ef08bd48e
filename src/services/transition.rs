//! Zone transition detection
//!
//! Turns a (previous zone, new zone) pair into the ordered enter/exit events
//! for one update. A zone change always emits the exit before the enter.

use crate::domain::types::{TransitionEvents, ZoneEvent, ZoneEventType};
use chrono::{DateTime, Utc};
use smallvec::smallvec;

/// Pure transition detector
pub struct TransitionDetector;

impl TransitionDetector {
    /// Events implied by moving from `previous` to `new`.
    ///
    /// All events share the vehicle id and timestamp of the update.
    pub fn detect(
        previous: Option<&str>,
        new: Option<&str>,
        vehicle_id: &str,
        timestamp: DateTime<Utc>,
    ) -> TransitionEvents {
        match (previous, new) {
            (None, None) => TransitionEvents::new(),
            (Some(prev), Some(next)) if prev == next => TransitionEvents::new(),
            (None, Some(next)) => {
                smallvec![enter_event(vehicle_id, next, None, timestamp)]
            }
            (Some(prev), None) => {
                smallvec![exit_event(vehicle_id, prev, None, timestamp)]
            }
            (Some(prev), Some(next)) => smallvec![
                exit_event(vehicle_id, prev, Some(next), timestamp),
                enter_event(vehicle_id, next, Some(prev), timestamp),
            ],
        }
    }
}

fn enter_event(
    vehicle_id: &str,
    zone_id: &str,
    from_zone: Option<&str>,
    timestamp: DateTime<Utc>,
) -> ZoneEvent {
    ZoneEvent {
        event_type: ZoneEventType::Enter,
        vehicle_id: vehicle_id.to_string(),
        zone_id: zone_id.to_string(),
        timestamp,
        from_zone: from_zone.map(str::to_string),
        to_zone: Some(zone_id.to_string()),
    }
}

fn exit_event(
    vehicle_id: &str,
    zone_id: &str,
    to_zone: Option<&str>,
    timestamp: DateTime<Utc>,
) -> ZoneEvent {
    ZoneEvent {
        event_type: ZoneEventType::Exit,
        vehicle_id: vehicle_id.to_string(),
        zone_id: zone_id.to_string(),
        timestamp,
        from_zone: Some(zone_id.to_string()),
        to_zone: to_zone.map(str::to_string),
    }
}
