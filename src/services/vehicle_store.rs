//! Per-vehicle zone state with serialized read-modify-write
//!
//! Each vehicle id owns a slot guarded by its own mutex. An update holds that
//! lock while it resolves the zone, detects transitions, overwrites the state
//! and appends to the event log, so updates for one vehicle never interleave.
//! Updates for different vehicles only share the brief map lookup and the
//! event log append.
//!
//! Per-vehicle order is lock-acquisition order. `parking_lot::Mutex` is only
//! eventually fair, so two updates racing for the same slot are not promised
//! FIFO by send time; each one still lands whole.

use crate::domain::types::{Coordinate, TransitionEvents, VehicleStatus, ZoneEventType};
use crate::services::containment::ContainmentResolver;
use crate::services::event_log::EventLog;
use crate::services::transition::TransitionDetector;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Slot holding one vehicle's state. `None` until its first update lands.
type VehicleSlot = Arc<Mutex<Option<VehicleStatus>>>;

pub struct VehicleStateStore {
    resolver: ContainmentResolver,
    event_log: Arc<EventLog>,
    vehicles: RwLock<FxHashMap<String, VehicleSlot>>,
}

impl VehicleStateStore {
    pub fn new(resolver: ContainmentResolver, event_log: Arc<EventLog>) -> Self {
        Self { resolver, event_log, vehicles: RwLock::new(FxHashMap::default()) }
    }

    /// Apply one location update atomically for `vehicle_id`.
    ///
    /// Returns the post-update state and the events produced by this call
    /// only. The stored position is overwritten even when the zone is
    /// unchanged.
    pub fn apply_update(
        &self,
        vehicle_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> (VehicleStatus, TransitionEvents) {
        let slot = self.slot(vehicle_id);
        let mut state = slot.lock();

        let new_zone = self.resolver.resolve(&coordinate).map(|zone| zone.id.as_str());
        let previous_zone = state.as_ref().and_then(|s| s.current_zone.as_deref());

        let events = TransitionDetector::detect(previous_zone, new_zone, vehicle_id, timestamp);
        log_transition(vehicle_id, previous_zone, new_zone, &events);

        let status =
            VehicleStatus::new(vehicle_id, coordinate, timestamp, new_zone.map(str::to_string));
        *state = Some(status.clone());

        // Still under the vehicle lock: event log order matches update order
        if !events.is_empty() {
            self.event_log.append(events.iter().cloned());
        }

        debug!(
            vehicle_id = %vehicle_id,
            lat = %coordinate.latitude(),
            lng = %coordinate.longitude(),
            zone = ?status.current_zone,
            events = %events.len(),
            "location_applied"
        );

        (status, events)
    }

    /// Snapshot of a vehicle's state, None if it has never been updated
    pub fn get(&self, vehicle_id: &str) -> Option<VehicleStatus> {
        let slot = self.vehicles.read().get(vehicle_id).cloned()?;
        let state = slot.lock();
        state.clone()
    }

    /// Number of vehicles seen so far
    pub fn len(&self) -> usize {
        self.vehicles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.read().is_empty()
    }

    /// Fetch or create the slot for a vehicle. The map lock is released before
    /// the caller locks the slot.
    fn slot(&self, vehicle_id: &str) -> VehicleSlot {
        if let Some(slot) = self.vehicles.read().get(vehicle_id) {
            return slot.clone();
        }

        let mut vehicles = self.vehicles.write();
        vehicles.entry(vehicle_id.to_string()).or_default().clone()
    }
}

fn log_transition(
    vehicle_id: &str,
    previous: Option<&str>,
    new: Option<&str>,
    events: &TransitionEvents,
) {
    match events.as_slice() {
        [] => {}
        [single] if single.event_type == ZoneEventType::Enter => {
            info!(vehicle_id = %vehicle_id, zone = %single.zone_id, "vehicle_zone_entered");
        }
        [single] => {
            info!(vehicle_id = %vehicle_id, zone = %single.zone_id, "vehicle_zone_exited");
        }
        _ => {
            info!(
                vehicle_id = %vehicle_id,
                from_zone = ?previous,
                to_zone = ?new,
                "vehicle_zone_changed"
            );
        }
    }
}
