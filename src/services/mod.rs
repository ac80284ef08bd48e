//! Services - zone membership detection and state management
//!
//! - `zone_catalog` - Validated, ordered zone definitions
//! - `containment` - Point-in-zone resolution and overlap policy
//! - `transition` - Enter/exit event generation
//! - `vehicle_store` - Per-vehicle state with serialized updates
//! - `event_log` - Bounded, newest-first event history
//! - `geofence` - Service facade used by the HTTP layer

pub mod containment;
pub mod event_log;
pub mod geofence;
pub mod transition;
pub mod vehicle_store;
pub mod zone_catalog;

// Re-export commonly used types
pub use containment::ContainmentResolver;
pub use event_log::EventLog;
pub use geofence::GeofenceService;
pub use transition::TransitionDetector;
pub use vehicle_store::VehicleStateStore;
pub use zone_catalog::ZoneCatalog;
