//! End-to-end scenarios against the geofence service

use chrono::{Duration, TimeZone, Utc};
use geofence_gateway::domain::types::{Zone, ZoneEventType};
use geofence_gateway::domain::GeofenceError;
use geofence_gateway::infra::{Config, Metrics};
use geofence_gateway::services::GeofenceService;
use std::sync::{Arc, Barrier};

fn create_service(zones: Vec<Zone>) -> GeofenceService {
    let config = Config::default().with_zones(zones);
    GeofenceService::from_config(&config, Arc::new(Metrics::new())).unwrap()
}

fn city_zones() -> Vec<Zone> {
    vec![
        Zone::new("downtown", 12.9716, 77.5946, 5000.0),
        Zone::new("airport", 12.9611, 77.6387, 3000.0),
    ]
}

#[test]
fn test_enter_then_exit_example() {
    let service = create_service(city_zones());

    let first = service.apply_location_update("TX123", 12.9716, 77.5946, None).unwrap();
    assert_eq!(first.status.current_zone.as_deref(), Some("downtown"));
    assert_eq!(first.generated_events.len(), 1);
    let enter = &first.generated_events[0];
    assert_eq!(enter.event_type, ZoneEventType::Enter);
    assert_eq!(enter.zone_id, "downtown");
    assert_eq!(enter.from_zone, None);
    assert_eq!(enter.to_zone.as_deref(), Some("downtown"));

    let second = service.apply_location_update("TX123", 13.5, 78.0, None).unwrap();
    assert!(second.status.current_zone.is_none());
    assert_eq!(second.generated_events.len(), 1);
    let exit = &second.generated_events[0];
    assert_eq!(exit.event_type, ZoneEventType::Exit);
    assert_eq!(exit.from_zone.as_deref(), Some("downtown"));
    assert_eq!(exit.to_zone, None);

    // Same empty-area coordinate again: nothing new
    let third = service.apply_location_update("TX123", 13.5, 78.0, None).unwrap();
    assert!(third.generated_events.is_empty());
    assert_eq!(service.list_events(None, None).len(), 2);
}

#[test]
fn test_move_between_disjoint_zones() {
    let service = create_service(vec![
        Zone::new("north", 10.0, 10.0, 1000.0),
        Zone::new("south", 9.0, 10.0, 1000.0),
    ]);

    service.apply_location_update("V1", 10.0, 10.0, None).unwrap();
    let outcome = service.apply_location_update("V1", 9.0, 10.0, None).unwrap();

    let events = &outcome.generated_events;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, ZoneEventType::Exit);
    assert_eq!(events[0].zone_id, "north");
    assert_eq!(events[0].from_zone.as_deref(), Some("north"));
    assert_eq!(events[0].to_zone.as_deref(), Some("south"));
    assert_eq!(events[1].event_type, ZoneEventType::Enter);
    assert_eq!(events[1].zone_id, "south");
    assert_eq!(events[1].from_zone.as_deref(), Some("north"));
    assert_eq!(events[1].to_zone.as_deref(), Some("south"));
}

#[test]
fn test_overlap_prefers_smaller_zone() {
    let service = create_service(city_zones());

    // Airport center sits inside downtown's radius too
    let outcome = service.apply_location_update("V1", 12.9611, 77.6387, None).unwrap();
    assert_eq!(outcome.status.current_zone.as_deref(), Some("airport"));

    // Moving to downtown center leaves airport, enters downtown
    let outcome = service.apply_location_update("V1", 12.9716, 77.5946, None).unwrap();
    assert_eq!(outcome.generated_events.len(), 2);
    assert_eq!(outcome.generated_events[0].zone_id, "airport");
    assert_eq!(outcome.generated_events[1].zone_id, "downtown");
}

#[test]
fn test_status_tracks_latest_update() {
    let service = create_service(city_zones());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    assert!(matches!(service.get_status("TX1"), Err(GeofenceError::UnknownVehicle(id)) if id == "TX1"));

    service.apply_location_update("TX1", 12.9716, 77.5946, Some(t0)).unwrap();
    service
        .apply_location_update("TX1", 12.9700, 77.5900, Some(t0 + Duration::seconds(30)))
        .unwrap();

    let status = service.get_status("TX1").unwrap();
    assert_eq!(status.vehicle_id, "TX1");
    assert_eq!(status.current_zone.as_deref(), Some("downtown"));
    assert_eq!(status.last_latitude, 12.9700);
    assert_eq!(status.last_longitude, 77.5900);
    assert_eq!(status.last_updated, t0 + Duration::seconds(30));
}

#[test]
fn test_list_events_newest_first_with_limit() {
    let service = create_service(city_zones());

    for i in 0..5 {
        let vehicle = format!("V{i}");
        service.apply_location_update(&vehicle, 12.9716, 77.5946, None).unwrap();
    }

    let all = service.list_events(None, None);
    let ids: Vec<&str> = all.iter().map(|e| e.vehicle_id.as_str()).collect();
    assert_eq!(ids, vec!["V4", "V3", "V2", "V1", "V0"]);

    let limited = service.list_events(None, Some(2));
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].vehicle_id, "V4");

    let filtered = service.list_events(Some("V2"), None);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].vehicle_id, "V2");
}

#[test]
fn test_zone_membership_matches_event_history() {
    let service = create_service(city_zones());
    let path = [
        (13.5, 78.0),
        (12.9716, 77.5946),
        (12.9611, 77.6387),
        (12.9611, 77.6387),
        (13.5, 78.0),
        (12.9716, 77.5946),
    ];

    for (lat, lng) in path {
        service.apply_location_update("V1", lat, lng, None).unwrap();

        let status = service.get_status("V1").unwrap();
        let latest = service.list_events(Some("V1"), Some(1));
        match latest.first() {
            Some(e) if e.event_type == ZoneEventType::Enter => {
                assert_eq!(status.current_zone, e.to_zone);
            }
            _ => assert!(status.current_zone.is_none()),
        }
    }
}

#[test]
fn test_concurrent_updates_same_vehicle_are_serialized() {
    let service = create_service(city_zones());
    let threads = 8;
    let barrier = Barrier::new(threads);

    std::thread::scope(|s| {
        for t in 0..threads {
            let service = &service;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for i in 0..250 {
                    let (lat, lng) = match (i + t) % 3 {
                        0 => (12.9716, 77.5946),
                        1 => (12.9611, 77.6387),
                        _ => (13.5, 78.0),
                    };
                    service.apply_location_update("TX1", lat, lng, None).unwrap();
                }
            });
        }
    });

    let mut history = service.list_events(Some("TX1"), Some(usize::MAX));
    history.reverse();

    // Replaying the log must reproduce a consistent membership sequence
    let mut current: Option<String> = None;
    for event in &history {
        match event.event_type {
            ZoneEventType::Enter => {
                assert!(current.is_none(), "enter while already in {current:?}");
                current = Some(event.zone_id.clone());
            }
            ZoneEventType::Exit => {
                assert_eq!(current.as_deref(), Some(event.zone_id.as_str()));
                current = None;
            }
        }
    }

    let status = service.get_status("TX1").unwrap();
    assert_eq!(status.current_zone, current);
}

#[test]
fn test_concurrent_distinct_vehicles() {
    let service = create_service(city_zones());

    std::thread::scope(|s| {
        for t in 0..4 {
            let service = &service;
            s.spawn(move || {
                let vehicle = format!("V{t}");
                for _ in 0..100 {
                    service.apply_location_update(&vehicle, 12.9716, 77.5946, None).unwrap();
                    service.apply_location_update(&vehicle, 13.5, 78.0, None).unwrap();
                }
            });
        }
    });

    for t in 0..4 {
        let events = service.list_events(Some(&format!("V{t}")), Some(usize::MAX));
        assert_eq!(events.len(), 200);
        assert!(service.get_status(&format!("V{t}")).unwrap().current_zone.is_none());
    }
    assert_eq!(service.gauges().tracked_vehicles, 4);
}

#[test]
fn test_bounded_event_log() {
    let config = Config::default().with_zones(city_zones()).with_events(4, 100);
    let service = GeofenceService::from_config(&config, Arc::new(Metrics::new())).unwrap();

    for _ in 0..5 {
        service.apply_location_update("V1", 12.9716, 77.5946, None).unwrap();
        service.apply_location_update("V1", 13.5, 78.0, None).unwrap();
    }

    let events = service.list_events(None, None);
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].event_type, ZoneEventType::Exit);
    assert_eq!(service.gauges().evicted_events, 6);
}
