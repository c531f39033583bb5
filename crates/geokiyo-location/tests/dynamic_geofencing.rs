//! Drives the monitor end to end through the software location service.

use geokiyo_location::sink::{RecordingNotifier, RecordingSink};
use geokiyo_location::software::{PromptPolicy, SoftwareLocationService, UpdateMode};
use geokiyo_location::{AuthorizationStatus, GeofenceMonitor, LocationConfig, LocationFix};
use geokiyo_proto::{Coordinate, DesiredAccuracy, Geofence};
use time::macros::datetime;
use time::Duration;

type Monitor = GeofenceMonitor<SoftwareLocationService, RecordingSink, RecordingNotifier>;

fn fences() -> Vec<Geofence> {
    vec![
        Geofence {
            name: "station".into(),
            center: Coordinate::new(35.6812, 139.7671),
            radius_m: 150.0,
            notify_on_entry: true,
            notify_on_exit: true,
        },
        Geofence {
            name: "park".into(),
            center: Coordinate::new(35.7000, 139.7671),
            radius_m: 150.0,
            notify_on_entry: true,
            notify_on_exit: false,
        },
    ]
}

fn monitor(status: AuthorizationStatus) -> Monitor {
    let cfg = LocationConfig { use_high_accuracy: true, update_distance: 1000.0, ..Default::default() };
    let svc = SoftwareLocationService::new(status, PromptPolicy::default());
    GeofenceMonitor::new(cfg, fences(), svc, RecordingSink::default(), RecordingNotifier::default())
}

/// Walks north from south of the station to the park in ~55 m steps.
fn walk() -> Vec<LocationFix> {
    let t0 = datetime!(2021-06-30 09:00:00 UTC);
    (0..50)
        .map(|i| LocationFix {
            coordinate: Coordinate::new(35.6790 + i as f64 * 0.0005, 139.7671),
            timestamp: t0 + Duration::seconds(40 * i as i64),
            speed: 1.4,
        })
        .collect()
}

fn feed(m: &mut Monitor, fixes: &[LocationFix]) {
    for f in fixes {
        m.source_mut().ingest(f.clone());
        m.pump();
    }
}

#[test]
fn prompt_grant_resumes_updates_and_events_follow_the_walk() {
    let mut m = monitor(AuthorizationStatus::NotDetermined);
    m.start_location_updates();
    assert_eq!(m.source().mode(), UpdateMode::Stopped);

    m.request_authorization();
    m.pump();
    assert_eq!(m.source().mode(), UpdateMode::Continuous);
    assert!(m.source().allows_background_updates());
    assert_eq!(m.source().distance_filter(), 1000.0);
    assert_eq!(m.source().desired_accuracy(), DesiredAccuracy::Reduced);

    feed(&mut m, &walk());

    let entered: Vec<&str> = m.sink().entered.iter().map(|e| e.geofence_name.as_str()).collect();
    let exited: Vec<&str> = m.sink().exited.iter().map(|e| e.geofence_name.as_str()).collect();
    assert!(entered.contains(&"station"));
    assert!(entered.contains(&"park"));
    assert!(exited.contains(&"station"));
    assert!(!exited.contains(&"park"));

    for ev in m.sink().entered.iter().chain(m.sink().exited.iter()) {
        let dev = ev.device.as_ref().expect("fix was received before any transition");
        assert_eq!(dev.location_accuracy, "high");
    }
    assert_eq!(m.notifier().presented.len(), entered.len() + exited.len());
}

#[test]
fn distance_filter_limits_deliveries_but_invariant_holds() {
    let mut m = monitor(AuthorizationStatus::AuthorizedAlways);
    m.start_location_updates();
    feed(&mut m, &walk());

    let here = m.last_location().expect("authorized").coordinate;
    let mut watched = m.monitored_geofences().unwrap();
    watched.sort();
    let mut expected: Vec<String> = m
        .geofences()
        .iter()
        .filter(|g| here.distance_m(&g.center) < m.config().update_distance)
        .map(|g| g.name.clone())
        .collect();
    expected.sort();
    assert_eq!(watched, expected);
}

#[test]
fn revoking_permission_stops_updates() {
    let mut m = monitor(AuthorizationStatus::AuthorizedWhenInUse);
    m.start_location_updates();
    let track = walk();
    feed(&mut m, &track[..5]);

    m.source_mut().set_authorization(AuthorizationStatus::Denied);
    m.pump();
    m.source_mut().ingest(track[30].clone());
    m.pump();

    assert_eq!(m.source().mode(), UpdateMode::Stopped);
    assert!(m.last_location().is_none());
    assert!(m.monitored_geofences().is_none());
}

#[test]
fn disable_returns_to_unconfigured() {
    let mut m = monitor(AuthorizationStatus::AuthorizedAlways);
    m.start_location_updates();
    feed(&mut m, &walk()[..10]);
    assert!(!m.monitored_geofences().unwrap().is_empty());

    m.disable();
    assert_eq!(m.source().mode(), UpdateMode::Stopped);
    assert!(m.geofences().is_empty());
    assert!(m.monitored_geofences().unwrap().is_empty());
}
