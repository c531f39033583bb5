//! Dynamic geofencing.
//!
//! Location sources can only watch a handful of regions at once, so the
//! monitor keeps the watched set down to the geofences whose center lies
//! within `update_distance` of the last fix, re-evaluated on every update.

use geokiyo_proto::{DeviceLocation, Geofence, GeofenceEvent, LocalNotification, Transition};
use tracing::{debug, error, info};

use crate::config::LocationConfig;
use crate::sink::{EventSink, Notifier};
use crate::source::{
    AccuracyAuthorization, AccuracyError, AuthorizationStatus, LocationError, LocationEvent, LocationFix, LocationSource,
    RegionState,
};

pub struct GeofenceMonitor<L, S, N> {
    config: LocationConfig,
    source: L,
    sink: S,
    notifier: N,
    geofences: Vec<Geofence>,
    last_location: Option<LocationFix>,
}

impl<L, S, N> GeofenceMonitor<L, S, N>
where
    L: LocationSource,
    S: EventSink,
    N: Notifier,
{
    pub fn new(config: LocationConfig, geofences: Vec<Geofence>, mut source: L, sink: S, notifier: N) -> Self {
        source.set_distance_filter(config.update_distance);
        source.set_desired_accuracy(config.desired_accuracy);

        let mut monitor = Self {
            config,
            source,
            sink,
            notifier,
            geofences,
            last_location: None,
        };
        monitor.clear_monitored_geofences();
        monitor
    }

    pub fn config(&self) -> &LocationConfig {
        &self.config
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut L {
        &mut self.source
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn geofences(&self) -> &[Geofence] {
        &self.geofences
    }

    pub fn geofences_url(&self) -> String {
        self.config.geofences_url()
    }

    /// "high" or "low", reported with every event.
    pub fn location_accuracy(&self) -> &'static str {
        self.config.accuracy_label()
    }

    pub fn is_authorized(&self) -> bool {
        self.source.authorization_status().is_authorized()
    }

    pub fn is_full_accuracy(&self) -> bool {
        self.source.accuracy_authorization() == AccuracyAuthorization::FullAccuracy
    }

    /// The cached fix, hidden while location access is not granted.
    pub fn last_location(&self) -> Option<&LocationFix> {
        if !self.is_authorized() {
            return None;
        }
        self.last_location.as_ref()
    }

    pub fn monitored_geofences(&self) -> Option<Vec<String>> {
        if !self.is_authorized() {
            return None;
        }
        Some(self.source.monitored_regions().into_iter().map(|g| g.name).collect())
    }

    pub fn created_geofences(&self) -> Option<Vec<String>> {
        if !self.is_authorized() {
            return None;
        }
        Some(self.geofences.iter().map(|g| g.name.clone()).collect())
    }

    pub fn request_authorization(&mut self) {
        let status = self.source.authorization_status();
        if status != AuthorizationStatus::AuthorizedAlways {
            self.source.request_always_authorization();
        }
        if status != AuthorizationStatus::AuthorizedWhenInUse {
            self.source.request_when_in_use_authorization();
        }
    }

    pub fn request_temporary_full_accuracy(&mut self, purpose_key: &str) {
        if !self.is_authorized() {
            return;
        }
        match self.source.request_temporary_full_accuracy(purpose_key) {
            Ok(()) => {}
            Err(AccuracyError::Denied) => error!("location: temporary full accuracy denied"),
            Err(e) => error!("location: error requesting temporary full accuracy: {}", e),
        }
    }

    pub fn start_location_updates(&mut self) {
        if !self.is_authorized() {
            info!("location: updates service not enabled");
            return;
        }
        if self.config.use_high_accuracy || !self.source.significant_change_available() {
            self.source.start_updating_location();
            info!("location: starting updates with frequent monitoring");
        } else {
            self.source.start_monitoring_significant_changes();
            info!("location: starting updates with significant location changes only");
        }
        self.source.set_allows_background_updates(true);
    }

    pub fn stop_location_updates(&mut self) {
        if !self.is_authorized() {
            return;
        }
        self.source.stop_updating_location();
        info!("location: updates stopped");
    }

    /// Drains the source's queued callbacks.
    pub fn pump(&mut self) {
        while let Some(ev) = self.source.poll_event() {
            self.handle(ev);
        }
    }

    pub fn handle(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::LocationsUpdated(fixes) => self.did_update_locations(fixes),
            LocationEvent::Failed(e) => self.did_fail(e),
            LocationEvent::RegionStateDetermined { state, region } => self.did_determine_state(state, &region),
            LocationEvent::AuthorizationChanged => self.did_change_authorization(),
        }
    }

    pub fn did_update_locations(&mut self, fixes: Vec<LocationFix>) {
        if let Some(fix) = fixes.into_iter().last() {
            if self.is_authorized() {
                self.last_location = Some(fix);
            }
        }
        debug!("location: updated {:?}", self.last_location().map(|f| f.coordinate));

        let update_distance = self.config.update_distance;
        let here = self.last_location().map(|f| f.coordinate);
        let (near, far): (Vec<Geofence>, Vec<Geofence>) = self
            .geofences
            .iter()
            .cloned()
            .partition(|g| here.map_or(false, |p| p.distance_m(&g.center) < update_distance));

        for g in &far {
            self.stop_monitoring(g);
        }
        for g in &near {
            self.start_monitoring(g);
        }
    }

    pub fn did_fail(&mut self, err: LocationError) {
        if err == LocationError::Denied {
            error!("location: authorization denied");
            self.source.stop_updating_location();
        } else {
            error!("location: an error has occurred: {}", err);
        }
    }

    pub fn did_determine_state(&mut self, state: RegionState, region: &Geofence) {
        match state {
            RegionState::Inside if region.notify_on_entry => {
                self.send_geofence_tracking_event(region, Transition::Entered)
            }
            RegionState::Outside if region.notify_on_exit => {
                self.send_geofence_tracking_event(region, Transition::Exited)
            }
            _ => {}
        }
    }

    pub fn did_change_authorization(&mut self) {
        self.start_location_updates();
    }

    pub fn send_geofence_tracking_event(&mut self, region: &Geofence, transition: Transition) {
        let mut event = GeofenceEvent::new(region.name.clone(), transition);
        if let Some(fix) = self.last_location() {
            event.device = Some(DeviceLocation {
                latitude: fix.coordinate.lat,
                longitude: fix.coordinate.lon,
                timestamp: fix.timestamp,
                speed: fix.speed,
                location_accuracy: self.location_accuracy().to_string(),
                location_accuracy_extended: self.config.desired_accuracy,
            });
        }

        info!(geofence = %region.name, "location: {}", transition.label());
        self.notifier.present(LocalNotification::for_transition(transition));
        match transition {
            Transition::Entered => self.sink.did_enter_geofence(&event),
            Transition::Exited => self.sink.did_exit_geofence(&event),
        }
    }

    fn is_monitoring(&self, geofence: &Geofence) -> bool {
        self.source.monitored_regions().iter().any(|g| g.name == geofence.name)
    }

    pub fn start_monitoring(&mut self, geofence: &Geofence) {
        if !self.is_monitoring(geofence) {
            self.source.start_monitoring(geofence);
            info!("location: {} added to monitored client", geofence.name);
        }
    }

    pub fn stop_monitoring(&mut self, geofence: &Geofence) {
        if self.is_monitoring(geofence) {
            self.source.stop_monitoring(geofence);
            info!("location: {} removed from monitored client", geofence.name);
        }
    }

    pub fn start_monitoring_all(&mut self, geofences: &[Geofence]) {
        if geofences.is_empty() {
            return;
        }
        for g in geofences {
            self.start_monitoring(g);
        }
    }

    pub fn stop_monitoring_all(&mut self, geofences: &[Geofence]) {
        if geofences.is_empty() {
            return;
        }
        for g in geofences {
            self.stop_monitoring(g);
        }
    }

    pub fn clear_monitored_geofences(&mut self) {
        for g in self.source.monitored_regions() {
            self.source.stop_monitoring(&g);
        }
    }

    /// Full teardown; the monitor needs new geofences before it is useful again.
    pub fn disable(&mut self) {
        self.stop_location_updates();
        self.clear_monitored_geofences();
        self.geofences.clear();
    }
}
