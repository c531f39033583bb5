//! Location services emulated in software.
//!
//! Fixes come in through [`SoftwareLocationService::ingest`] (from an NMEA
//! reader, a replayed track, a test) and leave as queued [`LocationEvent`]s,
//! the same way a platform client would report them.

use geokiyo_proto::{Coordinate, DesiredAccuracy, Geofence};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use crate::source::{
    AccuracyAuthorization, AccuracyError, AuthorizationStatus, LocationError, LocationEvent, LocationFix, LocationSource,
    RegionState,
};

/// Movement needed before significant-change mode reports a new fix.
pub const SIGNIFICANT_CHANGE_M: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Stopped,
    Continuous,
    SignificantChange,
}

/// How the emulated user answers permission prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptPolicy {
    /// Status a prompt resolves to while still undetermined.
    pub grant: AuthorizationStatus,
    pub allow_temporary_full_accuracy: bool,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self { grant: AuthorizationStatus::AuthorizedAlways, allow_temporary_full_accuracy: true }
    }
}

#[derive(Debug)]
pub struct SoftwareLocationService {
    status: AuthorizationStatus,
    accuracy: AccuracyAuthorization,
    policy: PromptPolicy,
    significant_change_available: bool,

    mode: UpdateMode,
    background: bool,
    distance_filter: f64,
    desired_accuracy: DesiredAccuracy,

    last_delivered: Option<Coordinate>,
    monitored: Vec<Geofence>,
    region_states: HashMap<String, RegionState>,
    queue: VecDeque<LocationEvent>,
}

impl SoftwareLocationService {
    pub fn new(status: AuthorizationStatus, policy: PromptPolicy) -> Self {
        Self {
            status,
            accuracy: AccuracyAuthorization::ReducedAccuracy,
            policy,
            significant_change_available: true,
            mode: UpdateMode::Stopped,
            background: false,
            distance_filter: 0.0,
            desired_accuracy: DesiredAccuracy::default(),
            last_delivered: None,
            monitored: Vec::new(),
            region_states: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn with_significant_change(mut self, available: bool) -> Self {
        self.significant_change_available = available;
        self
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn allows_background_updates(&self) -> bool {
        self.background
    }

    pub fn distance_filter(&self) -> f64 {
        self.distance_filter
    }

    pub fn desired_accuracy(&self) -> DesiredAccuracy {
        self.desired_accuracy
    }

    pub fn region_state(&self, name: &str) -> RegionState {
        self.region_states.get(name).copied().unwrap_or(RegionState::Unknown)
    }

    /// Changes the authorization as if the user flipped it in settings.
    pub fn set_authorization(&mut self, status: AuthorizationStatus) {
        if self.status != status {
            self.status = status;
            self.queue.push_back(LocationEvent::AuthorizationChanged);
        }
    }

    pub fn fail(&mut self, err: LocationError) {
        self.queue.push_back(LocationEvent::Failed(err));
    }

    /// Feeds a raw fix. Returns whether it was delivered as an update.
    ///
    /// Region monitoring sees every authorized fix; location updates only
    /// flow while an update mode runs and the fix clears the distance filter.
    pub fn ingest(&mut self, fix: LocationFix) -> bool {
        if !self.status.is_authorized() {
            if self.mode != UpdateMode::Stopped {
                self.queue.push_back(LocationEvent::Failed(LocationError::Denied));
            }
            return false;
        }

        let delivered = self.should_deliver(&fix.coordinate);
        let here = fix.coordinate;
        if delivered {
            self.last_delivered = Some(here);
            self.queue.push_back(LocationEvent::LocationsUpdated(vec![fix]));
        }
        self.determine_states(&here);
        delivered
    }

    fn should_deliver(&self, here: &Coordinate) -> bool {
        let min_move = match self.mode {
            UpdateMode::Stopped => return false,
            UpdateMode::SignificantChange => SIGNIFICANT_CHANGE_M,
            UpdateMode::Continuous => self.distance_filter,
        };
        match self.last_delivered {
            Some(prev) => {
                let moved = prev.distance_m(here);
                if moved < min_move {
                    debug!("software location: filtered fix ({:.1}m < {:.1}m)", moved, min_move);
                    return false;
                }
                true
            }
            None => true,
        }
    }

    fn determine_states(&mut self, here: &Coordinate) {
        for region in &self.monitored {
            let state = if region.contains(here) { RegionState::Inside } else { RegionState::Outside };
            let prev = self.region_states.insert(region.name.clone(), state);
            if prev != Some(state) {
                self.queue.push_back(LocationEvent::RegionStateDetermined { state, region: region.clone() });
            }
        }
    }

    fn answer_prompt(&mut self) {
        if self.status == AuthorizationStatus::NotDetermined {
            self.set_authorization(self.policy.grant);
        }
    }
}

impl LocationSource for SoftwareLocationService {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn accuracy_authorization(&self) -> AccuracyAuthorization {
        self.accuracy
    }

    fn significant_change_available(&self) -> bool {
        self.significant_change_available
    }

    fn monitored_regions(&self) -> Vec<Geofence> {
        self.monitored.clone()
    }

    fn set_distance_filter(&mut self, meters: f64) {
        self.distance_filter = meters;
    }

    fn set_desired_accuracy(&mut self, accuracy: DesiredAccuracy) {
        self.desired_accuracy = accuracy;
    }

    fn set_allows_background_updates(&mut self, allow: bool) {
        self.background = allow;
    }

    fn request_always_authorization(&mut self) {
        self.answer_prompt();
    }

    fn request_when_in_use_authorization(&mut self) {
        self.answer_prompt();
    }

    fn request_temporary_full_accuracy(&mut self, purpose_key: &str) -> Result<(), AccuracyError> {
        if purpose_key.is_empty() {
            return Err(AccuracyError::Other("empty purpose key".to_string()));
        }
        if !self.policy.allow_temporary_full_accuracy {
            return Err(AccuracyError::Denied);
        }
        self.accuracy = AccuracyAuthorization::FullAccuracy;
        Ok(())
    }

    fn start_updating_location(&mut self) {
        self.mode = UpdateMode::Continuous;
    }

    fn stop_updating_location(&mut self) {
        self.mode = UpdateMode::Stopped;
    }

    fn start_monitoring_significant_changes(&mut self) {
        self.mode = UpdateMode::SignificantChange;
    }

    fn start_monitoring(&mut self, region: &Geofence) {
        if self.monitored.iter().any(|g| g.name == region.name) {
            warn!("software location: {} already monitored", region.name);
            return;
        }
        self.monitored.push(region.clone());
    }

    fn stop_monitoring(&mut self, region: &Geofence) {
        self.monitored.retain(|g| g.name != region.name);
        self.region_states.remove(&region.name);
    }

    fn poll_event(&mut self) -> Option<LocationEvent> {
        self.queue.pop_front()
    }
}
