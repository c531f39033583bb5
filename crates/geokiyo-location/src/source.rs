//! The location-services contract the monitor is driven by.
//!
//! A platform adapter implements [`LocationSource`]; everything it would
//! normally report through delegate callbacks is queued as a
//! [`LocationEvent`] and handed to the monitor by `GeofenceMonitor::pump`.

use geokiyo_proto::{Coordinate, DesiredAccuracy, Geofence};
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(self, AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyAuthorization {
    FullAccuracy,
    ReducedAccuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Unknown,
    Inside,
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub timestamp: OffsetDateTime,
    /// Meters per second; negative when unknown.
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location access denied")]
    Denied,
    #[error("location unknown")]
    LocationUnknown,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccuracyError {
    #[error("temporary full accuracy denied")]
    Denied,
    #[error("temporary full accuracy request failed: {0}")]
    Other(String),
}

/// Callbacks a location source delivers, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    LocationsUpdated(Vec<LocationFix>),
    Failed(LocationError),
    RegionStateDetermined { state: RegionState, region: Geofence },
    AuthorizationChanged,
}

pub trait LocationSource {
    fn authorization_status(&self) -> AuthorizationStatus;
    fn accuracy_authorization(&self) -> AccuracyAuthorization;
    fn significant_change_available(&self) -> bool;
    fn monitored_regions(&self) -> Vec<Geofence>;

    fn set_distance_filter(&mut self, meters: f64);
    fn set_desired_accuracy(&mut self, accuracy: DesiredAccuracy);
    fn set_allows_background_updates(&mut self, allow: bool);

    fn request_always_authorization(&mut self);
    fn request_when_in_use_authorization(&mut self);
    fn request_temporary_full_accuracy(&mut self, purpose_key: &str) -> Result<(), AccuracyError>;

    fn start_updating_location(&mut self);
    fn stop_updating_location(&mut self);
    fn start_monitoring_significant_changes(&mut self);

    fn start_monitoring(&mut self, region: &Geofence);
    fn stop_monitoring(&mut self, region: &Geofence);

    /// Next queued callback, if any.
    fn poll_event(&mut self) -> Option<LocationEvent> {
        None
    }
}
