use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::accuracy::DesiredAccuracy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    #[serde(rename = "geofence_entered")]
    Entered,
    #[serde(rename = "geofence_exited")]
    Exited,
}

impl Transition {
    pub fn label(self) -> &'static str {
        match self {
            Transition::Entered => "geofence_entered",
            Transition::Exited => "geofence_exited",
        }
    }

    /// Title shown on the local alert for this transition.
    pub fn alert_title(self) -> &'static str {
        match self {
            Transition::Entered => "Entered",
            Transition::Exited => "Exited",
        }
    }
}

/// Where the device was when the transition fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "location_timestamp", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "movement_speed")]
    pub speed: f64,
    /// "high" or "low", from the configured update mode.
    pub location_accuracy: String,
    pub location_accuracy_extended: DesiredAccuracy,
}

/// Tracking payload handed to the event sink on enter/exit.
///
/// The device fields are flattened into the top level and left out entirely
/// when no fix has been received yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub geofence_name: String,
    pub geofence_transition: Transition,
    pub tealium_event: Transition,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceLocation>,
}

impl GeofenceEvent {
    pub fn new(geofence_name: impl Into<String>, transition: Transition) -> Self {
        Self {
            geofence_name: geofence_name.into(),
            geofence_transition: transition,
            tealium_event: transition,
            device: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalNotification {
    pub identifier: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

impl LocalNotification {
    pub const IDENTIFIER: &'static str = "localPush";
    pub const SUBTITLE: &'static str = "GeoKiyo Geofence";

    pub fn for_transition(transition: Transition) -> Self {
        Self {
            identifier: Self::IDENTIFIER.to_string(),
            title: transition.alert_title().to_string(),
            subtitle: Self::SUBTITLE.to_string(),
            body: String::new(),
        }
    }
}
