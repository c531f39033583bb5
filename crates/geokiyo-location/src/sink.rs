use geokiyo_proto::{GeofenceEvent, LocalNotification};
use tracing::info;

/// Receiver of geofence transition payloads.
pub trait EventSink {
    fn did_enter_geofence(&mut self, event: &GeofenceEvent);
    fn did_exit_geofence(&mut self, event: &GeofenceEvent);
}

/// Local alert presentation. Fire-and-forget.
pub trait Notifier {
    fn present(&mut self, notification: LocalNotification);
}

/// Presents alerts as log lines, for hosts without a notification center.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn present(&mut self, n: LocalNotification) {
        info!(id = %n.identifier, "notify: {} / {} {}", n.title, n.subtitle, n.body);
    }
}

/// Collects everything it receives. Handy for embedding and for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub entered: Vec<GeofenceEvent>,
    pub exited: Vec<GeofenceEvent>,
}

impl EventSink for RecordingSink {
    fn did_enter_geofence(&mut self, event: &GeofenceEvent) {
        self.entered.push(event.clone());
    }

    fn did_exit_geofence(&mut self, event: &GeofenceEvent) {
        self.exited.push(event.clone());
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub presented: Vec<LocalNotification>,
}

impl Notifier for RecordingNotifier {
    fn present(&mut self, notification: LocalNotification) {
        self.presented.push(notification);
    }
}
