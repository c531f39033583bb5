pub mod accuracy;
pub mod event;
pub mod geofence;

pub use accuracy::DesiredAccuracy;
pub use event::{DeviceLocation, GeofenceEvent, LocalNotification, Transition};
pub use geofence::{Coordinate, Geofence, GeofenceRecord};
