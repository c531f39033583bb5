pub mod config;
pub mod data;
pub mod doctor;
pub mod gnss;
pub mod monitor;
pub mod sink;
pub mod software;
pub mod source;

pub use config::{GeofenceSource, LocationConfig};
pub use monitor::GeofenceMonitor;
pub use sink::{EventSink, Notifier};
pub use source::{AuthorizationStatus, LocationEvent, LocationFix, LocationSource};
