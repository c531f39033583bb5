use geokiyo_proto::DesiredAccuracy;
use serde::Deserialize;
use std::path::PathBuf;

pub const DLE_BASE_URL: &str = "https://tags.tiqcdn.com/dle/";
pub const GEOFENCES_FILE_NAME: &str = "geofences";

/// Where the geofence definitions come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeofenceSource {
    LocalFile { path: PathBuf },
    CustomUrl { url: String },
    /// Hosted document derived from account/profile.
    Default,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Continuous updates instead of significant-change monitoring.
    pub use_high_accuracy: bool,
    /// Meters. Doubles as the source's distance filter and the radius around
    /// the device inside which geofences get monitored.
    pub update_distance: f64,
    pub desired_accuracy: DesiredAccuracy,
    pub account: String,
    pub profile: String,
    pub geofences: Option<GeofenceSource>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            use_high_accuracy: false,
            update_distance: 500.0,
            desired_accuracy: DesiredAccuracy::default(),
            account: String::new(),
            profile: String::new(),
            geofences: None,
        }
    }
}

impl LocationConfig {
    pub fn geofences_url(&self) -> String {
        format!("{}{}/{}/{}.json", DLE_BASE_URL, self.account, self.profile, GEOFENCES_FILE_NAME)
    }

    pub fn accuracy_label(&self) -> &'static str {
        if self.use_high_accuracy { "high" } else { "low" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_table() {
        let cfg: LocationConfig = toml::from_str("").unwrap();
        assert!(!cfg.use_high_accuracy);
        assert_eq!(cfg.update_distance, 500.0);
        assert_eq!(cfg.desired_accuracy, DesiredAccuracy::Reduced);
        assert!(cfg.geofences.is_none());
        assert_eq!(cfg.accuracy_label(), "low");
    }

    #[test]
    fn parses_geofence_sources() {
        let cfg: LocationConfig = toml::from_str(
            r#"
            use_high_accuracy = true
            update_distance = 150.0
            desired_accuracy = "nearest_ten_meters"
            geofences = { kind = "local_file", path = "fences.json" }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.desired_accuracy, DesiredAccuracy::NearestTenMeters);
        assert_eq!(cfg.geofences, Some(GeofenceSource::LocalFile { path: "fences.json".into() }));
        assert_eq!(cfg.accuracy_label(), "high");

        let cfg: LocationConfig = toml::from_str(r#"geofences = { kind = "default" }"#).unwrap();
        assert_eq!(cfg.geofences, Some(GeofenceSource::Default));
    }

    #[test]
    fn default_url_uses_account_and_profile() {
        let cfg = LocationConfig { account: "kiyo".into(), profile: "main".into(), ..Default::default() };
        assert_eq!(cfg.geofences_url(), "https://tags.tiqcdn.com/dle/kiyo/main/geofences.json");
    }
}
