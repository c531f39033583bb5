use anyhow::Result;
use geokiyo_proto::Geofence;
use tracing::warn;

use crate::config::{GeofenceSource, LocationConfig};

/// Concurrent regions a platform location client will watch per app.
pub const REGION_BUDGET: usize = 20;

pub fn check_location_config(cfg: &LocationConfig) -> Result<()> {
    anyhow::ensure!(
        cfg.update_distance.is_finite() && cfg.update_distance > 0.0,
        "location.update_distance must be > 0"
    );
    match &cfg.geofences {
        None => warn!("doctor: no geofence source configured"),
        Some(GeofenceSource::Default) => {
            anyhow::ensure!(!cfg.account.is_empty(), "location.account required for the default geofence source");
            anyhow::ensure!(!cfg.profile.is_empty(), "location.profile required for the default geofence source");
        }
        Some(GeofenceSource::LocalFile { path }) => {
            anyhow::ensure!(path.is_file(), "geofence file not found: {}", path.display());
        }
        Some(GeofenceSource::CustomUrl { url }) => {
            anyhow::ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "geofence url must be http(s): {}",
                url
            );
        }
    }
    Ok(())
}

/// Returns false (with a warning) when more geofences are loaded than the
/// client can watch at once; dynamic monitoring then matters.
pub fn check_geofences(fences: &[Geofence]) -> bool {
    if fences.len() > REGION_BUDGET {
        warn!("doctor: {} geofences loaded, only {} can be monitored at once", fences.len(), REGION_BUDGET);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_update_distance() {
        let cfg = LocationConfig { update_distance: 0.0, ..Default::default() };
        assert!(check_location_config(&cfg).is_err());
        let cfg = LocationConfig { update_distance: f64::NAN, ..Default::default() };
        assert!(check_location_config(&cfg).is_err());
        assert!(check_location_config(&LocationConfig::default()).is_ok());
    }

    #[test]
    fn default_source_needs_account_and_profile() {
        let mut cfg = LocationConfig { geofences: Some(GeofenceSource::Default), ..Default::default() };
        assert!(check_location_config(&cfg).is_err());
        cfg.account = "kiyo".into();
        cfg.profile = "main".into();
        assert!(check_location_config(&cfg).is_ok());
    }

    #[test]
    fn custom_url_must_be_http() {
        let cfg = LocationConfig {
            geofences: Some(GeofenceSource::CustomUrl { url: "ftp://example.com/g.json".into() }),
            ..Default::default()
        };
        assert!(check_location_config(&cfg).is_err());
    }

    #[test]
    fn region_budget() {
        let g = Geofence {
            name: "g".into(),
            center: geokiyo_proto::Coordinate::new(0.0, 0.0),
            radius_m: 10.0,
            notify_on_entry: true,
            notify_on_exit: true,
        };
        assert!(check_geofences(&vec![g.clone(); REGION_BUDGET]));
        assert!(!check_geofences(&vec![g; REGION_BUDGET + 1]));
    }
}
