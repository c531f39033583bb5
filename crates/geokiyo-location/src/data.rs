//! Loading geofence definitions from a bundled file or a hosted JSON document.

use geokiyo_proto::{Coordinate, Geofence, GeofenceRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{GeofenceSource, LocationConfig};

#[derive(Debug, Error)]
pub enum GeofenceDataError {
    #[error("read geofence file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fetch geofences from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("parse geofence document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parses a geofence document, keeping valid records in order and dropping
/// the rest with a warning.
pub fn parse_geofences(json: &str) -> Result<Vec<Geofence>, GeofenceDataError> {
    let records: Vec<GeofenceRecord> = serde_json::from_str(json)?;
    let total = records.len();
    let fences: Vec<Geofence> = records
        .into_iter()
        .filter_map(|rec| match validate(rec) {
            Ok(g) => Some(g),
            Err(reason) => {
                warn!("geofence data: dropping record: {}", reason);
                None
            }
        })
        .collect();
    if fences.len() != total {
        warn!("geofence data: kept {} of {} records", fences.len(), total);
    }
    Ok(fences)
}

fn validate(rec: GeofenceRecord) -> Result<Geofence, String> {
    if rec.name.trim().is_empty() {
        return Err("empty name".to_string());
    }
    let center = Coordinate::new(rec.latitude, rec.longitude);
    if !center.is_valid() {
        return Err(format!("{}: coordinate out of range ({}, {})", rec.name, rec.latitude, rec.longitude));
    }
    if !(rec.radius.is_finite() && rec.radius > 0.0) {
        return Err(format!("{}: radius must be positive, got {}", rec.name, rec.radius));
    }
    Ok(Geofence {
        name: rec.name,
        center,
        radius_m: rec.radius,
        notify_on_entry: rec.trigger_on_enter,
        notify_on_exit: rec.trigger_on_exit,
    })
}

pub async fn read_geofence_file(path: &Path) -> Result<Vec<Geofence>, GeofenceDataError> {
    let s = tokio::fs::read_to_string(path).await.map_err(|source| GeofenceDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_geofences(&s)
}

pub async fn fetch_geofences(url: &str) -> Result<Vec<Geofence>, GeofenceDataError> {
    let http = |source| GeofenceDataError::Http { url: url.to_string(), source };
    let body = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(http)?
        .text()
        .await
        .map_err(http)?;
    parse_geofences(&body)
}

/// Resolves the configured geofence source. Failures are logged and yield
/// an empty list so the monitor can still come up.
pub async fn load_geofences(cfg: &LocationConfig) -> Vec<Geofence> {
    let res = match &cfg.geofences {
        None => return Vec::new(),
        Some(GeofenceSource::LocalFile { path }) => read_geofence_file(path).await,
        Some(GeofenceSource::CustomUrl { url }) => fetch_geofences(url).await,
        Some(GeofenceSource::Default) => fetch_geofences(&cfg.geofences_url()).await,
    };
    match res {
        Ok(fences) => {
            info!("geofence data: loaded {} geofences", fences.len());
            fences
        }
        Err(e) => {
            error!("geofence data: {:#}", anyhow::Error::from(e));
            Vec::new()
        }
    }
}
