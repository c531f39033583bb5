use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::{info, warn};

use geokiyo_location::sink::LogNotifier;
use geokiyo_location::software::{PromptPolicy, SoftwareLocationService, UpdateMode};
use geokiyo_location::{data, doctor, gnss, AuthorizationStatus, EventSink, GeofenceMonitor, LocationConfig};
use geokiyo_proto::{Coordinate, GeofenceEvent};

#[derive(Debug, Parser)]
#[command(name = "geokiyo", version, about = "GeoKiyo - dynamic geofence monitoring")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config and the geofence document.
    Doctor,
    /// Print the loaded geofences.
    Geofences {
        /// Also print the distance from this point, as LAT,LON.
        #[arg(long, value_parser = parse_coordinate)]
        near: Option<Coordinate>,
    },
    /// Feed NMEA fixes through the monitor and print events as JSON lines.
    Run,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    #[serde(default)]
    location: LocationConfig,
    source: SourceCfg,
}

#[derive(Debug, serde::Deserialize)]
struct SourceCfg {
    kind: String,
    nmea_device: Option<String>,
    nmea_file: Option<String>,
    #[serde(default = "default_authorization")]
    authorization: AuthorizationStatus,
    #[serde(default = "default_authorization")]
    grant_on_prompt: AuthorizationStatus,
    #[serde(default = "default_true")]
    significant_change: bool,
    temporary_full_accuracy_purpose: Option<String>,
}

fn default_authorization() -> AuthorizationStatus {
    AuthorizationStatus::AuthorizedAlways
}

fn default_true() -> bool {
    true
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s.split_once(',').ok_or("expected LAT,LON")?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {}", e))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {}", e))?;
    let c = Coordinate::new(lat, lon);
    if !c.is_valid() {
        return Err(format!("coordinate out of range: {}", s));
    }
    Ok(c)
}

/// Writes each transition as one JSON object per line on stdout.
struct JsonLinesSink {
    out: std::io::Stdout,
}

impl JsonLinesSink {
    fn stdout() -> Self {
        Self { out: std::io::stdout() }
    }

    fn write(&mut self, ev: &GeofenceEvent) {
        let mut out = self.out.lock();
        let res = serde_json::to_writer(&mut out, ev)
            .map_err(anyhow::Error::from)
            .and_then(|_| out.write_all(b"\n").map_err(anyhow::Error::from));
        if let Err(e) = res {
            warn!("event output failed: {:#}", e);
        }
    }
}

impl EventSink for JsonLinesSink {
    fn did_enter_geofence(&mut self, event: &GeofenceEvent) {
        self.write(event);
    }

    fn did_exit_geofence(&mut self, event: &GeofenceEvent) {
        self.write(event);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor_cmd(&cfg).await?,
        Command::Geofences { near } => geofences_cmd(&cfg, near).await?,
        Command::Run => run(&cfg).await?,
    }
    Ok(())
}

async fn doctor_cmd(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_location_config(&cfg.location)?;

    match cfg.source.kind.as_str() {
        "nmea-serial" => anyhow::ensure!(
            cfg.source.nmea_device.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
            "source.nmea_device missing"
        ),
        "nmea-file" => {
            let f = cfg.source.nmea_file.as_ref().context("source.nmea_file missing")?;
            anyhow::ensure!(std::path::Path::new(f).is_file(), "nmea file not found: {}", f);
        }
        other => anyhow::bail!("unknown source.kind: {}", other),
    }

    let fences = data::load_geofences(&cfg.location).await;
    if fences.is_empty() {
        warn!("doctor: no geofences loaded");
    }
    doctor::check_geofences(&fences);

    info!("doctor: OK ({} geofences)", fences.len());
    Ok(())
}

async fn geofences_cmd(cfg: &Config, near: Option<Coordinate>) -> Result<()> {
    let fences = data::load_geofences(&cfg.location).await;
    for g in &fences {
        let dist = near
            .map(|p| format!(" dist={:.0}m", p.distance_m(&g.center)))
            .unwrap_or_default();
        println!(
            "{} lat={} lon={} radius={}m enter={} exit={}{}",
            g.name, g.center.lat, g.center.lon, g.radius_m, g.notify_on_entry, g.notify_on_exit, dist
        );
    }
    Ok(())
}

/// Prompts, then starts updates unless the resulting authorization change
/// already did.
fn bring_up<S: EventSink>(monitor: &mut GeofenceMonitor<SoftwareLocationService, S, LogNotifier>) {
    monitor.request_authorization();
    monitor.pump();
    if monitor.source().mode() == UpdateMode::Stopped {
        monitor.start_location_updates();
    }
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let mut src = match cfg.source.kind.as_str() {
        "nmea-serial" => gnss::GnssSource::serial(cfg.source.nmea_device.as_ref().context("source.nmea_device missing")?)?,
        "nmea-file" => gnss::GnssSource::file(cfg.source.nmea_file.as_ref().context("source.nmea_file missing")?).await?,
        other => anyhow::bail!("unknown source.kind: {}", other),
    };

    let fences = data::load_geofences(&cfg.location).await;
    doctor::check_geofences(&fences);

    let policy = PromptPolicy { grant: cfg.source.grant_on_prompt, allow_temporary_full_accuracy: true };
    let svc = SoftwareLocationService::new(cfg.source.authorization, policy)
        .with_significant_change(cfg.source.significant_change);
    let mut monitor = GeofenceMonitor::new(cfg.location.clone(), fences, svc, JsonLinesSink::stdout(), LogNotifier);

    bring_up(&mut monitor);
    if let Some(purpose) = &cfg.source.temporary_full_accuracy_purpose {
        monitor.request_temporary_full_accuracy(purpose);
    }

    let mut fixes = 0u64;
    loop {
        tokio::select! {
            fix = src.next_fix() => match fix? {
                Some(fix) => {
                    monitor.source_mut().ingest(fix);
                    monitor.pump();
                    fixes += 1;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("run: interrupted");
                break;
            }
        }
    }

    info!(
        "run: {} fixes, monitoring {:?}",
        fixes,
        monitor.monitored_geofences().unwrap_or_default()
    );
    monitor.disable();
    Ok(())
}
