use anyhow::{Context, Result};
use geokiyo_proto::Coordinate;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

use crate::source::LocationFix;

const KNOTS_TO_MPS: f64 = 0.514_444;

pub enum GnssSource {
    Serial(BufReader<SerialStream>),
    File(BufReader<File>),
}

impl GnssSource {
    pub fn serial(dev: &str) -> Result<Self> {
        let port = tokio_serial::new(dev, 115200).open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        Ok(Self::Serial(BufReader::new(port)))
    }

    pub async fn file(path: &str) -> Result<Self> {
        let f = File::open(path).await.with_context(|| format!("open nmea file {}", path))?;
        Ok(Self::File(BufReader::new(f)))
    }

    /// Next usable fix; `None` once a file source is exhausted.
    pub async fn next_fix(&mut self) -> Result<Option<LocationFix>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = match self {
                GnssSource::Serial(r) => r.read_line(&mut line).await.context("read nmea serial")?,
                GnssSource::File(r) => r.read_line(&mut line).await.context("read nmea file")?,
            };
            if n == 0 {
                match self {
                    GnssSource::File(_) => return Ok(None),
                    GnssSource::Serial(_) => anyhow::bail!("nmea serial device closed"),
                }
            }
            if let Some(fix) = parse_nmea_line(line.trim()) {
                return Ok(Some(fix));
            }
        }
    }
}

// Only RMC carries everything a fix needs (position, speed, date).
pub fn parse_nmea_line(s: &str) -> Option<LocationFix> {
    if !(s.starts_with("$GNRMC") || s.starts_with("$GPRMC")) {
        return None;
    }
    let body = match s.split_once('*') {
        Some((body, sum)) => {
            if !checksum_ok(body, sum) {
                debug!("nmea: checksum mismatch, sentence skipped");
                return None;
            }
            body
        }
        None => s,
    };
    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() < 10 {
        return None;
    }
    if parts[2] != "A" {
        debug!("nmea: void fix skipped");
        return None;
    }
    let lat = parse_deg_min(parts[3], parts[4])?;
    let lon = parse_deg_min(parts[5], parts[6])?;
    let speed = parts[7].parse::<f64>().map(|kn| kn * KNOTS_TO_MPS).unwrap_or(-1.0);
    let timestamp = parse_timestamp(parts[1], parts[9])?;

    let coordinate = Coordinate::new(lat, lon);
    if !coordinate.is_valid() {
        return None;
    }
    Some(LocationFix { coordinate, timestamp, speed })
}

// XOR of every byte between '$' and '*', as two hex digits.
fn checksum_ok(body: &str, sum: &str) -> bool {
    let Some(payload) = body.strip_prefix('$') else { return false; };
    let Ok(expected) = u8::from_str_radix(sum.trim(), 16) else { return false; };
    let actual = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    sum.trim().len() == 2 && actual == expected
}

fn parse_deg_min(v: &str, hemi: &str) -> Option<f64> {
    if v.is_empty() { return None; }
    // lat: ddmm.mmmm, lon: dddmm.mmmm
    let dot = v.find('.')?;
    let deg_len = if dot > 4 { 3 } else { 2 };
    let deg: f64 = v.get(..deg_len)?.parse().ok()?;
    let min: f64 = v.get(deg_len..)?.parse().ok()?;
    let mut out = deg + (min / 60.0);
    if hemi == "S" || hemi == "W" { out = -out; }
    Some(out)
}

// hhmmss(.sss) + ddmmyy, always UTC.
fn parse_timestamp(hms: &str, dmy: &str) -> Option<OffsetDateTime> {
    let num = |s: &str, r: std::ops::Range<usize>| s.get(r)?.parse::<u8>().ok();
    let h = num(hms, 0..2)?;
    let m = num(hms, 2..4)?;
    let sec = num(hms, 4..6)?;
    let millis = match hms.get(6..) {
        Some(frac) if frac.starts_with('.') && frac.len() > 1 => {
            let f: f64 = format!("0{}", frac).parse().ok()?;
            (f * 1000.0).round().min(999.0) as u16
        }
        _ => 0,
    };
    let day = num(dmy, 0..2)?;
    let month = Month::try_from(num(dmy, 2..4)?).ok()?;
    let year = 2000 + num(dmy, 4..6)? as i32;

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms_milli(h, m, sec, millis).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_rmc() {
        let fix = parse_nmea_line("$GPRMC,091500.00,A,3539.4800,N,13942.0960,E,10.0,0.0,300621,,,A*66").unwrap();
        assert!((fix.coordinate.lat - 35.658).abs() < 1e-9);
        assert!((fix.coordinate.lon - 139.7016).abs() < 1e-9);
        assert!((fix.speed - 5.14444).abs() < 1e-6);
        assert_eq!(fix.timestamp, datetime!(2021-06-30 09:15:00 UTC));
    }

    #[test]
    fn southern_western_hemispheres_are_negative() {
        let fix = parse_nmea_line("$GNRMC,235959.50,A,3352.1200,S,15112.6000,W,,,010124,,,A").unwrap();
        assert!(fix.coordinate.lat < 0.0);
        assert!(fix.coordinate.lon < 0.0);
        assert_eq!(fix.speed, -1.0);
        assert_eq!(fix.timestamp, datetime!(2024-01-01 23:59:59.5 UTC));
    }

    #[test]
    fn skips_void_and_foreign_sentences() {
        assert!(parse_nmea_line("$GPRMC,091500.00,V,,,,,,,300621,,,N").is_none());
        assert!(parse_nmea_line("$GPGGA,091500.00,3539.4800,N,13942.0960,E,1,08,0.9,40.0,M,,M,,").is_none());
        assert!(parse_nmea_line("$GPRMC,garbage").is_none());
    }

    #[test]
    fn rejects_corrupted_sentence() {
        let good = "$GPRMC,090000.00,A,3540.7400,N,13946.0260,E,2.7,0.0,300621,,,A*58";
        assert!(parse_nmea_line(good).is_some());
        // one flipped digit in the latitude, checksum left alone
        let bad = "$GPRMC,090000.00,A,3940.7400,N,13946.0260,E,2.7,0.0,300621,,,A*58";
        assert!(parse_nmea_line(bad).is_none());
        assert!(parse_nmea_line("$GPRMC,090000.00,A,3540.7400,N,13946.0260,E,2.7,0.0,300621,,,A*5").is_none());
        assert!(parse_nmea_line("$GPRMC,090000.00,A,3540.7400,N,13946.0260,E,2.7,0.0,300621,,,A*ZZ").is_none());
    }

    #[tokio::test]
    async fn file_source_ends_at_eof() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "$GPGGA,091500.00,3539.4800,N,13942.0960,E,1,08,0.9,40.0,M,,M,,").unwrap();
        writeln!(f, "$GPRMC,091500.00,A,3539.4800,N,13942.0960,E,0.0,0.0,300621,,,A").unwrap();
        let mut src = GnssSource::file(f.path().to_str().unwrap()).await.unwrap();
        assert!(src.next_fix().await.unwrap().is_some());
        assert!(src.next_fix().await.unwrap().is_none());
    }
}
