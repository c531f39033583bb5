use serde::{Deserialize, Deserializer, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat.abs() <= 90.0 && self.lon.abs() <= 180.0
    }
}

/// A named circular region with its entry/exit notification policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub name: String,
    pub center: Coordinate,
    pub radius_m: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

impl Geofence {
    pub fn contains(&self, point: &Coordinate) -> bool {
        self.center.distance_m(point) <= self.radius_m
    }
}

/// One entry of a hosted geofence document.
///
/// Trigger flags show up both as JSON booleans and as `"true"`/`"false"`
/// strings in the wild, so both are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeofenceRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    #[serde(deserialize_with = "flexible_bool")]
    pub trigger_on_enter: bool,
    #[serde(deserialize_with = "flexible_bool")]
    pub trigger_on_exit: bool,
    #[serde(default)]
    pub minimum_dwell_time: Option<u64>,
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid trigger flag {:?}", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_one_degree_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = a.distance_m(&b);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn distance_is_zero_for_same_point() {
        let p = Coordinate::new(35.6812, 139.7671);
        assert!(p.distance_m(&p) < 1e-6);
    }

    #[test]
    fn record_accepts_string_and_bool_flags() {
        let json = r#"[
            {"name":"a","latitude":1.0,"longitude":2.0,"radius":100,"trigger_on_enter":"true","trigger_on_exit":"false"},
            {"name":"b","latitude":1.0,"longitude":2.0,"radius":50.5,"trigger_on_enter":false,"trigger_on_exit":true,"minimum_dwell_time":0}
        ]"#;
        let recs: Vec<GeofenceRecord> = serde_json::from_str(json).unwrap();
        assert!(recs[0].trigger_on_enter);
        assert!(!recs[0].trigger_on_exit);
        assert!(!recs[1].trigger_on_enter);
        assert!(recs[1].trigger_on_exit);
        assert_eq!(recs[1].minimum_dwell_time, Some(0));
    }

    #[test]
    fn record_rejects_garbage_flag() {
        let json = r#"{"name":"a","latitude":1.0,"longitude":2.0,"radius":1,"trigger_on_enter":"yes","trigger_on_exit":true}"#;
        assert!(serde_json::from_str::<GeofenceRecord>(json).is_err());
    }

    #[test]
    fn contains_uses_radius() {
        let g = Geofence {
            name: "tokyo-station".into(),
            center: Coordinate::new(35.6812, 139.7671),
            radius_m: 200.0,
            notify_on_entry: true,
            notify_on_exit: true,
        };
        assert!(g.contains(&Coordinate::new(35.6813, 139.7672)));
        assert!(!g.contains(&Coordinate::new(35.6900, 139.7671)));
    }
}
