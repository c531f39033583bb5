use serde::{Deserialize, Serialize};

/// Requested precision of location fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredAccuracy {
    BestForNavigation,
    Best,
    NearestTenMeters,
    NearestHundredMeters,
    #[default]
    Reduced,
    WithinOneKilometer,
    WithinThreeKilometers,
}

impl DesiredAccuracy {
    /// Platform accuracy value in meters. The two "best" tiers use the
    /// negative sentinels location services expect.
    pub fn meters(self) -> f64 {
        match self {
            DesiredAccuracy::BestForNavigation => -2.0,
            DesiredAccuracy::Best => -1.0,
            DesiredAccuracy::NearestTenMeters => 10.0,
            DesiredAccuracy::NearestHundredMeters => 100.0,
            DesiredAccuracy::Reduced => 3000.0,
            DesiredAccuracy::WithinOneKilometer => 1000.0,
            DesiredAccuracy::WithinThreeKilometers => 3000.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DesiredAccuracy::BestForNavigation => "best_for_navigation",
            DesiredAccuracy::Best => "best",
            DesiredAccuracy::NearestTenMeters => "nearest_ten_meters",
            DesiredAccuracy::NearestHundredMeters => "nearest_hundred_meters",
            DesiredAccuracy::Reduced => "reduced",
            DesiredAccuracy::WithinOneKilometer => "within_one_kilometer",
            DesiredAccuracy::WithinThreeKilometers => "within_three_kilometers",
        }
    }
}
