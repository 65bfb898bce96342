use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversion factor from knots to meters per second.
pub const KNOTS_TO_MS: f64 = 0.514444;

/// Where a normalized observation came from.
///
/// Only used for display. The derived computations never branch on the
/// source of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// FMI (Ilmatieteen laitos) observation station.
    Fmi,
    /// FMI edited point forecast.
    Forecast,
    /// Synthesized from a METAR report.
    Metar,
    /// Digitraffic road weather station.
    RoadStation,
    /// Synthetic value injected for testing.
    Mock,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Fmi => "fmi",
            DataSource::Forecast => "forecast",
            DataSource::Metar => "metar",
            DataSource::RoadStation => "roads",
            DataSource::Mock => "mock",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized weather measurement at an instant.
///
/// All wind values are in meters per second, directions in degrees from
/// north `[0, 360)`, temperatures in Celsius. A field is `None` when the
/// upstream service did not report it or reported its "missing" sentinel
/// (`NaN`, `-1`, out-of-range temperature); provider modules decode those at
/// the boundary so no magic number ever reaches the derived computations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub source: DataSource,
    /// Wind direction in degrees, `0`/`360` = north.
    pub direction: Option<f64>,
    /// Mean wind speed, m/s.
    pub speed: Option<f64>,
    /// Gust speed, m/s.
    pub gust: Option<f64>,
    /// Air temperature, °C.
    pub temperature: Option<f64>,
    /// Dew point temperature, °C.
    pub dew_point: Option<f64>,
    /// Low cloud cover, percent. Forecast entries only.
    pub low_cloud_cover: Option<f64>,
    /// Middle + low cloud cover, percent. Forecast entries only.
    pub middle_cloud_cover: Option<f64>,
    /// Probability of precipitation, percent. Forecast entries only.
    pub rain_probability: Option<f64>,
}

impl Observation {
    /// An observation with no measured values.
    pub fn new(time: DateTime<Utc>, source: DataSource) -> Self {
        Self {
            time,
            source,
            direction: None,
            speed: None,
            gust: None,
            temperature: None,
            dew_point: None,
            low_cloud_cover: None,
            middle_cloud_cover: None,
            rain_probability: None,
        }
    }

    /// Whether this observation can participate in wind computations.
    ///
    /// Direction, speed and gust must all be present. Collections are
    /// filtered on this before any derived value is computed; an empty
    /// filtered set is a defined "no result", not an error.
    pub fn has_valid_wind(&self) -> bool {
        self.direction.is_some() && self.speed.is_some() && self.gust.is_some()
    }
}

/// Wind group of a decoded METAR report, in the report's own unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetarWind {
    /// Degrees from north. `None` for variable (`VRB`) winds.
    pub direction: Option<f64>,
    pub speed: Option<f64>,
    pub gust: Option<f64>,
    /// Reporting unit of speed and gust.
    pub unit: WindUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    Knots,
    Mps,
}

impl MetarWind {
    pub fn speed_ms(&self) -> Option<f64> {
        self.speed.map(|v| self.to_ms(v))
    }

    pub fn gust_ms(&self) -> Option<f64> {
        self.gust.map(|v| self.to_ms(v))
    }

    fn to_ms(&self, value: f64) -> f64 {
        match self.unit {
            WindUnit::Knots => value * KNOTS_TO_MS,
            WindUnit::Mps => value,
        }
    }
}

/// One cloud layer of a METAR report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    /// Amount code: FEW, SCT, BKN, OVC.
    pub amount: String,
    /// Base height in `unit`.
    pub base: f64,
    /// Unit of `base`: `ft`, `hft` or `m`.
    pub unit: String,
}

impl CloudLayer {
    /// Layer base converted to meters.
    pub fn base_meters(&self) -> f64 {
        to_meters(self.base, &self.unit)
    }
}

/// A decoded METAR report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metar {
    pub time: DateTime<Utc>,
    /// The raw report text.
    pub raw: String,
    pub wind: MetarWind,
    pub temperature: Option<f64>,
    pub dew_point: Option<f64>,
    pub clouds: Vec<CloudLayer>,
}

/// Convert a length in the given aviation unit to meters.
///
/// `hft` (hundreds of feet) is what FMI uses for cloud bases, plain `ft`
/// comes from METAR cloud groups. Anything else is assumed to already be
/// meters.
pub fn to_meters(value: f64, unit: &str) -> f64 {
    match unit {
        "hft" => value * 30.48,
        "ft" => value * 0.3048,
        _ => value,
    }
}

/// Convert knots to meters per second.
pub fn knots_to_ms(knots: f64) -> f64 {
    knots * KNOTS_TO_MS
}
