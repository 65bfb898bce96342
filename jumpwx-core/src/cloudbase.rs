//! Cloud base estimation from the surface temperature / dew point spread.
//!
//! <https://en.wikipedia.org/wiki/Cloud_base>

use serde::{Deserialize, Serialize};

/// Meters of altitude per degree of temperature / dew point spread.
const METERS_PER_DEGREE_SPREAD: f64 = 125.0;

/// How to round the estimate for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rounding {
    /// The raw model output.
    Exact,
    /// Nearest 100 m. The default for display: the model is nowhere near
    /// precise enough to justify meter-level output.
    NearestHundred,
}

/// Estimated cloud base altitude in meters above the site.
///
/// The estimate assumes cloud formation actually happens at the measurement
/// site; over a dry site it is only the altitude where it *would* form.
/// Always defined for finite inputs — an inverted spread simply gives a
/// negative altitude, which callers may treat as "on the deck".
pub fn estimate(temperature: f64, dew_point: f64, rounding: Rounding) -> f64 {
    let altitude = METERS_PER_DEGREE_SPREAD * (temperature - dew_point);

    match rounding {
        Rounding::Exact => altitude,
        Rounding::NearestHundred => (altitude / 100.0).round() * 100.0,
    }
}
