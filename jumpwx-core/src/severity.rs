//! Wind severity classification.
//!
//! Two classification schemes have been used for the same signal over the
//! app's history and they do not agree on thresholds. Both are kept behind
//! [`SeverityClassifier`] and selected explicitly; see the scheme modules
//! for the rules.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::angles;
use crate::model::Observation;
use crate::severity::{gust_ratio::GustRatioClassifier, wind_ref::WindRefScorer};

pub mod gust_ratio;
pub mod wind_ref;

/// Severity palette. The hex values are the ones the reference deployment
/// renders, kept verbatim so a tier keeps its operational meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeverityColor {
    /// Dead calm. Rendered as caution at a drop zone, not as "all good".
    Yellow,
    Green,
    Orange,
    Red,
    DarkRed,
}

impl SeverityColor {
    pub fn css(&self) -> &'static str {
        match self {
            SeverityColor::Yellow => "#E6DB00",
            SeverityColor::Green => "#2CF000",
            SeverityColor::Orange => "orange",
            SeverityColor::Red => "red",
            SeverityColor::DarkRed => "#AC0000",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeverityColor::Yellow => "calm",
            SeverityColor::Green => "ok",
            SeverityColor::Orange => "caution",
            SeverityColor::Red => "strong",
            SeverityColor::DarkRed => "severe",
        }
    }
}

/// Classifier output: a palette tier plus a visual-weight hint for the
/// compass needle, monotonic in severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Severity {
    pub color: SeverityColor,
    pub extra_width: u32,
}

/// Statistics of one observation window, the common input of both schemes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindStats {
    /// Circular mean of the window's directions, degrees `[0, 360)`.
    pub average_direction: f64,
    /// Maximum pairwise angular spread, degrees `[0, 180]`.
    pub variation_range: f64,
    /// Arithmetic mean speed, m/s. Speed is not angular.
    pub average_speed: f64,
    /// Maximum gust, m/s.
    pub max_gust: f64,
}

impl WindStats {
    /// Compute window statistics from pre-filtered observations.
    ///
    /// `window` should come from [`crate::window::select_recent_valid`];
    /// entries without valid wind data are skipped defensively anyway.
    /// Returns `None` when no usable entries remain.
    pub fn from_window(window: &[Observation]) -> Option<Self> {
        let directions: Vec<f64> = window.iter().filter_map(|o| o.direction).collect();
        let speeds: Vec<f64> = window.iter().filter_map(|o| o.speed).collect();
        let gusts: Vec<f64> = window.iter().filter_map(|o| o.gust).collect();

        if directions.is_empty() || speeds.is_empty() || gusts.is_empty() {
            tracing::warn!("insufficient wind data after filtering");
            return None;
        }

        let average_direction = angles::mean_direction(&directions);
        let variation_range = angles::variation_range(&directions);
        let average_speed = speeds.iter().sum::<f64>() / speeds.len() as f64;
        let max_gust = gusts.iter().fold(f64::MIN, |a, b| a.max(*b));

        tracing::debug!(
            average_direction,
            variation_range,
            average_speed,
            max_gust,
            "window statistics"
        );

        Some(Self { average_direction, variation_range, average_speed, max_gust })
    }
}

/// A wind severity scheme: window statistics in, palette tier out.
pub trait SeverityClassifier: Send + Sync + Debug {
    fn classify(&self, stats: &WindStats) -> Severity;
}

/// Selectable severity scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// Direct gust-to-mean ratio rule, see [`gust_ratio`].
    GustRatio,
    /// Table-driven 0–4 wind reference grade, see [`wind_ref`].
    WindRef,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::GustRatio => "gust-ratio",
            Scheme::WindRef => "wind-ref",
        }
    }

    pub const fn all() -> &'static [Scheme] {
        &[Scheme::GustRatio, Scheme::WindRef]
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Scheme {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "gust-ratio" => Ok(Scheme::GustRatio),
            "wind-ref" => Ok(Scheme::WindRef),
            _ => Err(anyhow::anyhow!(
                "Unknown severity scheme '{value}'. Supported schemes: gust-ratio, wind-ref."
            )),
        }
    }
}

/// Construct the classifier for a scheme.
pub fn classifier_for(scheme: Scheme) -> Box<dyn SeverityClassifier> {
    match scheme {
        Scheme::GustRatio => Box::new(GustRatioClassifier),
        Scheme::WindRef => Box::new(WindRefScorer),
    }
}

/// The derived wind variation summary the display layer consumes.
///
/// Recomputed from scratch on every call; it has no identity and is always
/// safe to discard.
#[derive(Debug, Clone, PartialEq)]
pub struct WindVariations {
    /// Degrees, `[0, 180]`.
    pub variation_range: f64,
    /// Degrees, `[0, 360)`.
    pub average_direction: f64,
    pub color: SeverityColor,
    pub extra_width: u32,
}

/// Derive the wind variation summary for an observation window.
///
/// `window` must already be selected via [`crate::window`]; an empty window
/// yields `None`, which callers must render as "no data" — a zeroed result
/// here would be indistinguishable from calm. Pure: calling twice with the
/// same window yields an identical result.
pub fn wind_variations(window: &[Observation], scheme: Scheme) -> Option<WindVariations> {
    if window.is_empty() {
        tracing::warn!("no recent observations available");
        return None;
    }

    let stats = WindStats::from_window(window)?;
    let severity = classifier_for(scheme).classify(&stats);

    Some(WindVariations {
        variation_range: stats.variation_range,
        average_direction: stats.average_direction,
        color: severity.color,
        extra_width: severity.extra_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataSource;
    use chrono::{TimeZone, Utc};

    fn obs(direction: f64, speed: f64, gust: f64) -> Observation {
        let mut o = Observation::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            DataSource::Mock,
        );
        o.direction = Some(direction);
        o.speed = Some(speed);
        o.gust = Some(gust);
        o
    }

    #[test]
    fn empty_window_yields_no_result() {
        for scheme in Scheme::all() {
            assert_eq!(wind_variations(&[], *scheme), None);
        }
    }

    #[test]
    fn stats_skip_entries_without_wind() {
        let mut broken = obs(0.0, 1.0, 2.0);
        broken.direction = None;
        broken.speed = None;
        broken.gust = None;

        assert_eq!(WindStats::from_window(&[broken]), None);
    }

    #[test]
    fn stats_from_single_observation() {
        let stats = WindStats::from_window(&[obs(270.0, 4.0, 6.0)]).unwrap();

        assert_eq!(stats.variation_range, 0.0);
        assert!((stats.average_direction - 270.0).abs() < 1e-9);
        assert_eq!(stats.average_speed, 4.0);
        assert_eq!(stats.max_gust, 6.0);
    }

    #[test]
    fn scheme_name_roundtrip() {
        for scheme in Scheme::all() {
            assert_eq!(Scheme::try_from(scheme.as_str()).unwrap(), *scheme);
        }
        assert!(Scheme::try_from("doesnotexist").is_err());
    }

    #[test]
    fn identical_input_yields_identical_result() {
        let window = vec![obs(270.0, 2.0, 5.0), obs(200.0, 3.0, 6.0)];
        let snapshot = window.clone();

        let first = wind_variations(&window, Scheme::WindRef);
        let second = wind_variations(&window, Scheme::WindRef);

        assert_eq!(first, second);
        assert_eq!(window, snapshot, "input must not be mutated");
    }
}
