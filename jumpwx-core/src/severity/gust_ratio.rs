//! Direct gust-to-mean-ratio severity rule.
//!
//! The older of the two schemes: the tier is decided by how much the peak
//! gust exceeds the mean speed, with the direction spread able to override
//! upward. Rules are evaluated in order and the most severe outcome wins.

use super::{Severity, SeverityClassifier, SeverityColor, WindStats};

/// Gusts at or below this never trigger a ratio tier.
const GUST_FLOOR: f64 = 4.0;
/// Gust/mean ratio for the red tier.
const RED_RATIO: f64 = 2.0;
/// Gust/mean ratio for the orange tier.
const ORANGE_RATIO: f64 = 1.5;
/// Direction spread that forces red regardless of the ratio outcome.
const RED_VARIATION: f64 = 90.0;
/// Direction spread that raises a non-red result to orange.
const ORANGE_VARIATION: f64 = 45.0;

const RED_EXTRA_WIDTH: u32 = 20;
const ORANGE_EXTRA_WIDTH: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct GustRatioClassifier;

impl SeverityClassifier for GustRatioClassifier {
    fn classify(&self, stats: &WindStats) -> Severity {
        let mut color = SeverityColor::Green;
        let mut extra_width = 0;

        // With a zero mean speed the ratio is undefined; the ratio rules
        // simply do not fire instead of letting infinity pick a tier.
        let ratio = (stats.average_speed > 0.0).then(|| stats.max_gust / stats.average_speed);

        if let Some(ratio) = ratio
            && stats.max_gust > GUST_FLOOR
        {
            if ratio >= RED_RATIO {
                color = SeverityColor::Red;
                extra_width = RED_EXTRA_WIDTH;
            } else if ratio >= ORANGE_RATIO {
                color = SeverityColor::Orange;
                extra_width = ORANGE_EXTRA_WIDTH;
            }
        }

        if stats.variation_range > RED_VARIATION {
            color = SeverityColor::Red;
        } else if stats.variation_range >= ORANGE_VARIATION && color != SeverityColor::Red {
            color = SeverityColor::Orange;
        }

        Severity { color, extra_width }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(average_speed: f64, max_gust: f64, variation_range: f64) -> Severity {
        GustRatioClassifier.classify(&WindStats {
            average_direction: 0.0,
            variation_range,
            average_speed,
            max_gust,
        })
    }

    #[test]
    fn steady_light_wind_is_green() {
        let severity = classify(3.0, 4.0, 10.0);
        assert_eq!(severity.color, SeverityColor::Green);
        assert_eq!(severity.extra_width, 0);
    }

    #[test]
    fn high_gust_ratio_is_red() {
        // ratio 2.5 with gusts above the floor, spread too small to override
        let severity = classify(4.0, 10.0, 10.0);
        assert_eq!(severity.color, SeverityColor::Red);
        assert_eq!(severity.extra_width, 20);
    }

    #[test]
    fn moderate_gust_ratio_is_orange() {
        let severity = classify(4.0, 7.0, 10.0);
        assert_eq!(severity.color, SeverityColor::Orange);
        assert_eq!(severity.extra_width, 10);
    }

    #[test]
    fn ratio_rules_need_gusts_above_the_floor() {
        // ratio 4.0 but the gust itself is weak
        let severity = classify(1.0, 4.0, 0.0);
        assert_eq!(severity.color, SeverityColor::Green);
    }

    #[test]
    fn wide_variation_forces_red_despite_low_ratio() {
        let severity = classify(5.0, 6.0, 100.0);
        assert_eq!(severity.color, SeverityColor::Red);
        // width comes from the ratio rules only
        assert_eq!(severity.extra_width, 0);
    }

    #[test]
    fn moderate_variation_raises_green_to_orange() {
        let severity = classify(5.0, 6.0, 45.0);
        assert_eq!(severity.color, SeverityColor::Orange);
    }

    #[test]
    fn variation_does_not_downgrade_red() {
        let severity = classify(4.0, 10.0, 60.0);
        assert_eq!(severity.color, SeverityColor::Red);
        assert_eq!(severity.extra_width, 20);
    }

    #[test]
    fn zero_mean_speed_does_not_poison_the_tier() {
        let severity = classify(0.0, 10.0, 10.0);
        assert_eq!(severity.color, SeverityColor::Green);
        assert_eq!(severity.extra_width, 0);
    }
}
