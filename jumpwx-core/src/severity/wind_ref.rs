//! Table-driven "wind reference" grading.
//!
//! Maps (average speed, max gust, direction variation) to a discrete 0–4
//! grade through three ordered lookup tables. Every threshold is a literal
//! table row so the policy can be audited and asserted row by row; rows are
//! matched top to bottom and the first match wins.

use super::{Severity, SeverityClassifier, SeverityColor, WindStats};

const SPEED_MEDIUM: f64 = 6.0;
const SPEED_HIGH: f64 = 8.0;

const GUST_LOW: f64 = 3.0;
const GUST_MEDIUM: f64 = 4.0;
const GUST_HIGH: f64 = 7.0;
const GUST_VERY_HIGH: f64 = 11.0;

const GUST_EXCESS_MEDIUM: f64 = 4.0;
const GUST_EXCESS_HIGH: f64 = 5.5;
const GUST_EXCESS_VERY_HIGH: f64 = 7.0;

const EXTRA_WIDTH_MULTIPLIER: f64 = 3.0;
const MAX_EXTRA_WIDTH: u32 = 30;

/// Base grade row: first row whose gust and speed minimums are both met.
#[derive(Debug, Clone, Copy)]
pub struct BaseRow {
    pub min_gust: f64,
    pub min_speed: f64,
    pub grade: f64,
}

pub const BASE_TABLE: [BaseRow; 6] = [
    BaseRow { min_gust: GUST_VERY_HIGH, min_speed: 0.0, grade: 4.0 },
    BaseRow { min_gust: GUST_HIGH, min_speed: SPEED_HIGH, grade: 3.0 },
    BaseRow { min_gust: GUST_MEDIUM, min_speed: SPEED_MEDIUM, grade: 2.0 },
    BaseRow { min_gust: GUST_MEDIUM, min_speed: 0.0, grade: 2.0 },
    BaseRow { min_gust: GUST_LOW, min_speed: 0.0, grade: 1.0 },
    BaseRow { min_gust: 0.0, min_speed: 0.0, grade: 0.0 },
];

/// Increment row keyed on how far the gust exceeds the mean speed.
#[derive(Debug, Clone, Copy)]
pub struct GustExcessRow {
    pub min_excess: f64,
    pub increment: f64,
}

pub const GUST_EXCESS_TABLE: [GustExcessRow; 4] = [
    GustExcessRow { min_excess: GUST_EXCESS_VERY_HIGH, increment: 1.0 },
    GustExcessRow { min_excess: GUST_EXCESS_HIGH, increment: 0.5 },
    GustExcessRow { min_excess: GUST_EXCESS_MEDIUM, increment: 0.25 },
    GustExcessRow { min_excess: 0.0, increment: 0.0 },
];

/// Increment row keyed on direction variation, gated by a gust minimum:
/// a swinging wind sock only matters once the wind has some punch.
#[derive(Debug, Clone, Copy)]
pub struct VariationRow {
    pub min_gust: f64,
    pub min_variation: f64,
    pub increment: f64,
}

pub const VARIATION_TABLE: [VariationRow; 7] = [
    VariationRow { min_gust: GUST_VERY_HIGH, min_variation: 180.0, increment: 1.0 },
    VariationRow { min_gust: GUST_HIGH, min_variation: 90.0, increment: 1.0 },
    VariationRow { min_gust: GUST_HIGH, min_variation: 45.0, increment: 0.5 },
    VariationRow { min_gust: GUST_MEDIUM, min_variation: 90.0, increment: 0.5 },
    VariationRow { min_gust: GUST_MEDIUM, min_variation: 45.0, increment: 0.25 },
    VariationRow { min_gust: GUST_LOW, min_variation: 90.0, increment: 0.25 },
    VariationRow { min_gust: 0.0, min_variation: 0.0, increment: 0.0 },
];

/// Grade 0..=4 to palette tier.
pub const PALETTE: [SeverityColor; 5] = [
    SeverityColor::Yellow,
    SeverityColor::Green,
    SeverityColor::Orange,
    SeverityColor::Red,
    SeverityColor::DarkRed,
];

fn base_grade(average_speed: f64, max_gust: f64) -> f64 {
    BASE_TABLE
        .iter()
        .find(|row| max_gust >= row.min_gust && average_speed >= row.min_speed)
        .map_or(0.0, |row| row.grade)
}

fn gust_excess_increment(excess: f64) -> f64 {
    GUST_EXCESS_TABLE
        .iter()
        .find(|row| excess >= row.min_excess)
        .map_or(0.0, |row| row.increment)
}

fn variation_increment(variation: f64, max_gust: f64) -> f64 {
    VARIATION_TABLE
        .iter()
        .find(|row| max_gust >= row.min_gust && variation >= row.min_variation)
        .map_or(0.0, |row| row.increment)
}

/// The 0–4 wind reference grade for the given window statistics.
pub fn grade(average_speed: f64, max_gust: f64, variation_range: f64) -> u8 {
    let base = base_grade(average_speed, max_gust);
    let excess = gust_excess_increment(max_gust - average_speed);
    let variation = variation_increment(variation_range, max_gust);

    let total = (base + excess + variation).round().clamp(0.0, 4.0);
    tracing::debug!(base, excess, variation, total, "wind reference grade");

    total as u8
}

fn extra_width(average_speed: f64, max_gust: f64) -> u32 {
    let width = ((max_gust - average_speed) * EXTRA_WIDTH_MULTIPLIER).round().max(0.0) as u32;
    width.min(MAX_EXTRA_WIDTH)
}

#[derive(Debug, Clone, Copy)]
pub struct WindRefScorer;

impl SeverityClassifier for WindRefScorer {
    fn classify(&self, stats: &WindStats) -> Severity {
        let grade = grade(stats.average_speed, stats.max_gust, stats.variation_range);

        Severity {
            color: PALETTE[grade as usize],
            extra_width: extra_width(stats.average_speed, stats.max_gust),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_table_rows_match_in_order() {
        // (speed, gust) -> expected base grade, one case per row
        let cases = [
            (0.0, 11.0, 4.0),
            (8.0, 7.0, 3.0),
            (6.0, 4.0, 2.0),
            (0.0, 4.0, 2.0),
            (0.0, 3.0, 1.0),
            (0.0, 0.0, 0.0),
        ];
        for (speed, gust, expected) in cases {
            assert_eq!(base_grade(speed, gust), expected, "speed {speed}, gust {gust}");
        }
    }

    #[test]
    fn very_high_gust_outranks_speed_rows() {
        // first row wins even though later rows also match
        assert_eq!(base_grade(9.0, 12.0), 4.0);
    }

    #[test]
    fn gust_excess_table_boundaries() {
        assert_eq!(gust_excess_increment(7.0), 1.0);
        assert_eq!(gust_excess_increment(5.5), 0.5);
        assert_eq!(gust_excess_increment(4.0), 0.25);
        assert_eq!(gust_excess_increment(3.9), 0.0);
        assert_eq!(gust_excess_increment(-1.0), 0.0);
    }

    #[test]
    fn variation_table_requires_both_minimums() {
        assert_eq!(variation_increment(180.0, 11.0), 1.0);
        assert_eq!(variation_increment(90.0, 7.0), 1.0);
        assert_eq!(variation_increment(45.0, 7.0), 0.5);
        assert_eq!(variation_increment(90.0, 4.0), 0.5);
        assert_eq!(variation_increment(45.0, 4.0), 0.25);
        assert_eq!(variation_increment(90.0, 3.0), 0.25);
        // wide swing but no wind behind it
        assert_eq!(variation_increment(170.0, 1.0), 0.0);
    }

    #[test]
    fn grade_is_clamped_to_four() {
        assert_eq!(grade(9.0, 20.0, 180.0), 4);
    }

    #[test]
    fn increments_round_up_the_grade() {
        // base 2 (gust>=4), excess 5.5 -> +0.5, rounds to 3
        assert_eq!(grade(1.0, 6.5, 0.0), 3);
        // base 2, excess 4.0 -> +0.25, rounds back to 2
        assert_eq!(grade(1.0, 5.0, 0.0), 2);
    }

    #[test]
    fn grade_monotonic_in_gust() {
        let mut previous = 0;
        for tenths in 0..200 {
            let gust = f64::from(tenths) / 10.0;
            let current = grade(2.0, gust, 45.0);
            assert!(current >= previous, "grade dropped at gust {gust}");
            previous = current;
        }
    }

    #[test]
    fn palette_maps_grades_to_tiers() {
        assert_eq!(PALETTE[0], SeverityColor::Yellow);
        assert_eq!(PALETTE[4], SeverityColor::DarkRed);
    }

    #[test]
    fn extra_width_tracks_gust_excess() {
        assert_eq!(extra_width(2.0, 2.0), 0);
        assert_eq!(extra_width(2.0, 6.0), 12);
        // clamped
        assert_eq!(extra_width(0.0, 20.0), 30);
        // gust below mean never goes negative
        assert_eq!(extra_width(5.0, 3.0), 0);
    }

    #[test]
    fn classify_combines_grade_and_width() {
        let severity = WindRefScorer.classify(&WindStats {
            average_direction: 250.0,
            variation_range: 70.0,
            average_speed: 1.0,
            max_gust: 6.0,
        });

        // base 2 + excess(5.0) 0.25 + variation(70, gust 6) 0.25 -> round(2.5) = 3
        assert_eq!(severity.color, SeverityColor::Red);
        assert_eq!(severity.extra_width, 15);
    }
}
