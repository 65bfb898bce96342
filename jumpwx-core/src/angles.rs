//! Circular statistics over wind directions.
//!
//! Directions are degrees from north in `[0, 360)`. Plain arithmetic on them
//! breaks at the wraparound (the mean of 350° and 10° is 0°, not 180°), so
//! averaging goes through unit vectors and differences take the short way
//! around the circle.

/// Circular mean of the given directions, in `[0, 360)`.
///
/// Computed by summing the unit vectors of the inputs and taking the angle of
/// the resulting vector. Callers must pre-filter: the empty slice has no
/// meaningful mean (this returns `0.0` rather than `NaN`, but do not rely on
/// it).
pub fn mean_direction(directions: &[f64]) -> f64 {
    let sum_sin: f64 = directions.iter().map(|d| d.to_radians().sin()).sum();
    let sum_cos: f64 = directions.iter().map(|d| d.to_radians().cos()).sum();

    sum_sin.atan2(sum_cos).to_degrees().rem_euclid(360.0)
}

/// Minimum angular distance between two directions, in `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    diff.min(360.0 - diff)
}

/// Largest pairwise [`angular_difference`] within the given directions.
///
/// Zero for zero or one input. O(n²) over all unordered pairs, which is fine
/// for the intended inputs: a 30 minute observation window holds at most a
/// few dozen points.
pub fn variation_range(directions: &[f64]) -> f64 {
    let mut max_diff: f64 = 0.0;
    for (i, a) in directions.iter().enumerate() {
        for b in &directions[i + 1..] {
            max_diff = max_diff.max(angular_difference(*a, *b));
        }
    }
    max_diff
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn mean_direction_handles_wraparound() {
        let mean = mean_direction(&[350.0, 10.0]);
        // either side of north is acceptable, 180 is not
        assert!(mean < EPSILON || (360.0 - mean) < EPSILON, "got {mean}");
    }

    #[test]
    fn mean_direction_of_identical_inputs_is_the_input() {
        assert!((mean_direction(&[270.0, 270.0, 270.0]) - 270.0).abs() < EPSILON);
    }

    #[test]
    fn mean_direction_plain_average_when_no_wrap() {
        assert!((mean_direction(&[80.0, 100.0]) - 90.0).abs() < EPSILON);
    }

    #[test]
    fn mean_direction_stays_in_range() {
        for dirs in [&[0.0, 0.0][..], &[359.9, 0.1], &[180.0], &[90.0, 270.1]] {
            let mean = mean_direction(dirs);
            assert!((0.0..360.0).contains(&mean), "mean {mean} for {dirs:?}");
        }
    }

    #[test]
    fn angular_difference_takes_the_short_way() {
        assert_eq!(angular_difference(0.0, 0.0), 0.0);
        assert_eq!(angular_difference(0.0, 90.0), 90.0);
        assert_eq!(angular_difference(0.0, 180.0), 180.0);
        assert_eq!(angular_difference(0.0, 270.0), 90.0);
        assert_eq!(angular_difference(350.0, 10.0), 20.0);
        assert_eq!(angular_difference(10.0, 350.0), 20.0);
    }

    #[test]
    fn variation_range_degenerate_inputs() {
        assert_eq!(variation_range(&[]), 0.0);
        assert_eq!(variation_range(&[123.0]), 0.0);
    }

    #[test]
    fn variation_range_finds_the_widest_pair() {
        // 200 vs 270 is the widest pair, not the wrapped 270 vs 0
        assert_eq!(variation_range(&[270.0, 270.0, 200.0]), 70.0);
        assert_eq!(variation_range(&[350.0, 10.0]), 20.0);
    }

    #[test]
    fn variation_range_is_bounded() {
        let inputs = [
            vec![0.0, 90.0, 180.0, 270.0],
            vec![0.0, 180.0],
            vec![359.0, 1.0, 180.0, 90.0, 270.0],
        ];
        for dirs in inputs {
            let range = variation_range(&dirs);
            assert!((0.0..=180.0).contains(&range), "range {range} for {dirs:?}");
        }
    }
}
