//! Short-term gust trend: forecast average versus the latest observation.

use chrono::{DateTime, Duration, Utc};

use crate::model::Observation;

/// Canonical forecast horizon for the trend.
pub fn default_horizon() -> Duration {
    Duration::hours(1)
}

/// Signed gust trend in m/s.
///
/// Averages the gusts of the forecast entries up to `now + horizon`
/// (entries without a gust are skipped entirely) and returns
/// `average - latest_gust`: positive means the wind is forecast to
/// strengthen, negative to weaken. With no forecast entries inside the
/// horizon the trend is a neutral `0.0`, never an error.
pub fn gust_trend(
    latest_gust: f64,
    forecasts: &[Observation],
    now: DateTime<Utc>,
    horizon: Duration,
) -> f64 {
    let max_time = now + horizon;

    let gusts: Vec<f64> =
        forecasts.iter().filter(|f| f.time <= max_time).filter_map(|f| f.gust).collect();

    if gusts.is_empty() {
        return 0.0;
    }

    let average = gusts.iter().sum::<f64>() / gusts.len() as f64;
    average - latest_gust
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataSource;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn forecast(minutes_ahead: i64, gust: Option<f64>) -> Observation {
        let mut obs =
            Observation::new(now() + Duration::minutes(minutes_ahead), DataSource::Forecast);
        obs.gust = gust;
        obs
    }

    #[test]
    fn no_forecasts_is_a_neutral_trend() {
        assert_eq!(gust_trend(5.0, &[], now(), default_horizon()), 0.0);
    }

    #[test]
    fn single_entry_trend() {
        let trend = gust_trend(5.0, &[forecast(10, Some(7.0))], now(), default_horizon());
        assert_eq!(trend, 2.0);
    }

    #[test]
    fn entries_beyond_the_horizon_are_ignored() {
        let forecasts = [forecast(30, Some(6.0)), forecast(90, Some(20.0))];
        let trend = gust_trend(5.0, &forecasts, now(), default_horizon());
        assert_eq!(trend, 1.0);
    }

    #[test]
    fn missing_gusts_do_not_dilute_the_average() {
        let forecasts = [forecast(10, Some(8.0)), forecast(20, None), forecast(30, Some(6.0))];
        let trend = gust_trend(5.0, &forecasts, now(), default_horizon());
        assert_eq!(trend, 2.0);
    }

    #[test]
    fn only_missing_gusts_is_a_neutral_trend() {
        let forecasts = [forecast(10, None), forecast(20, None)];
        assert_eq!(gust_trend(5.0, &forecasts, now(), default_horizon()), 0.0);
    }

    #[test]
    fn weakening_wind_gives_a_negative_trend() {
        let trend = gust_trend(9.0, &[forecast(10, Some(4.0))], now(), default_horizon());
        assert_eq!(trend, -5.0);
    }
}
