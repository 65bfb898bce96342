//! Plain-text rendering of the site report and derived indicators.

use chrono::{DateTime, NaiveDate, Utc};

use jumpwx_core::aloft::{self, AloftDay, AloftSample, PRESSURE_LEVELS};
use jumpwx_core::cloudbase::{self, Rounding};
use jumpwx_core::severity::{Scheme, WindVariations};
use jumpwx_core::trend;
use jumpwx_core::{Observation, SiteReport, SiteSpec};

/// The indicators derived from a fetched report.
#[derive(Debug)]
pub struct Derived {
    pub latest: Option<Observation>,
    pub variations: Option<WindVariations>,
    pub scheme: Scheme,
}

/// 16-wind compass point for a direction in degrees.
pub fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];

    let sector = (degrees.rem_euclid(360.0) / 22.5).round() as usize % 16;
    POINTS[sector]
}

fn round_to_five(degrees: f64) -> i64 {
    ((degrees / 5.0).round() * 5.0) as i64
}

fn age_minutes(time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - time).num_minutes()
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1} {unit}"),
        None => "-".to_string(),
    }
}

/// One-line summary of a site spec for `sites list`.
pub fn describe_site(spec: &SiteSpec) -> String {
    let mut parts = Vec::new();

    if let Some(fmisid) = &spec.fmisid {
        parts.push(format!("fmisid {fmisid}"));
    }
    if let Some(roadsid) = &spec.roadsid {
        parts.push(format!("roadsid {roadsid}"));
    }
    if let Some(icao) = &spec.icao {
        parts.push(format!("icao {icao}"));
    }
    if let Some((lat, lon)) = spec.latlon {
        parts.push(format!("latlon {lat},{lon}"));
    }

    parts.join(", ")
}

pub fn print_errors(errors: &[String]) {
    for error in errors {
        eprintln!("warning: {error}");
    }
}

/// Render the full report.
pub fn render(report: &SiteReport, derived: &Derived, now: DateTime<Utc>, today: NaiveDate) -> String {
    let mut out = String::new();

    let title = report
        .site_name
        .as_deref()
        .or(report.station_name.as_deref())
        .unwrap_or("Unknown site");
    out.push_str(&format!("# {title}\n"));

    if let Some(station) = &report.station_name {
        out.push_str(&format!("Station: {station}"));
        if let Some((lat, lon)) = report.station_coordinates {
            out.push_str(&format!(" ({lat:.4}, {lon:.4})"));
        }
        out.push('\n');
    }
    if let Some(location) = &report.forecast_location_name {
        out.push_str(&format!("Forecast location: {location}\n"));
    }
    out.push('\n');

    render_latest(&mut out, derived, now);
    render_variations(&mut out, derived);
    render_cloud_base(&mut out, derived);
    render_gust_trend(&mut out, report, derived, now);
    render_metars(&mut out, report);

    out.push('\n');
    out.push_str(&render_aloft_section(&report.winds_aloft, today));

    if !report.errors.is_empty() {
        out.push('\n');
        for error in &report.errors {
            out.push_str(&format!("warning: {error}\n"));
        }
    }

    out
}

fn render_latest(out: &mut String, derived: &Derived, now: DateTime<Utc>) {
    let Some(latest) = &derived.latest else {
        out.push_str("Latest wind: no usable observation\n");
        return;
    };

    let direction = latest
        .direction
        .map(|d| format!("{}° ({})", round_to_five(d), compass_point(d)))
        .unwrap_or_else(|| "-".to_string());

    out.push_str(&format!(
        "Latest wind: {} gusting {} from {direction}, {} min ago [{}]\n",
        format_optional(latest.speed, "m/s"),
        format_optional(latest.gust, "m/s"),
        age_minutes(latest.time, now),
        latest.source,
    ));

    if latest.temperature.is_some() || latest.dew_point.is_some() {
        out.push_str(&format!(
            "Temperature: {} / dew point {}\n",
            format_optional(latest.temperature, "°C"),
            format_optional(latest.dew_point, "°C"),
        ));
    }
}

fn render_variations(out: &mut String, derived: &Derived) {
    match &derived.variations {
        Some(v) => {
            out.push_str(&format!(
                "Wind variation ({}): {} — spread {:.0}° around {}° ({}), extra width {}\n",
                derived.scheme,
                v.color.label(),
                v.variation_range,
                round_to_five(v.average_direction),
                compass_point(v.average_direction),
                v.extra_width,
            ));
        }
        None => {
            // distinct no-data state; this must never look like calm
            out.push_str(&format!(
                "Wind variation ({}): insufficient recent wind data\n",
                derived.scheme
            ));
        }
    }
}

fn render_cloud_base(out: &mut String, derived: &Derived) {
    let estimate = derived.latest.as_ref().and_then(|latest| {
        latest
            .temperature
            .zip(latest.dew_point)
            .map(|(t, td)| cloudbase::estimate(t, td, Rounding::NearestHundred))
    });

    match estimate {
        Some(meters) => {
            out.push_str(&format!("Cloud base estimate: ~{meters:.0} m\n"));
        }
        None => out.push_str("Cloud base estimate: no temperature/dew point data\n"),
    }
}

fn render_gust_trend(out: &mut String, report: &SiteReport, derived: &Derived, now: DateTime<Utc>) {
    let Some(latest_gust) = derived.latest.as_ref().and_then(|o| o.gust) else {
        out.push_str("Gust trend: no gust observation\n");
        return;
    };

    let delta = trend::gust_trend(latest_gust, &report.forecasts, now, trend::default_horizon());
    out.push_str(&format!("Gust trend (next hour): {delta:+.1} m/s\n"));
}

fn render_metars(out: &mut String, report: &SiteReport) {
    for metar in &report.metars {
        out.push_str(&format!("METAR: {}\n", metar.raw));
        for cloud in &metar.clouds {
            out.push_str(&format!(
                "  cloud {} at {:.0} m\n",
                cloud.amount,
                cloud.base_meters()
            ));
        }
    }
}

/// Render the winds aloft tables for today and tomorrow.
pub fn render_aloft_section(samples: &[AloftSample], today: NaiveDate) -> String {
    if samples.is_empty() {
        return "Winds aloft: no data\n".to_string();
    }

    let mut out = String::new();
    out.push_str("Winds aloft (mean speed m/s / direction; + moderate, ^ high, ! very high)\n");

    out.push_str(&render_aloft_day("Today", &aloft::build_day(samples, today)));
    if let Some(tomorrow) = today.succ_opt() {
        out.push_str(&render_aloft_day("Tomorrow", &aloft::build_day(samples, tomorrow)));
    }

    out
}

fn render_aloft_day(label: &str, day: &AloftDay) -> String {
    let has_data =
        day.slots.iter().any(|slot| slot.cells.iter().any(Option::is_some));
    if !has_data {
        return format!("{label}: no data\n");
    }

    let mut out = format!("{label} ({})\n", day.date);

    out.push_str(&format!("{:>7}", "height"));
    for slot in &day.slots {
        out.push_str(&format!("{:>14}", format!("{:02}:00", slot.hour)));
    }
    out.push('\n');

    // highest altitude on top, like the jump run
    for (level_idx, level) in PRESSURE_LEVELS.iter().enumerate().rev() {
        out.push_str(&format!("{:>6}m", level.height_m));

        for slot in &day.slots {
            match &slot.cells[level_idx] {
                Some(cell) => {
                    let marker = match cell.class {
                        aloft::AloftClass::Low => ' ',
                        aloft::AloftClass::Medium => '+',
                        aloft::AloftClass::High => '^',
                        aloft::AloftClass::VeryHigh => '!',
                    };
                    out.push_str(&format!(
                        "{:>14}",
                        format!(
                            "{:.0}/{}°{}",
                            cell.speed_ms,
                            round_to_five(cell.direction_deg),
                            marker
                        )
                    ));
                }
                None => out.push_str(&format!("{:>14}", "-")),
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jumpwx_core::DataSource;
    use jumpwx_core::aloft::LevelWind;
    use jumpwx_core::severity::SeverityColor;

    #[test]
    fn compass_points() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(45.0), "NE");
        assert_eq!(compass_point(250.0), "WSW");
    }

    #[test]
    fn direction_rounding() {
        assert_eq!(round_to_five(247.4), 245);
        assert_eq!(round_to_five(248.0), 250);
    }

    fn derived(variations: Option<WindVariations>) -> Derived {
        Derived { latest: None, variations, scheme: Scheme::WindRef }
    }

    #[test]
    fn missing_variations_render_as_no_data_not_calm() {
        let mut out = String::new();
        render_variations(&mut out, &derived(None));

        assert!(out.contains("insufficient recent wind data"));
        assert!(!out.contains("calm"));
    }

    #[test]
    fn variations_render_tier_and_spread() {
        let mut out = String::new();
        render_variations(
            &mut out,
            &derived(Some(WindVariations {
                variation_range: 70.0,
                average_direction: 251.0,
                color: SeverityColor::Red,
                extra_width: 15,
            })),
        );

        assert!(out.contains("strong"));
        assert!(out.contains("spread 70°"));
        assert!(out.contains("250° (WSW)"));
    }

    #[test]
    fn full_report_renders_no_data_states() {
        let report = SiteReport::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let out = render(&report, &derived(None), now, now.date_naive());

        assert!(out.contains("no usable observation"));
        assert!(out.contains("Winds aloft: no data"));
    }

    #[test]
    fn aloft_table_renders_highest_level_first() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let sample = AloftSample {
            time: date.and_hms_opt(6, 0, 0).unwrap(),
            levels: [Some(LevelWind { speed_ms: 5.0, direction_deg: 250.0 }); 5],
        };

        let out = render_aloft_section(&[sample], date);
        let heights: Vec<usize> = ["4200m", "110m"]
            .iter()
            .map(|h| out.find(h).unwrap_or(usize::MAX))
            .collect();

        assert!(heights[0] < heights[1], "4200 m row must come before 110 m:\n{out}");
    }

    #[test]
    fn latest_observation_line_includes_source_and_age() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut obs = Observation::new(now - chrono::Duration::minutes(5), DataSource::Fmi);
        obs.speed = Some(4.0);
        obs.gust = Some(6.5);
        obs.direction = Some(251.0);

        let mut out = String::new();
        render_latest(
            &mut out,
            &Derived { latest: Some(obs), variations: None, scheme: Scheme::WindRef },
            now,
        );

        assert!(out.contains("4.0 m/s"));
        assert!(out.contains("6.5 m/s"));
        assert!(out.contains("5 min ago"));
        assert!(out.contains("[fmi]"));
    }
}
