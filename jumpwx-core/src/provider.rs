//! Upstream weather providers.
//!
//! Each module wraps one upstream service and normalizes its payload into
//! the shared [`Observation`]/[`Metar`]/[`AloftSample`] model. Upstream
//! "missing value" sentinels (`NaN`, `-1`, out-of-range temperatures) are
//! decoded to `None` here, at the boundary — nothing downstream ever sees
//! them.

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::aloft::AloftSample;
use crate::model::{Metar, Observation};
use crate::provider::{digitraffic::DigitrafficProvider, fmi::FmiProvider};

pub mod digitraffic;
pub mod fmi;
pub mod metar;
pub mod openmeteo;

/// Identifies a logical site and how to fetch data for it.
///
/// A site needs at least an observation station (`fmisid` or `roadsid`);
/// coordinates default to the station's own unless given explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpec {
    /// Display name. Falls back to the ICAO code or the station name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// FMI observation station id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmisid: Option<String>,
    /// Digitraffic road weather station id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadsid: Option<String>,
    /// Airport ICAO code for METAR reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao: Option<String>,
    /// Forecast coordinates (lat, lon) overriding the station's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latlon: Option<(f64, f64)>,
    /// How far back observations are fetched, hours.
    #[serde(default = "default_range_hours")]
    pub observation_range_hours: i64,
    /// How far ahead forecasts are fetched, hours.
    #[serde(default = "default_range_hours")]
    pub forecast_range_hours: i64,
}

fn default_range_hours() -> i64 {
    12
}

impl Default for SiteSpec {
    fn default() -> Self {
        Self {
            name: None,
            fmisid: None,
            roadsid: None,
            icao: None,
            latlon: None,
            observation_range_hours: default_range_hours(),
            forecast_range_hours: default_range_hours(),
        }
    }
}

impl SiteSpec {
    /// Best display name for the site.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.icao.as_deref())
    }
}

/// Errors from the upstream services.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned status {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("failed to decode {service} response: {message}")]
    Decode { service: &'static str, message: String },

    #[error("station {id} was not found")]
    StationNotFound { id: String },

    #[error("no METAR available for {icao}")]
    MetarNotFound { icao: String },

    #[error("no observation station configured; set an fmisid or a roadsid")]
    NoStation,

    #[error("no coordinates available; forecasts need a station position or explicit latlon")]
    NoCoordinates,
}

/// Keep upstream error bodies readable in terminal output.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}

/// Station metadata plus its normalized observation series, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct StationData {
    pub name: String,
    pub coordinates: Option<(f64, f64)>,
    pub observations: Vec<Observation>,
}

/// A source of point observations for one station.
#[async_trait]
pub trait ObservationProvider: Send + Sync + Debug {
    async fn fetch_observations(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
    ) -> Result<StationData, ProviderError>;
}

/// Pick the observation backend for a site.
pub fn provider_for_site(
    spec: &SiteSpec,
) -> Result<(Box<dyn ObservationProvider>, String), ProviderError> {
    if let Some(id) = &spec.fmisid {
        Ok((Box::new(FmiProvider::new()), id.clone()))
    } else if let Some(id) = &spec.roadsid {
        Ok((Box::new(DigitrafficProvider::new()), id.clone()))
    } else {
        Err(ProviderError::NoStation)
    }
}

/// Forecast fetch window in UTC, resolved by the caller.
///
/// The caller owns the clock and the local timezone; the providers only see
/// the resolved instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForecastWindow {
    /// Window for `day` days ahead.
    ///
    /// Day 0 runs from `now` for `range`; future days cover 07:00–21:00
    /// local time of that date (nobody jumps at night).
    pub fn for_day(now: DateTime<FixedOffset>, day: u32, range: Duration) -> Self {
        if day > 0 {
            let date = now.date_naive() + Days::new(u64::from(day));
            let tz = now.timezone();

            let bounds = date.and_hms_opt(7, 0, 0).zip(date.and_hms_opt(21, 0, 0)).and_then(
                |(start, end)| {
                    tz.from_local_datetime(&start)
                        .single()
                        .zip(tz.from_local_datetime(&end).single())
                },
            );

            if let Some((start, end)) = bounds {
                return Self { start: start.to_utc(), end: end.to_utc() };
            }
        }

        Self { start: now.to_utc(), end: (now + range).to_utc() }
    }
}

/// Everything fetched for one site, with per-section failures.
///
/// A section that failed stays empty and leaves a message in `errors`; one
/// broken upstream must not take the whole report down.
#[derive(Debug, Clone, Default)]
pub struct SiteReport {
    pub site_name: Option<String>,
    pub station_name: Option<String>,
    pub station_coordinates: Option<(f64, f64)>,
    pub forecast_location_name: Option<String>,
    /// Point observations, newest first.
    pub observations: Vec<Observation>,
    /// Forecast entries, oldest first.
    pub forecasts: Vec<Observation>,
    /// Decoded METAR reports, newest first.
    pub metars: Vec<Metar>,
    /// Hourly upper-air samples for today and tomorrow.
    pub winds_aloft: Vec<AloftSample>,
    pub errors: Vec<String>,
}

/// Fetch observations, METARs, forecasts and winds aloft for a site.
///
/// Observations are fetched first because the station position may be the
/// only source of coordinates; forecasts and upper-air data then go out in
/// parallel.
pub async fn fetch_site_report(
    spec: &SiteSpec,
    now: DateTime<Utc>,
    forecast_window: ForecastWindow,
) -> SiteReport {
    let mut report =
        SiteReport { site_name: spec.display_name().map(str::to_owned), ..SiteReport::default() };

    let observation_start = now - Duration::hours(spec.observation_range_hours);

    match provider_for_site(spec) {
        Ok((provider, station_id)) => {
            match provider.fetch_observations(&station_id, observation_start).await {
                Ok(data) => {
                    report.station_name = Some(data.name);
                    report.station_coordinates = data.coordinates;
                    report.observations = data.observations;
                }
                Err(err) => report.errors.push(format!("observations: {err}")),
            }
        }
        Err(err) => report.errors.push(err.to_string()),
    }

    if let Some(icao) = &spec.icao {
        match metar::fetch_metars(icao, now).await {
            Ok(metars) => report.metars = metars,
            Err(err) => report.errors.push(format!("metar: {err}")),
        }
    }

    let coordinates = spec.latlon.or(report.station_coordinates);
    match coordinates {
        Some(coordinates) => {
            let fmi = FmiProvider::new();
            let om = openmeteo::OpenMeteoProvider::new();

            let (forecasts, aloft) = tokio::join!(
                fmi.fetch_forecasts(coordinates, forecast_window),
                om.fetch_winds_aloft(coordinates),
            );

            match forecasts {
                Ok(data) => {
                    report.forecast_location_name = data.location_name;
                    report.forecasts = data.entries;
                }
                Err(err) => report.errors.push(format!("forecasts: {err}")),
            }

            match aloft {
                Ok(samples) => report.winds_aloft = samples,
                Err(err) => report.errors.push(format!("winds aloft: {err}")),
            }
        }
        None => report.errors.push(ProviderError::NoCoordinates.to_string()),
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_needs_a_station() {
        let err = provider_for_site(&SiteSpec::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NoStation));
    }

    #[test]
    fn fmisid_wins_over_roadsid() {
        let spec = SiteSpec {
            fmisid: Some("101191".into()),
            roadsid: Some("12028".into()),
            ..SiteSpec::default()
        };

        let (provider, id) = provider_for_site(&spec).unwrap();
        assert_eq!(id, "101191");
        assert!(format!("{provider:?}").contains("Fmi"));
    }

    #[test]
    fn forecast_window_today_starts_now() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T10:30:00+03:00").unwrap();
        let window = ForecastWindow::for_day(now, 0, Duration::hours(12));

        assert_eq!(window.start, now.to_utc());
        assert_eq!(window.end, now.to_utc() + Duration::hours(12));
    }

    #[test]
    fn forecast_window_future_day_is_daytime_local() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T10:30:00+03:00").unwrap();
        let window = ForecastWindow::for_day(now, 1, Duration::hours(12));

        // 07:00 and 21:00 at +03:00
        assert_eq!(window.start.to_rfc3339(), "2024-06-02T04:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2024-06-02T18:00:00+00:00");
    }

    #[test]
    fn site_spec_toml_roundtrip() {
        let spec = SiteSpec {
            name: Some("Utti".into()),
            fmisid: Some("101191".into()),
            icao: Some("EFUT".into()),
            ..SiteSpec::default()
        };

        let toml = toml::to_string(&spec).unwrap();
        let parsed: SiteSpec = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn missing_range_fields_fall_back_to_defaults() {
        let parsed: SiteSpec = toml::from_str("fmisid = \"101191\"").unwrap();
        assert_eq!(parsed.observation_range_hours, 12);
        assert_eq!(parsed.forecast_range_hours, 12);
    }
}
