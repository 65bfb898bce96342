//! Open-Meteo pressure-level forecast client for the winds aloft table.
//!
//! The request asks for site-local timestamps (`timezone=auto`) so the
//! three-hour display slots line up with the jumper's clock; speeds arrive
//! in km/h and are normalized to m/s here.

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use super::{ProviderError, truncate_body};
use crate::aloft::{AloftSample, LevelWind, PRESSURE_LEVELS};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const SERVICE: &str = "Open-Meteo";

const KMH_TO_MS: f64 = 1.0 / 3.6;

const HOURLY_PARAMETERS: &str = "windspeed_1000hPa,windspeed_925hPa,windspeed_850hPa,\
windspeed_700hPa,windspeed_600hPa,winddirection_1000hPa,winddirection_925hPa,\
winddirection_850hPa,winddirection_700hPa,winddirection_600hPa";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// Hourly upper-air samples for today and tomorrow at the coordinates.
    pub async fn fetch_winds_aloft(
        &self,
        coordinates: (f64, f64),
    ) -> Result<Vec<AloftSample>, ProviderError> {
        let res = self
            .http
            .get(FORECAST_URL)
            .query(&[
                ("latitude", coordinates.0.to_string()),
                ("longitude", coordinates.1.to_string()),
                ("hourly", HOURLY_PARAMETERS.to_owned()),
                ("timezone", "auto".to_owned()),
                ("forecast_days", "2".to_owned()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport { service: SERVICE, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Transport { service: SERVICE, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OmResponse = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Decode { service: SERVICE, message: err.to_string() })?;

        Ok(to_samples(&parsed.hourly))
    }
}

fn to_samples(hourly: &OmHourly) -> Vec<AloftSample> {
    hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let time = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M").ok()?;
            Some(AloftSample { time, levels: hourly.levels_at(i) })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    hourly: OmHourly,
}

/// Parallel hourly arrays, one per requested variable. A `null` in any array
/// simply leaves that level unset for the hour.
#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    #[serde(rename = "windspeed_1000hPa")]
    speed_1000: Vec<Option<f64>>,
    #[serde(rename = "windspeed_925hPa")]
    speed_925: Vec<Option<f64>>,
    #[serde(rename = "windspeed_850hPa")]
    speed_850: Vec<Option<f64>>,
    #[serde(rename = "windspeed_700hPa")]
    speed_700: Vec<Option<f64>>,
    #[serde(rename = "windspeed_600hPa")]
    speed_600: Vec<Option<f64>>,
    #[serde(rename = "winddirection_1000hPa")]
    direction_1000: Vec<Option<f64>>,
    #[serde(rename = "winddirection_925hPa")]
    direction_925: Vec<Option<f64>>,
    #[serde(rename = "winddirection_850hPa")]
    direction_850: Vec<Option<f64>>,
    #[serde(rename = "winddirection_700hPa")]
    direction_700: Vec<Option<f64>>,
    #[serde(rename = "winddirection_600hPa")]
    direction_600: Vec<Option<f64>>,
}

impl OmHourly {
    /// Wind per pressure level at hour `i`, in [`PRESSURE_LEVELS`] order.
    fn levels_at(&self, i: usize) -> [Option<LevelWind>; PRESSURE_LEVELS.len()] {
        let level = |speeds: &[Option<f64>], directions: &[Option<f64>]| {
            let speed_kmh = speeds.get(i).copied().flatten()?;
            let direction_deg = directions.get(i).copied().flatten()?;
            Some(LevelWind { speed_ms: speed_kmh * KMH_TO_MS, direction_deg })
        };

        [
            level(&self.speed_1000, &self.direction_1000),
            level(&self.speed_925, &self.direction_925),
            level(&self.speed_850, &self.direction_850),
            level(&self.speed_700, &self.direction_700),
            level(&self.speed_600, &self.direction_600),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "latitude": 60.9,
        "longitude": 26.9,
        "hourly": {
            "time": ["2024-06-01T06:00", "2024-06-01T07:00"],
            "windspeed_1000hPa": [18.0, null],
            "windspeed_925hPa": [27.0, 28.8],
            "windspeed_850hPa": [36.0, 37.8],
            "windspeed_700hPa": [45.0, 46.8],
            "windspeed_600hPa": [54.0, 55.8],
            "winddirection_1000hPa": [250.0, 251.0],
            "winddirection_925hPa": [255.0, 256.0],
            "winddirection_850hPa": [260.0, 261.0],
            "winddirection_700hPa": [265.0, 266.0],
            "winddirection_600hPa": [270.0, 271.0]
        }
    }"#;

    #[test]
    fn samples_are_normalized_to_ms() {
        let parsed: OmResponse = serde_json::from_str(RESPONSE).unwrap();
        let samples = to_samples(&parsed.hourly);

        assert_eq!(samples.len(), 2);

        let first = &samples[0];
        assert_eq!(first.time.format("%Y-%m-%dT%H:%M").to_string(), "2024-06-01T06:00");

        let surface = first.levels[0].unwrap();
        assert!((surface.speed_ms - 5.0).abs() < 1e-9);
        assert_eq!(surface.direction_deg, 250.0);

        let top = first.levels[4].unwrap();
        assert!((top.speed_ms - 15.0).abs() < 1e-9);
    }

    #[test]
    fn null_speed_leaves_the_level_unset() {
        let parsed: OmResponse = serde_json::from_str(RESPONSE).unwrap();
        let samples = to_samples(&parsed.hourly);

        assert_eq!(samples[1].levels[0], None);
        assert!(samples[1].levels[1].is_some());
    }
}
