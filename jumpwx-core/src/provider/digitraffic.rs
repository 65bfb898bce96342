//! Digitraffic road weather station client.
//!
//! Road stations report a current snapshot per sensor plus a separate
//! history endpoint. The sensors of interest are MAKSIMITUULI (gust),
//! KESKITUULI (mean wind), TUULENSUUNTA (direction), ILMA (temperature) and
//! KASTEPISTE (dew point); history rows are single sensor values that get
//! joined on their measurement time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ObservationProvider, ProviderError, StationData, truncate_body};
use crate::model::{DataSource, Observation};

const BASE_URL: &str = "https://tie.digitraffic.fi/api";
const SERVICE: &str = "Digitraffic";

/// Identification requested by the Digitraffic usage policy.
const USER_HEADER: (&str, &str) = ("Digitraffic-User", "jumpwx");

const SENSOR_GUST: &str = "MAKSIMITUULI";
const SENSOR_WIND: &str = "KESKITUULI";
const SENSOR_DIRECTION: &str = "TUULENSUUNTA";
const SENSOR_TEMPERATURE: &str = "ILMA";
const SENSOR_DEW_POINT: &str = "KASTEPISTE";

#[derive(Debug, Clone)]
pub struct DigitrafficProvider {
    http: Client,
}

impl Default for DigitrafficProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitrafficProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let res = self
            .http
            .get(url)
            .header(USER_HEADER.0, USER_HEADER.1)
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

        serde_json::from_str(&body)
            .map_err(|err| ProviderError::Decode { service: SERVICE, message: err.to_string() })
    }

    async fn fetch_station_info(&self, station_id: &str) -> Result<StationInfo, ProviderError> {
        match self.get_json(&format!("{BASE_URL}/weather/v1/stations/{station_id}")).await {
            Err(ProviderError::Status { status: 404, .. }) => {
                Err(ProviderError::StationNotFound { id: station_id.to_owned() })
            }
            other => other,
        }
    }

    async fn fetch_latest(&self, station_id: &str) -> Result<StationObservations, ProviderError> {
        self.get_json(&format!("{BASE_URL}/weather/v1/stations/{station_id}/data")).await
    }

    async fn fetch_history(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<HistoryValue>, ProviderError> {
        let url = format!(
            "{BASE_URL}/beta/weather-history-data/{station_id}?from={}",
            start.to_rfc3339()
        );
        self.get_json(&url).await
    }
}

#[async_trait]
impl ObservationProvider for DigitrafficProvider {
    async fn fetch_observations(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
    ) -> Result<StationData, ProviderError> {
        let (info, latest) = tokio::join!(
            self.fetch_station_info(station_id),
            self.fetch_latest(station_id),
        );
        let info = info?;
        let latest = latest?;

        let current = latest.to_observation();
        let gust_sensor = latest.sensor(SENSOR_GUST);

        let mut observations = vec![current];

        // history is best-effort; the current snapshot alone is usable
        if let Some(gust_sensor) = gust_sensor {
            match self.fetch_history(station_id, start).await {
                Ok(history) => {
                    observations.extend(join_history(&latest, gust_sensor.id, &history));
                }
                Err(err) => {
                    tracing::warn!(station_id, error = %err, "road station history unavailable");
                }
            }
        }

        Ok(StationData {
            name: info.display_name(),
            coordinates: info.position(),
            observations,
        })
    }
}

/// Join history rows into observations, newest first.
///
/// Gust rows define the series; every other sensor is matched to a gust row
/// by its exact measurement time.
fn join_history(
    latest: &StationObservations,
    gust_sensor_id: u64,
    history: &[HistoryValue],
) -> Vec<Observation> {
    let sensor_id = |name: &str| latest.sensor(name).map(|s| s.id);
    let wind_id = sensor_id(SENSOR_WIND);
    let direction_id = sensor_id(SENSOR_DIRECTION);
    let temperature_id = sensor_id(SENSOR_TEMPERATURE);
    let dew_point_id = sensor_id(SENSOR_DEW_POINT);

    let mut observations: Vec<Observation> = history
        .iter()
        .filter(|row| row.sensor_id == gust_sensor_id)
        .map(|gust_row| {
            let at_same_time = |id: Option<u64>| {
                id.and_then(|id| {
                    history
                        .iter()
                        .find(|row| row.sensor_id == id && row.measured_time == gust_row.measured_time)
                        .map(|row| row.sensor_value)
                })
            };

            let mut obs = Observation::new(gust_row.measured_time, DataSource::RoadStation);
            obs.gust = Some(gust_row.sensor_value);
            obs.speed = at_same_time(wind_id);
            obs.direction = at_same_time(direction_id);
            obs.temperature = at_same_time(temperature_id);
            obs.dew_point = at_same_time(dew_point_id);
            obs
        })
        .collect();

    observations.reverse();
    observations
}

#[derive(Debug, Deserialize)]
struct StationInfo {
    geometry: Geometry,
    properties: StationProperties,
}

impl StationInfo {
    fn display_name(&self) -> String {
        self.properties
            .names
            .fi
            .clone()
            .unwrap_or_else(|| self.properties.id.to_string())
    }

    /// GeoJSON order is (lon, lat); flipped here to the (lat, lon) the rest
    /// of the system uses.
    fn position(&self) -> Option<(f64, f64)> {
        match self.geometry.coordinates.as_slice() {
            [lon, lat, ..] => Some((*lat, *lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct StationProperties {
    id: u64,
    names: StationNames,
}

#[derive(Debug, Deserialize)]
struct StationNames {
    fi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationObservations {
    #[serde(rename = "dataUpdatedTime")]
    data_updated_time: DateTime<Utc>,
    #[serde(rename = "sensorValues")]
    sensor_values: Vec<SensorValue>,
}

impl StationObservations {
    fn sensor(&self, name: &str) -> Option<&SensorValue> {
        self.sensor_values.iter().find(|v| v.name == name)
    }

    fn to_observation(&self) -> Observation {
        let value = |name: &str| self.sensor(name).map(|s| s.value);

        let mut obs = Observation::new(self.data_updated_time, DataSource::RoadStation);
        obs.speed = value(SENSOR_WIND);
        obs.gust = value(SENSOR_GUST);
        obs.direction = value(SENSOR_DIRECTION);
        obs.temperature = value(SENSOR_TEMPERATURE);
        obs.dew_point = value(SENSOR_DEW_POINT);
        obs
    }
}

#[derive(Debug, Deserialize)]
struct SensorValue {
    id: u64,
    name: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryValue {
    #[serde(rename = "sensorId")]
    sensor_id: u64,
    #[serde(rename = "sensorValue")]
    sensor_value: f64,
    #[serde(rename = "measuredTime")]
    measured_time: DateTime<Utc>,
}
