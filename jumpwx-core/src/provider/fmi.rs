//! FMI open data WFS client.
//!
//! Both station observations and edited point forecasts come from the same
//! WFS endpoint as `timevaluepair` documents: a set of
//! `wml2:MeasurementTimeseries` elements keyed by `gml:id`, one per
//! requested parameter, with aligned time steps. Missing values are literal
//! `NaN` strings and decode to `None`.
//!
//! Docs: <https://opendata.fmi.fi/wfs?service=WFS&version=2.0.0&request=describeStoredQueries&>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;

use super::{
    ForecastWindow, ObservationProvider, ProviderError, StationData, truncate_body,
};
use crate::model::{DataSource, Observation};

const WFS_URL: &str = "https://opendata.fmi.fi/wfs";
const SERVICE: &str = "FMI";

const OBSERVATION_QUERY: &str = "fmi::observations::weather::timevaluepair";
const FORECAST_QUERY: &str = "fmi::forecast::edited::weather::scandinavia::point::timevaluepair";

/// Observation parameters, also the `gml:id` suffixes of the result series.
const OBSERVATION_PARAMETERS: [&str; 5] = ["winddirection", "windspeedms", "windgust", "t2m", "td"];

const FORECAST_PARAMETERS: [&str; 8] = [
    "HourlyMaximumGust",
    "WindDirection",
    "WindSpeedMS",
    "LowCloudCover",
    "MiddleAndLowCloudCover",
    "Temperature",
    "DewPoint",
    // precipitation probability
    "PoP",
];

/// Forecast fetch result: the resolved place name plus the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastData {
    pub location_name: Option<String>,
    /// Oldest first, as forecast series are consumed.
    pub entries: Vec<Observation>,
}

#[derive(Debug, Clone)]
pub struct FmiProvider {
    http: Client,
}

impl Default for FmiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FmiProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    async fn wfs_get(
        &self,
        stored_query: &str,
        params: &[(&str, String)],
    ) -> Result<String, ProviderError> {
        let mut query: Vec<(&str, String)> = vec![
            ("request", "getFeature".to_owned()),
            ("storedquery_id", stored_query.to_owned()),
        ];
        query.extend_from_slice(params);

        let res = self
            .http
            .get(WFS_URL)
            .query(&query)
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

        Ok(body)
    }

    /// Edited point forecast for the given coordinates.
    pub async fn fetch_forecasts(
        &self,
        coordinates: (f64, f64),
        window: ForecastWindow,
    ) -> Result<ForecastData, ProviderError> {
        let params = [
            ("starttime", window.start.to_rfc3339()),
            ("endtime", window.end.to_rfc3339()),
            ("timestep", "10".to_owned()),
            ("parameters", FORECAST_PARAMETERS.join(",")),
            ("latlon", format!("{},{}", coordinates.0, coordinates.1)),
        ];

        let xml = self.wfs_get(FORECAST_QUERY, &params).await?;

        let series: Vec<Vec<(DateTime<Utc>, Option<f64>)>> = FORECAST_PARAMETERS
            .iter()
            .map(|param| parse_timeseries(&xml, &format!("mts-1-1-{param}")))
            .collect::<Result<_, _>>()?;

        let [gusts, directions, speeds, low_clouds, middle_clouds, temperatures, dew_points, pops] =
            <[_; 8]>::try_from(series).map_err(|_| ProviderError::Decode {
                service: SERVICE,
                message: "forecast series count mismatch".to_owned(),
            })?;

        let entries = gusts
            .iter()
            .enumerate()
            .map(|(i, (time, gust))| {
                let mut obs = Observation::new(*time, DataSource::Forecast);
                obs.gust = *gust;
                obs.direction = value_at(&directions, i);
                obs.speed = value_at(&speeds, i);
                obs.low_cloud_cover = value_at(&low_clouds, i);
                obs.middle_cloud_cover = value_at(&middle_clouds, i);
                obs.temperature = value_at(&temperatures, i);
                obs.dew_point = value_at(&dew_points, i);
                obs.rain_probability = value_at(&pops, i);
                obs
            })
            .collect();

        Ok(ForecastData { location_name: location_label(&xml), entries })
    }
}

#[async_trait]
impl ObservationProvider for FmiProvider {
    async fn fetch_observations(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
    ) -> Result<StationData, ProviderError> {
        let params = [
            ("starttime", start.to_rfc3339()),
            ("parameters", OBSERVATION_PARAMETERS.join(",")),
            ("fmisid", station_id.to_owned()),
        ];

        let xml = match self.wfs_get(OBSERVATION_QUERY, &params).await {
            Ok(xml) => xml,
            Err(ProviderError::Status { status: 404, .. }) => {
                return Err(ProviderError::StationNotFound { id: station_id.to_owned() });
            }
            Err(err) => return Err(err),
        };

        let name = station_name(&xml)
            .ok_or_else(|| ProviderError::StationNotFound { id: station_id.to_owned() })?;

        let directions = parse_timeseries(&xml, "obs-obs-1-1-winddirection")?;
        let speeds = parse_timeseries(&xml, "obs-obs-1-1-windspeedms")?;
        let gusts = parse_timeseries(&xml, "obs-obs-1-1-windgust")?;
        let temperatures = parse_timeseries(&xml, "obs-obs-1-1-t2m")?;
        let dew_points = parse_timeseries(&xml, "obs-obs-1-1-td")?;

        // series are aligned on the same time steps; gusts drive the zip
        let mut observations: Vec<Observation> = gusts
            .iter()
            .enumerate()
            .map(|(i, (time, gust))| {
                let mut obs = Observation::new(*time, DataSource::Fmi);
                obs.gust = *gust;
                obs.direction = value_at(&directions, i);
                obs.speed = value_at(&speeds, i);
                obs.temperature = value_at(&temperatures, i);
                obs.dew_point = value_at(&dew_points, i);
                obs
            })
            .collect();

        // newest first
        observations.reverse();

        Ok(StationData { name, coordinates: station_position(&xml), observations })
    }
}

fn value_at(series: &[(DateTime<Utc>, Option<f64>)], index: usize) -> Option<f64> {
    series.get(index).and_then(|(_, value)| *value)
}

fn attribute_value(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Extract the (time, value) points of the `wml2:MeasurementTimeseries`
/// with the given `gml:id`. Values that are absent or `NaN` become `None`.
pub(crate) fn parse_timeseries(
    xml: &str,
    id: &str,
) -> Result<Vec<(DateTime<Utc>, Option<f64>)>, ProviderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut in_series = false;
    let mut pending_time: Option<DateTime<Utc>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"MeasurementTimeseries" => {
                    in_series = attribute_value(&e, b"id").as_deref() == Some(id);
                }
                b"time" if in_series => {
                    let text = read_element_text(&mut reader, &e)?;
                    pending_time = DateTime::parse_from_rfc3339(text.trim())
                        .ok()
                        .map(|t| t.with_timezone(&Utc));
                }
                b"value" if in_series => {
                    let text = read_element_text(&mut reader, &e)?;
                    if let Some(time) = pending_time.take() {
                        let value = text.trim().parse::<f64>().ok().filter(|v| v.is_finite());
                        points.push((time, value));
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"MeasurementTimeseries" => {
                if in_series {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ProviderError::Decode { service: SERVICE, message: err.to_string() });
            }
            _ => {}
        }
    }

    Ok(points)
}

fn read_element_text(
    reader: &mut Reader<&[u8]>,
    element: &BytesStart<'_>,
) -> Result<String, ProviderError> {
    reader
        .read_text(element.name())
        .map(|text| text.into_owned())
        .map_err(|err| ProviderError::Decode { service: SERVICE, message: err.to_string() })
}

/// The station's human-readable name: the `gml:name` tagged with the
/// location-name code space.
pub(crate) fn station_name(xml: &str) -> Option<String> {
    first_text_where(xml, b"name", |e| {
        attribute_value(e, b"codeSpace")
            .is_some_and(|cs| cs == "http://xml.fmi.fi/namespace/locationcode/name")
    })
}

/// Station position from the first `gml:pos`: "lat lon" (possibly with an
/// elevation term that is ignored).
pub(crate) fn station_position(xml: &str) -> Option<(f64, f64)> {
    let text = first_text_where(xml, b"pos", |_| true)?;
    let mut parts = text.split_whitespace();
    let lat = parts.next()?.parse().ok()?;
    let lon = parts.next()?.parse().ok()?;
    Some((lat, lon))
}

/// "Name, Region" label of the forecast location.
pub(crate) fn location_label(xml: &str) -> Option<String> {
    let name = station_name(xml);
    let region = first_text_where(xml, b"region", |_| true);

    match (name, region) {
        (Some(name), Some(region)) => Some(format!("{name}, {region}")),
        (Some(name), None) => Some(name),
        (None, region) => region,
    }
}

fn first_text_where(
    xml: &str,
    local: &[u8],
    predicate: impl Fn(&BytesStart<'_>) -> bool,
) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == local && predicate(&e) => {
                return reader.read_text(e.name()).ok().map(|text| text.trim().to_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVATION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection
    xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:wml2="http://www.opengis.net/waterml/2.0"
    xmlns:gml="http://www.opengis.net/gml/3.2">
  <wfs:member>
    <gml:name codeSpace="http://xml.fmi.fi/namespace/locationcode/name">Kouvola Utti lentoasema</gml:name>
    <gml:pos>60.8964 26.9383 99.0</gml:pos>
    <wml2:MeasurementTimeseries gml:id="obs-obs-1-1-windgust">
      <wml2:point>
        <wml2:MeasurementTVP>
          <wml2:time>2024-06-01T11:50:00Z</wml2:time>
          <wml2:value>5.7</wml2:value>
        </wml2:MeasurementTVP>
      </wml2:point>
      <wml2:point>
        <wml2:MeasurementTVP>
          <wml2:time>2024-06-01T12:00:00Z</wml2:time>
          <wml2:value>NaN</wml2:value>
        </wml2:MeasurementTVP>
      </wml2:point>
    </wml2:MeasurementTimeseries>
    <wml2:MeasurementTimeseries gml:id="obs-obs-1-1-winddirection">
      <wml2:point>
        <wml2:MeasurementTVP>
          <wml2:time>2024-06-01T11:50:00Z</wml2:time>
          <wml2:value>245.0</wml2:value>
        </wml2:MeasurementTVP>
      </wml2:point>
      <wml2:point>
        <wml2:MeasurementTVP>
          <wml2:time>2024-06-01T12:00:00Z</wml2:time>
          <wml2:value>250.0</wml2:value>
        </wml2:MeasurementTVP>
      </wml2:point>
    </wml2:MeasurementTimeseries>
  </wfs:member>
</wfs:FeatureCollection>"#;

    #[test]
    fn parses_the_requested_series_only() {
        let gusts = parse_timeseries(OBSERVATION_XML, "obs-obs-1-1-windgust").unwrap();

        assert_eq!(gusts.len(), 2);
        assert_eq!(gusts[0].1, Some(5.7));
        assert_eq!(gusts[0].0.to_rfc3339(), "2024-06-01T11:50:00+00:00");
    }

    #[test]
    fn nan_values_decode_to_none() {
        let gusts = parse_timeseries(OBSERVATION_XML, "obs-obs-1-1-windgust").unwrap();
        assert_eq!(gusts[1].1, None);
    }

    #[test]
    fn unknown_series_id_is_empty_not_an_error() {
        let series = parse_timeseries(OBSERVATION_XML, "obs-obs-1-1-t2m").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn station_metadata_is_extracted() {
        assert_eq!(station_name(OBSERVATION_XML).as_deref(), Some("Kouvola Utti lentoasema"));

        let (lat, lon) = station_position(OBSERVATION_XML).unwrap();
        assert!((lat - 60.8964).abs() < 1e-9);
        assert!((lon - 26.9383).abs() < 1e-9);
    }

    #[test]
    fn location_label_joins_name_and_region() {
        let xml = r#"<collection>
            <name codeSpace="http://xml.fmi.fi/namespace/locationcode/name">Utti</name>
            <region>Kouvola</region>
        </collection>"#;

        assert_eq!(location_label(xml).as_deref(), Some("Utti, Kouvola"));
    }

    #[test]
    fn missing_station_name_yields_none() {
        assert_eq!(station_name("<a><name>plain</name></a>"), None);
    }
}
