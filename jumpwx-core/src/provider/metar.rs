//! METAR acquisition and decoding.
//!
//! Reports come from the flyk.com METAR collection (GeoJSON, one feature
//! per aerodrome). Only the groups this app consumes are decoded: report
//! time, the wind group, temperature/dew point and cloud layers. Everything
//! else in the report is carried verbatim in [`Metar::raw`].

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{ProviderError, truncate_body};
use crate::model::{CloudLayer, Metar, MetarWind, WindUnit};

const METARS_URL: &str = "https://flyk.com/api/metars.geojson";
const SERVICE: &str = "flyk";

#[derive(Debug, Clone)]
pub struct FlykMetars {
    http: Client,
}

impl Default for FlykMetars {
    fn default() -> Self {
        Self::new()
    }
}

impl FlykMetars {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// Newest METAR for the given aerodrome.
    pub async fn fetch(&self, icao: &str, now: DateTime<Utc>) -> Result<Vec<Metar>, ProviderError> {
        let res = self
            .http
            .get(METARS_URL)
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

        let collection: MetarCollection = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Decode { service: SERVICE, message: err.to_string() })?;

        let raw = collection
            .features
            .iter()
            .map(|f| f.properties.text.as_str())
            .find(|text| is_report_for(text, icao))
            .ok_or_else(|| ProviderError::MetarNotFound { icao: icao.to_owned() })?;

        let metar = decode(raw, now).ok_or_else(|| ProviderError::Decode {
            service: SERVICE,
            message: format!("undecodable METAR: {}", truncate_body(raw)),
        })?;

        Ok(vec![metar])
    }
}

/// Fetch METARs for an aerodrome with a fresh client.
pub async fn fetch_metars(icao: &str, now: DateTime<Utc>) -> Result<Vec<Metar>, ProviderError> {
    FlykMetars::new().fetch(icao, now).await
}

#[derive(Debug, Deserialize)]
struct MetarCollection {
    features: Vec<MetarFeature>,
}

#[derive(Debug, Deserialize)]
struct MetarFeature {
    properties: MetarProperties,
}

#[derive(Debug, Deserialize)]
struct MetarProperties {
    text: String,
}

fn is_report_for(text: &str, icao: &str) -> bool {
    ["METAR ", "SPECI "]
        .iter()
        .any(|prefix| {
            text.strip_prefix(prefix)
                .is_some_and(|rest| rest.strip_prefix(icao).is_some_and(|r| r.starts_with(' ')))
        })
}

/// Decode the groups of interest from a raw METAR.
///
/// `reference` anchors the day-of-month time group to a full date; a report
/// day ahead of the reference date rolls back to the previous month.
/// Returns `None` when the report has no usable time group.
pub fn decode(raw: &str, reference: DateTime<Utc>) -> Option<Metar> {
    let mut time = None;
    let mut wind = MetarWind { direction: None, speed: None, gust: None, unit: WindUnit::Knots };
    let mut temperature = None;
    let mut dew_point = None;
    let mut clouds = Vec::new();

    for token in raw.split_whitespace() {
        if time.is_none()
            && let Some(t) = parse_time_group(token, reference)
        {
            time = Some(t);
            continue;
        }

        if let Some(w) = parse_wind_group(token) {
            wind = w;
            continue;
        }

        if let Some(layer) = parse_cloud_group(token) {
            clouds.push(layer);
            continue;
        }

        if let Some((t, td)) = parse_temperature_group(token) {
            temperature = t;
            dew_point = td;
        }
    }

    Some(Metar { time: time?, raw: raw.to_owned(), wind, temperature, dew_point, clouds })
}

/// `ddhhmmZ`.
fn parse_time_group(token: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let digits = token.strip_suffix('Z')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let day: u32 = digits[0..2].parse().ok()?;
    let hour: u32 = digits[2..4].parse().ok()?;
    let minute: u32 = digits[4..6].parse().ok()?;

    let in_month = |date: chrono::NaiveDate| {
        date.with_day(day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .and_then(|naive| Utc.from_local_datetime(&naive).single())
    };

    let candidate = in_month(reference.date_naive())?;

    // a report can't be from the future; a day mismatch near month end
    // means the report belongs to the previous month
    if candidate > reference + chrono::Duration::days(1) {
        return in_month((reference - Months::new(1)).date_naive());
    }

    Some(candidate)
}

/// `dddff(f)KT`, `dddffGggKT`, `VRBffKT`, or the same with `MPS`.
fn parse_wind_group(token: &str) -> Option<MetarWind> {
    let (body, unit) = if let Some(body) = token.strip_suffix("KT") {
        (body, WindUnit::Knots)
    } else if let Some(body) = token.strip_suffix("MPS") {
        (body, WindUnit::Mps)
    } else {
        return None;
    };

    let (direction_part, rest) = body.split_at_checked(3)?;
    let direction = if direction_part == "VRB" {
        None
    } else {
        Some(direction_part.parse::<f64>().ok()?)
    };

    let (speed_part, gust_part) = match rest.split_once('G') {
        Some((speed, gust)) => (speed, Some(gust)),
        None => (rest, None),
    };

    let speed = speed_part.parse::<f64>().ok()?;
    let gust = match gust_part {
        Some(gust) => Some(gust.parse::<f64>().ok()?),
        None => None,
    };

    Some(MetarWind { direction, speed: Some(speed), gust, unit })
}

/// `FEWddd`, `SCTddd`, `BKNddd`, `OVCddd`, with an optional CB/TCU suffix.
/// The three digits are hundreds of feet above the aerodrome.
fn parse_cloud_group(token: &str) -> Option<CloudLayer> {
    let amount = ["FEW", "SCT", "BKN", "OVC"]
        .into_iter()
        .find(|amount| token.starts_with(amount))?;

    let digits = &token[amount.len()..];
    if digits.len() < 3 {
        return None;
    }

    let base: f64 = digits[0..3].parse().ok()?;
    Some(CloudLayer { amount: amount.to_owned(), base: base * 100.0, unit: "ft".to_owned() })
}

/// `tt/td` with `M` marking negative values, e.g. `15/08`, `M01/M04`.
/// A missing dew point (`15/`) is tolerated; anything else that merely
/// contains a slash (runway state groups, statute-mile visibility) is not a
/// temperature group and must not match.
#[allow(clippy::type_complexity)]
fn parse_temperature_group(token: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (t, td) = token.split_once('/')?;

    let parse = |part: &str| -> Option<f64> {
        let (negative, digits) = match part.strip_prefix('M') {
            Some(rest) => (true, rest),
            None => (false, part),
        };
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: f64 = digits.parse().ok()?;
        Some(if negative { -value } else { value })
    };

    let temperature = parse(t)?;
    let dew_point = parse(td);

    if dew_point.is_none() && !td.is_empty() {
        return None;
    }

    Some((Some(temperature), dew_point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn decodes_a_typical_report() {
        let metar =
            decode("METAR EFUT 011150Z 21010G25KT 9999 FEW015 BKN040 15/08 Q1013", reference())
                .unwrap();

        assert_eq!(metar.time, Utc.with_ymd_and_hms(2024, 6, 1, 11, 50, 0).unwrap());
        assert_eq!(metar.wind.direction, Some(210.0));
        assert_eq!(metar.wind.speed, Some(10.0));
        assert_eq!(metar.wind.gust, Some(25.0));
        assert_eq!(metar.wind.unit, WindUnit::Knots);
        assert_eq!(metar.temperature, Some(15.0));
        assert_eq!(metar.dew_point, Some(8.0));

        assert_eq!(metar.clouds.len(), 2);
        assert_eq!(metar.clouds[0].amount, "FEW");
        assert_eq!(metar.clouds[0].base, 1500.0);
        assert_eq!(metar.clouds[0].unit, "ft");
    }

    #[test]
    fn variable_wind_has_no_direction() {
        let metar = decode("METAR EFUT 011150Z VRB03KT CAVOK 18/09 Q1015", reference()).unwrap();
        assert_eq!(metar.wind.direction, None);
        assert_eq!(metar.wind.speed, Some(3.0));
        assert_eq!(metar.wind.gust, None);
        assert!(metar.clouds.is_empty());
    }

    #[test]
    fn mps_reports_keep_their_unit() {
        let metar = decode("METAR ULLI 011150Z 21004MPS 9999 OVC010 03/01 Q1002", reference())
            .unwrap();
        assert_eq!(metar.wind.unit, WindUnit::Mps);
        assert_eq!(metar.wind.speed_ms(), Some(4.0));
    }

    #[test]
    fn negative_temperatures_decode() {
        let metar = decode("METAR EFUT 011150Z 00000KT M01/M04 Q1021", reference()).unwrap();
        assert_eq!(metar.temperature, Some(-1.0));
        assert_eq!(metar.dew_point, Some(-4.0));
    }

    #[test]
    fn report_day_ahead_of_reference_rolls_back_a_month() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 0, 10, 0).unwrap();
        let metar = decode("METAR EFUT 312350Z 18005KT 12/10 Q1010", reference).unwrap();
        assert_eq!(metar.time, Utc.with_ymd_and_hms(2024, 5, 31, 23, 50, 0).unwrap());
    }

    #[test]
    fn report_without_a_time_group_is_rejected() {
        assert_eq!(decode("METAR EFUT 21010KT 15/08", reference()), None);
    }

    #[test]
    fn report_matching_is_exact_on_the_icao_code() {
        assert!(is_report_for("METAR EFUT 011150Z ...", "EFUT"));
        assert!(is_report_for("SPECI EFUT 011215Z ...", "EFUT"));
        assert!(!is_report_for("METAR EFUTX 011150Z ...", "EFUT"));
        assert!(!is_report_for("METAR EFHK 011150Z ...", "EFUT"));
    }
}
