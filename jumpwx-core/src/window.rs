//! Selection of the observation window the wind computations run on.

use chrono::{DateTime, Duration, Utc};

use crate::model::{DataSource, Metar, Observation};

/// Canonical recency window for wind variation analysis.
pub fn default_window() -> Duration {
    Duration::minutes(30)
}

/// Select the observations the derived wind computations may use.
///
/// Keeps entries that are no older than `window` relative to `now` and that
/// carry valid wind data (direction, speed and gust all present). The result
/// may be empty; callers treat that as "insufficient data", never as calm.
///
/// `now` is passed in rather than read from the clock so the selection is a
/// pure function of its arguments.
pub fn select_recent_valid(
    observations: &[Observation],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Observation> {
    let cutoff = now - window;
    observations
        .iter()
        .filter(|obs| obs.time >= cutoff && obs.has_valid_wind())
        .cloned()
        .collect()
}

/// Like [`select_recent_valid`] but without the recency cut.
///
/// Explicit debug override for inspecting a whole fetched series; invalid
/// wind entries are still dropped. Callers must opt in deliberately, there is
/// no silent fallback to this.
pub fn select_all_valid(observations: &[Observation]) -> Vec<Observation> {
    observations.iter().filter(|obs| obs.has_valid_wind()).cloned().collect()
}

/// The newest usable point observation, falling back to METAR data.
///
/// `observations` is expected newest first, as the providers return it. If
/// the newest station observation has valid wind data it wins. Otherwise an
/// observation is synthesized from the newest METAR (knots converted to m/s,
/// temperature and dew point backfilled from the station when the METAR
/// lacks them). Returns `None` when neither source has usable wind.
pub fn latest_observation(observations: &[Observation], metars: &[Metar]) -> Option<Observation> {
    let newest = observations.first();

    if let Some(obs) = newest
        && obs.has_valid_wind()
    {
        return Some(obs.clone());
    }

    let metar = metars.first()?;

    let mut from_metar = Observation::new(metar.time, DataSource::Metar);
    from_metar.direction = metar.wind.direction;
    from_metar.speed = metar.wind.speed_ms();
    from_metar.gust = metar.wind.gust_ms();
    from_metar.temperature = newest.and_then(|o| o.temperature).or(metar.temperature);
    from_metar.dew_point = newest.and_then(|o| o.dew_point).or(metar.dew_point);

    from_metar.has_valid_wind().then_some(from_metar)
}
