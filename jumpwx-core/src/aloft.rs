//! Winds aloft: upper-air wind table derived from pressure-level forecasts.
//!
//! The Open-Meteo model reports wind at five pressure levels that map to the
//! altitudes a jumper passes through: roughly 110 m and 800 m under canopy,
//! 1500–4200 m in free fall. The table shows today and tomorrow in three-hour
//! slots, each slot averaging the model's hourly values.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::angles;

/// Altitude band a pressure level belongs to. The speed tolerance differs:
/// a canopy overhead cares about much weaker wind than a free faller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AltitudeBand {
    Canopy,
    FreeFall,
}

/// One pressure level of the upper-air model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureLevel {
    pub hpa: u16,
    /// Nominal height of the level, meters.
    pub height_m: u32,
    pub band: AltitudeBand,
}

/// The levels the table reports, surface first.
pub const PRESSURE_LEVELS: [PressureLevel; 5] = [
    PressureLevel { hpa: 1000, height_m: 110, band: AltitudeBand::Canopy },
    PressureLevel { hpa: 925, height_m: 800, band: AltitudeBand::Canopy },
    PressureLevel { hpa: 850, height_m: 1500, band: AltitudeBand::FreeFall },
    PressureLevel { hpa: 700, height_m: 3000, band: AltitudeBand::FreeFall },
    PressureLevel { hpa: 600, height_m: 4200, band: AltitudeBand::FreeFall },
];

/// Local starting hours of the table columns.
pub const TIME_SLOTS: [u32; 6] = [6, 9, 12, 15, 18, 21];

/// Four-tier class for one table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AloftClass {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AloftClass {
    pub fn label(&self) -> &'static str {
        match self {
            AloftClass::Low => "low",
            AloftClass::Medium => "medium",
            AloftClass::High => "high",
            AloftClass::VeryHigh => "very high",
        }
    }
}

/// Classify a level-mean wind speed for its altitude band.
pub fn speed_class(speed_ms: f64, band: AltitudeBand) -> AloftClass {
    match band {
        AltitudeBand::Canopy => {
            if speed_ms < 8.0 {
                AloftClass::Low
            } else if speed_ms < 11.0 {
                AloftClass::Medium
            } else if speed_ms < 13.0 {
                AloftClass::High
            } else {
                AloftClass::VeryHigh
            }
        }
        AltitudeBand::FreeFall => {
            if speed_ms < 8.0 {
                AloftClass::Low
            } else if speed_ms < 13.0 {
                AloftClass::Medium
            } else if speed_ms < 18.0 {
                AloftClass::High
            } else {
                AloftClass::VeryHigh
            }
        }
    }
}

/// Wind at one pressure level at one model hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelWind {
    pub speed_ms: f64,
    pub direction_deg: f64,
}

/// One hourly sample of the upper-air model, all levels.
///
/// Times are naive local time at the site, as the upstream reports them;
/// `levels` follows the [`PRESSURE_LEVELS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct AloftSample {
    pub time: NaiveDateTime,
    pub levels: [Option<LevelWind>; PRESSURE_LEVELS.len()],
}

/// Averaged wind for one (slot, level) table cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AloftCell {
    pub speed_ms: f64,
    /// Circular mean of the slot's directions.
    pub direction_deg: f64,
    pub class: AloftClass,
}

/// One table column: a three-hour slot of a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct AloftSlot {
    pub hour: u32,
    pub cells: [Option<AloftCell>; PRESSURE_LEVELS.len()],
}

/// The winds-aloft table for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct AloftDay {
    pub date: NaiveDate,
    pub slots: Vec<AloftSlot>,
}

/// Build the table for `date`.
///
/// Each slot averages the samples at hours `h`, `h+3` and `h+6` (mod 24) of
/// the target date, matching how the model's three-hourly blocks straddle
/// the displayed columns. Directions use the circular mean. A cell with no
/// samples stays `None`.
pub fn build_day(samples: &[AloftSample], date: NaiveDate) -> AloftDay {
    let slots = TIME_SLOTS
        .iter()
        .map(|&hour| {
            let hours = [hour, (hour + 3) % 24, (hour + 6) % 24];
            let slot_samples: Vec<&AloftSample> = samples
                .iter()
                .filter(|s| s.time.date() == date && hours.contains(&s.time.hour()))
                .collect();

            AloftSlot { hour, cells: slot_cells(&slot_samples) }
        })
        .collect();

    AloftDay { date, slots }
}

fn slot_cells(samples: &[&AloftSample]) -> [Option<AloftCell>; PRESSURE_LEVELS.len()] {
    std::array::from_fn(|level_idx| {
        let winds: Vec<LevelWind> =
            samples.iter().filter_map(|s| s.levels[level_idx]).collect();

        if winds.is_empty() {
            return None;
        }

        let speed_ms = winds.iter().map(|w| w.speed_ms).sum::<f64>() / winds.len() as f64;
        let directions: Vec<f64> = winds.iter().map(|w| w.direction_deg).collect();

        Some(AloftCell {
            speed_ms,
            direction_deg: angles::mean_direction(&directions),
            class: speed_class(speed_ms, PRESSURE_LEVELS[level_idx].band),
        })
    })
}
