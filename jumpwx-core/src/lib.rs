//! Core library for the `jumpwx` CLI.
//!
//! This crate defines:
//! - The normalized observation/forecast data model
//! - The derived jump condition indicators: wind variation severity,
//!   cloud base estimate, gust trend and the winds aloft table
//! - Upstream providers (FMI, Digitraffic, METAR, Open-Meteo)
//! - Configuration and saved sites
//!
//! The derived indicators are pure functions over in-memory snapshots: the
//! caller fetches a [`provider::SiteReport`], selects a window with
//! [`window`], and recomputes whatever it needs after every refresh. "Now"
//! is always an argument, never read from the clock inside the core.
//!
//! It is used by `jumpwx-cli`, but can also be reused by other binaries or
//! services.

pub mod aloft;
pub mod angles;
pub mod cloudbase;
pub mod config;
pub mod model;
pub mod provider;
pub mod severity;
pub mod trend;
pub mod window;

pub use config::Config;
pub use model::{DataSource, Metar, Observation};
pub use provider::{ProviderError, SiteReport, SiteSpec, fetch_site_report};
pub use severity::{Scheme, SeverityColor, WindVariations, wind_variations};
