use anyhow::{Context, Result, anyhow, bail};
use chrono::{Duration, Local, Utc};
use clap::{Args, Parser, Subcommand};

use jumpwx_core::provider::{ForecastWindow, fetch_site_report};
use jumpwx_core::severity::Scheme;
use jumpwx_core::{Config, DataSource, Observation, SiteSpec, wind_variations, window};

use crate::report;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "jumpwx", version, about = "Drop zone weather and jump condition CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Flags identifying a site. Either a saved site by name or an ad-hoc one
/// from station ids.
#[derive(Debug, Args, Default)]
pub struct SiteArgs {
    /// Saved site name.
    #[arg(long)]
    pub site: Option<String>,

    /// FMI observation station id, e.g. 101191.
    #[arg(long)]
    pub fmisid: Option<String>,

    /// Digitraffic road weather station id.
    #[arg(long)]
    pub roadsid: Option<String>,

    /// Airport ICAO code for METAR reports, e.g. EFUT.
    #[arg(long)]
    pub icao: Option<String>,

    /// Forecast coordinates as "lat,lon", overriding the station position.
    #[arg(long)]
    pub latlon: Option<String>,

    /// Display name for the site.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the jump condition report for a site.
    Show {
        #[command(flatten)]
        site: SiteArgs,

        /// Severity scheme: "gust-ratio" or "wind-ref". Defaults to the
        /// configured scheme.
        #[arg(long)]
        scheme: Option<String>,

        /// Observation window for the wind variation analysis, minutes.
        #[arg(long, default_value_t = 30)]
        window_min: i64,

        /// Analyze every fetched observation instead of the recent window.
        #[arg(long)]
        all_observations: bool,

        /// Forecast day: 0 = today, 1 = tomorrow, ...
        #[arg(long, default_value_t = 0)]
        forecast_day: u32,

        /// Replace the newest observation with "gust,speed,direction"
        /// for trying out the severity output.
        #[arg(long, value_name = "GUST,SPEED,DIR")]
        mock_wind: Option<String>,
    },

    /// Show only the winds aloft table for a site.
    Aloft {
        #[command(flatten)]
        site: SiteArgs,
    },

    /// Manage saved sites.
    Sites {
        #[command(subcommand)]
        command: SitesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List saved sites.
    List,

    /// Save a site under a name.
    Save {
        name: String,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Remove a saved site.
    Remove { name: String },
}

impl SiteArgs {
    fn has_station(&self) -> bool {
        self.fmisid.is_some() || self.roadsid.is_some()
    }

    /// Build an ad-hoc site spec from the flags alone.
    fn to_spec(&self) -> Result<SiteSpec> {
        let latlon = self.latlon.as_deref().map(parse_latlon).transpose()?;

        Ok(SiteSpec {
            name: self.name.clone(),
            fmisid: self.fmisid.clone(),
            roadsid: self.roadsid.clone(),
            icao: self.icao.clone(),
            latlon,
            ..SiteSpec::default()
        })
    }
}

fn parse_latlon(value: &str) -> Result<(f64, f64)> {
    let (lat, lon) =
        value.split_once(',').ok_or_else(|| anyhow!("Expected \"lat,lon\", got '{value}'"))?;

    Ok((
        lat.trim().parse().with_context(|| format!("Invalid latitude '{lat}'"))?,
        lon.trim().parse().with_context(|| format!("Invalid longitude '{lon}'"))?,
    ))
}

/// Resolve the site to operate on: explicit flags, a saved site by name,
/// the configured default, or an interactive pick over the saved sites.
fn resolve_site(config: &Config, args: &SiteArgs) -> Result<SiteSpec> {
    if args.has_station() {
        return args.to_spec();
    }

    if let Some(name) = &args.site {
        let mut spec = config
            .site(name)
            .cloned()
            .ok_or_else(|| anyhow!("No saved site named '{name}'. See `jumpwx sites list`."))?;
        if spec.name.is_none() {
            spec.name = Some(name.clone());
        }
        return Ok(spec);
    }

    if let Some((name, spec)) = config.implicit_site() {
        let mut spec = spec.clone();
        if spec.name.is_none() {
            spec.name = Some(name.to_string());
        }
        return Ok(spec);
    }

    let names = config.site_names();
    if names.is_empty() {
        bail!(
            "No site given and no saved sites.\n\
             Hint: run `jumpwx sites save <name> --fmisid <id>` first, or pass --fmisid/--roadsid directly."
        );
    }

    let picked = inquire::Select::new("Which site?", names)
        .prompt()
        .context("Site selection cancelled")?;

    resolve_site(config, &SiteArgs { site: Some(picked.to_string()), ..SiteArgs::default() })
}

/// "gust,speed,direction" for the mock observation override.
fn parse_mock_wind(value: &str) -> Result<(f64, f64, f64)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [gust, speed, direction] = parts.as_slice() else {
        bail!("Expected \"gust,speed,direction\", got '{value}'");
    };

    Ok((
        gust.parse().with_context(|| format!("Invalid gust '{gust}'"))?,
        speed.parse().with_context(|| format!("Invalid speed '{speed}'"))?,
        direction.parse().with_context(|| format!("Invalid direction '{direction}'"))?,
    ))
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Show {
                site,
                scheme,
                window_min,
                all_observations,
                forecast_day,
                mock_wind,
            } => show(site, scheme, window_min, all_observations, forecast_day, mock_wind).await,
            Command::Aloft { site } => aloft(site).await,
            Command::Sites { command } => sites(command),
        }
    }
}

async fn show(
    site: SiteArgs,
    scheme: Option<String>,
    window_min: i64,
    all_observations: bool,
    forecast_day: u32,
    mock_wind: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let spec = resolve_site(&config, &site)?;

    let scheme = match scheme.as_deref() {
        Some(s) => Scheme::try_from(s)?,
        None => config.scheme()?,
    };

    let now_local = Local::now();
    let now = now_local.with_timezone(&Utc);
    let forecast_window = ForecastWindow::for_day(
        now_local.fixed_offset(),
        forecast_day,
        Duration::hours(spec.forecast_range_hours),
    );

    let mut report = fetch_site_report(&spec, now, forecast_window).await;
    tracing::debug!(
        observations = report.observations.len(),
        forecasts = report.forecasts.len(),
        metars = report.metars.len(),
        errors = report.errors.len(),
        "fetched site data"
    );

    if let Some(mock) = mock_wind.as_deref() {
        let (gust, speed, direction) = parse_mock_wind(mock)?;
        let mut obs = Observation::new(now, DataSource::Mock);
        obs.gust = Some(gust);
        obs.speed = Some(speed);
        obs.direction = Some(direction);
        report.observations.insert(0, obs);
    }

    let analysis_window = if all_observations {
        window::select_all_valid(&report.observations)
    } else {
        window::select_recent_valid(&report.observations, now, Duration::minutes(window_min))
    };

    let derived = report::Derived {
        latest: window::latest_observation(&report.observations, &report.metars),
        variations: wind_variations(&analysis_window, scheme),
        scheme,
    };

    print!("{}", report::render(&report, &derived, now, now_local.date_naive()));
    Ok(())
}

async fn aloft(site: SiteArgs) -> Result<()> {
    let config = Config::load()?;
    let spec = resolve_site(&config, &site)?;

    let now_local = Local::now();
    let now = now_local.with_timezone(&Utc);
    let forecast_window = ForecastWindow::for_day(now_local.fixed_offset(), 0, Duration::hours(1));

    let report = fetch_site_report(&spec, now, forecast_window).await;

    print!("{}", report::render_aloft_section(&report.winds_aloft, now_local.date_naive()));
    report::print_errors(&report.errors);
    Ok(())
}

fn sites(command: SitesCommand) -> Result<()> {
    let mut config = Config::load()?;

    match command {
        SitesCommand::List => {
            if config.sites.is_empty() {
                println!("No saved sites.");
            }
            for (name, spec) in &config.sites {
                let default_marker =
                    if config.default_site.as_deref() == Some(name) { " (default)" } else { "" };
                println!("{name}{default_marker}: {}", report::describe_site(spec));
            }
        }

        SitesCommand::Save { name, site } => {
            if !site.has_station() {
                bail!("A site needs --fmisid or --roadsid to be saved.");
            }
            config.save_site(&name, site.to_spec()?);
            config.save()?;
            println!("Saved site '{name}'.");
        }

        SitesCommand::Remove { name } => {
            if !config.remove_site(&name) {
                bail!("No saved site named '{name}'.");
            }
            config.save()?;
            println!("Removed site '{name}'.");
        }
    }

    Ok(())
}
