use agrialert_core::{
    Config, FetchError, Location, ProviderId, WeatherService, config::CONFIG_PATH_ENV,
};
use anyhow::{Context, bail};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password};
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "agrialert",
    version,
    about = "Weather, statistics and crop alerts for farmers"
)]
pub struct Cli {
    /// Provider to use instead of the configured default ("openweather" or "weatherapi").
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Print JSON instead of human-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show current conditions.
    Current {
        /// "lat,lon" or a place name.
        location: String,
    },

    /// Show the daily forecast.
    Forecast {
        location: String,

        /// Number of days; defaults to the configured forecast horizon.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show the next forecast samples.
    Hourly {
        location: String,

        /// Number of samples: hourly on WeatherAPI, 3-hourly on OpenWeather.
        #[arg(long, default_value_t = 8)]
        count: usize,
    },

    /// Show past weather, one row per day.
    History {
        location: String,

        /// First day (YYYY-MM-DD); defaults to 7 days ago.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Summarize weather over a date range.
    Stats {
        location: String,

        /// First day (YYYY-MM-DD); defaults to 30 days ago.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Evaluate crop alerts from current conditions and the forecast.
    Alerts {
        location: String,

        #[arg(long)]
        days: Option<u32>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure { provider } => configure(config, &provider),
            Command::Current { location } => {
                let service = service(&config, self.provider.as_deref())?;
                let current = service
                    .current(&Location::parse(&location))
                    .await
                    .map_err(fetch_failed)?;
                emit(self.json, &current, output::current)
            }
            Command::Forecast { location, days } => {
                let service = service(&config, self.provider.as_deref())?;
                let days = days.unwrap_or(service.forecast_days());
                let forecast = service
                    .daily_forecast(&Location::parse(&location), days)
                    .await
                    .map_err(fetch_failed)?;
                emit(self.json, &forecast, |f| output::forecast(f))
            }
            Command::Hourly { location, count } => {
                let service = service(&config, self.provider.as_deref())?;
                let samples = service
                    .hourly(&Location::parse(&location), count)
                    .await
                    .map_err(fetch_failed)?;
                emit(self.json, &samples, |s| output::hourly(s))
            }
            Command::History { location, start, end } => {
                let (start, end) = date_range(start, end, 7)?;
                let service = service(&config, self.provider.as_deref())?;
                let days = service
                    .history(&Location::parse(&location), start, end)
                    .await
                    .map_err(fetch_failed)?;
                emit(self.json, &days, |d| output::forecast(d))
            }
            Command::Stats { location, start, end } => {
                let (start, end) = date_range(start, end, 30)?;
                let service = service(&config, self.provider.as_deref())?;
                let stats = service
                    .statistics(&Location::parse(&location), start, end)
                    .await
                    .map_err(fetch_failed)?;
                emit(self.json, &stats, output::statistics)
            }
            Command::Alerts { location, days } => {
                let mut service = service(&config, self.provider.as_deref())?;
                if let Some(days) = days {
                    service = service.with_forecast_days(days);
                }
                let alerts =
                    service.alerts(&Location::parse(&location)).await.map_err(fetch_failed)?;
                emit(self.json, &alerts, |a| output::alerts(a))
            }
        }
    }
}

fn configure(mut config: Config, provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    if config.is_provider_configured(id) {
        let replace = Confirm::new(&format!("{id} already has an API key. Replace it?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;
        if !replace {
            println!("Kept the existing {id} API key.");
            return Ok(());
        }
    }

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    let had_default = config.default_provider.is_some();
    config.upsert_provider_api_key(id, api_key);

    let is_default = config.default_provider.as_deref() == Some(id.as_str());
    if had_default && !is_default {
        let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    let path = Config::config_file_path()?;
    info!(provider = %id, path = %path.display(), "configuration saved");
    println!(
        "Saved {id} credentials to {} (override with {CONFIG_PATH_ENV}).",
        path.display()
    );

    Ok(())
}

fn service(config: &Config, provider: Option<&str>) -> anyhow::Result<WeatherService> {
    let id = provider.map(ProviderId::try_from).transpose()?;
    WeatherService::from_config(config, id)
}

fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    default_span_days: i64,
) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or_else(|| Local::now().date_naive());
    let start = start.unwrap_or(end - Duration::days(default_span_days));

    if start > end {
        bail!("Start date {start} is after end date {end}");
    }

    Ok((start, end))
}

fn fetch_failed(err: FetchError) -> anyhow::Error {
    let hint = if err.is_retryable() {
        format!("{} Run the command again to retry.", err.user_message())
    } else {
        err.user_message()
    };
    anyhow::Error::new(err).context(hint)
}

fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    render: impl FnOnce(&T) -> Result<String, fmt::Error>,
) -> anyhow::Result<()> {
    if json {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{text}");
    } else {
        print!("{}", render(value).context("Failed to format output")?);
    }
    Ok(())
}
