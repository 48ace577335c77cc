//! Core library for the `agrialert` CLI.
//!
//! This crate defines:
//! - The canonical weather model and condition classifier
//! - Daily forecast and period statistics aggregation
//! - Adapters normalizing each weather provider into that model
//! - Configuration, retry policy and crop alert rules
//!
//! It is used by `agrialert-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod alert;
pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod retry;
pub mod service;

pub use aggregate::{daily_forecast, hourly_outlook, period_statistics};
pub use alert::{Alert, AlertLevel, AlertThresholds, evaluate_alerts};
pub use condition::Condition;
pub use config::{Config, FetchConfig, ProviderConfig};
pub use error::FetchError;
pub use model::{
    CurrentConditions, ForecastDay, Location, Observation, Period, PeriodStatistics,
};
pub use provider::{ProviderId, ProviderSettings, WeatherProvider};
pub use retry::RetryPolicy;
pub use service::WeatherService;
