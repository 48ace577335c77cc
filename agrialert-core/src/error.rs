//! Errors raised at the provider boundary.

use reqwest::StatusCode;
use thiserror::Error;

/// A provider fetch that did not produce usable data.
///
/// Callers can tell transient failures apart via [`FetchError::is_retryable`]
/// and show [`FetchError::user_message`] next to a retry action.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{provider} request failed: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} {endpoint} request failed with status {status}: {body}")]
    Status {
        provider: &'static str,
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("failed to parse {provider} {endpoint} response: {source}")]
    Parse {
        provider: &'static str,
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} response contained no {what}")]
    Empty {
        provider: &'static str,
        what: &'static str,
    },

    #[error("{0}")]
    Unsupported(String),
}

impl FetchError {
    /// Transport failures, rate limiting and server errors may go away on
    /// their own; everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Parse { .. } | Self::Empty { .. } | Self::Unsupported(_) => false,
        }
    }

    /// Short text suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => "Network error. Check your connection and try again.".into(),
            Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "The weather provider rejected the API key.".into()
            }
            Self::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                "Location not found.".into()
            }
            Self::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                "Too many requests. Please wait a moment and retry.".into()
            }
            Self::Status { .. } => "Failed to fetch weather data.".into(),
            Self::Parse { .. } | Self::Empty { .. } => {
                "The weather provider returned unexpected data.".into()
            }
            Self::Unsupported(msg) => msg.clone(),
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            provider: "openweather",
            endpoint: "forecast",
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn non_http_failures_are_final() {
        assert!(!FetchError::Unsupported("no history".into()).is_retryable());
        assert!(!FetchError::Empty { provider: "weatherapi", what: "hourly data" }.is_retryable());
    }

    #[test]
    fn user_messages() {
        assert!(status(401).user_message().contains("API key"));
        assert!(status(404).user_message().contains("not found"));
        assert!(status(500).user_message().contains("Failed to fetch"));
    }

    #[test]
    fn status_display_names_provider() {
        let msg = status(500).to_string();
        assert!(msg.contains("openweather forecast"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
