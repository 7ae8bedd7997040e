//! Configuration validation.
//!
//! Serde handles syntax; this module checks meaning. All problems are
//! collected and returned together.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{ProxyConfig, TapConfig};
use crate::error::{ConfigError, ValidationError};

/// Validate a whole proxy configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if config.upstream.address.trim().is_empty() {
        errors.push(ValidationError::new("upstream.address", "must not be empty"));
    }

    if let Err(e) = collector_url(&config.tap) {
        errors.push(ValidationError::new("tap.collector_url", e.to_string()));
    }

    if config.tap.report_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "tap.report_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.tap.max_in_flight == Some(0) {
        errors.push(ValidationError::new(
            "tap.max_in_flight",
            "must be greater than 0 when set",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "{:?} is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Resolve the required collector destination.
pub fn collector_url(tap: &TapConfig) -> Result<Url, ConfigError> {
    let raw = match tap.collector_url.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ConfigError::MissingCollectorUrl),
    };

    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidCollectorUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidCollectorUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
