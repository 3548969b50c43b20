//! Validation helpers and parsing utilities for environment values.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn parse_socket_addr(field: &'static str, value: &str) -> ConfigResult<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, value, "invalid_socket_addr"))
}

pub(crate) fn parse_positive_usize(field: &'static str, value: &str) -> ConfigResult<usize> {
    let parsed: usize = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, value, "not_an_integer"))?;
    if parsed == 0 {
        return Err(ConfigError::invalid(field, value, "zero"));
    }
    Ok(parsed)
}

pub(crate) fn parse_deadline_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, value, "not_an_integer"))?;
    if secs == 0 {
        return Err(ConfigError::invalid(field, value, "zero"));
    }
    Ok(Duration::from_secs(secs))
}

pub(crate) fn parse_bool(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value, "not_a_boolean")),
    }
}

/// Collaborator addresses are `host:port`; the scheme is added by the client.
pub(crate) fn validate_collaborator_address(
    field: &'static str,
    value: &str,
) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, value, "empty"));
    }
    if trimmed.contains("://") {
        return Err(ConfigError::invalid(field, value, "scheme_not_allowed"));
    }
    let Some((host, port)) = trimmed.rsplit_once(':') else {
        return Err(ConfigError::invalid(field, value, "missing_port"));
    };
    if host.is_empty() || !matches!(port.parse::<u16>(), Ok(port) if port != 0) {
        return Err(ConfigError::invalid(field, value, "invalid_port"));
    }
    Ok(trimmed.to_string())
}
