//! Monitor configuration validation.
//!
//! Applied by the storage layer before a monitor is saved, so the engine can
//! rely on sane intervals and timeouts when it polls.

use anyhow::{Result, anyhow};
use url::Url;

use super::types::Monitor;

pub const MIN_INTERVAL_SECONDS: u64 = 30;
pub const MAX_INTERVAL_SECONDS: u64 = 86_400;
pub const MIN_TIMEOUT_SECONDS: u64 = 5;
pub const MAX_TIMEOUT_SECONDS: u64 = 60;

/// Validate every configuration field the engine reads
pub fn validate_monitor(monitor: &Monitor) -> Result<()> {
    if monitor.name.trim().is_empty() {
        return Err(anyhow!("Monitor name must not be empty"));
    }
    validate_http_target(&monitor.url)?;
    validate_check_interval(monitor.interval_seconds)?;
    validate_timeout(monitor.timeout_seconds)?;
    Ok(())
}

/// Validate HTTP/HTTPS target
pub fn validate_http_target(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| anyhow!("Invalid URL: {}", e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Invalid scheme for HTTP monitor: {}", other)),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("URL has no host: {}", target));
    }

    if url.port() == Some(0) {
        return Err(anyhow!("Port 0 is not valid"));
    }

    Ok(())
}

pub fn validate_check_interval(interval_seconds: u64) -> Result<()> {
    if interval_seconds < MIN_INTERVAL_SECONDS {
        return Err(anyhow!(
            "Check interval too short: {} seconds (minimum: {})",
            interval_seconds,
            MIN_INTERVAL_SECONDS
        ));
    }

    if interval_seconds > MAX_INTERVAL_SECONDS {
        return Err(anyhow!(
            "Check interval too long: {} seconds (maximum: {})",
            interval_seconds,
            MAX_INTERVAL_SECONDS
        ));
    }

    Ok(())
}

pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&timeout_seconds) {
        return Err(anyhow!(
            "Timeout must be between {} and {} seconds, got {}",
            MIN_TIMEOUT_SECONDS,
            MAX_TIMEOUT_SECONDS,
            timeout_seconds
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_target() {
        assert!(validate_http_target("https://example.com").is_ok());
        assert!(validate_http_target("http://example.com:8080/health").is_ok());
        assert!(validate_http_target("http://127.0.0.1:3000").is_ok());

        assert!(validate_http_target("ftp://example.com").is_err());
        assert!(validate_http_target("not a url").is_err());
        assert!(validate_http_target("http://example.com:0").is_err());
    }

    #[test]
    fn test_validate_check_interval() {
        assert!(validate_check_interval(30).is_ok());
        assert!(validate_check_interval(60).is_ok());
        assert!(validate_check_interval(86_400).is_ok());

        assert!(validate_check_interval(29).is_err());
        assert!(validate_check_interval(100_000).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout(5).is_ok());
        assert!(validate_timeout(60).is_ok());
        assert!(validate_timeout(4).is_err());
        assert!(validate_timeout(61).is_err());
    }

    #[test]
    fn test_validate_monitor() {
        let monitor = Monitor::new("api", "https://example.com");
        assert!(validate_monitor(&monitor).is_ok());

        let monitor = Monitor::new("  ", "https://example.com");
        assert!(validate_monitor(&monitor).is_err());

        let monitor = Monitor::new("api", "https://example.com").with_timeout(120);
        assert!(validate_monitor(&monitor).is_err());
    }
}
