use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Persisted state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    /// Only `up` and `down` monitors are polled
    pub fn is_pollable(self) -> bool {
        matches!(self, MonitorStatus::Up | MonitorStatus::Down)
    }

    /// Classification of a completed check
    pub fn from_success(success: bool) -> Self {
        if success { MonitorStatus::Up } else { MonitorStatus::Down }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "paused" => Ok(MonitorStatus::Paused),
            other => Err(anyhow::anyhow!("Unknown monitor status: {}", other)),
        }
    }
}

/// Direct alert destinations configured on a monitor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTargets {
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub phone: Vec<String>,
    #[serde(default)]
    pub webhook: Vec<String>,
}

/// A configured HTTP/HTTPS target polled on an interval.
///
/// The engine only reads the configuration fields and writes `status` and
/// `last_check`; everything else belongs to the management layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// Poll interval in seconds
    pub interval_seconds: u64,
    /// Per-attempt timeout in seconds
    pub timeout_seconds: u64,
    pub status: MonitorStatus,
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alerts: AlertTargets,
    #[serde(default)]
    pub contact_lists: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    /// Create a new monitor with the management layer's defaults (60s/30s)
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            interval_seconds: 60,
            timeout_seconds: 30,
            status: MonitorStatus::Paused,
            last_check: None,
            alerts: AlertTargets::default(),
            contact_lists: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: MonitorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_interval(mut self, interval_seconds: u64) -> Self {
        self.interval_seconds = interval_seconds;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_last_check(mut self, last_check: DateTime<Utc>) -> Self {
        self.last_check = Some(last_check);
        self
    }

    pub fn with_alerts(mut self, alerts: AlertTargets) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_contact_lists(mut self, ids: Vec<Uuid>) -> Self {
        self.contact_lists = ids;
        self
    }

    /// Whether enough time has passed since the last check.
    ///
    /// A monitor that was never checked is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let last_check = self.last_check.unwrap_or(DateTime::UNIX_EPOCH);
        let since_ms = (now - last_check).num_milliseconds();
        since_ms >= (self.interval_seconds as i64).saturating_mul(1000)
    }
}

/// Outcome of one probe, or of a whole retry sequence.
///
/// Network failures are carried here as `success = false`, never as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub success: bool,
    /// Wall-clock milliseconds (cumulative across retries once the retry
    /// controller has stamped it)
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// 1-indexed count of attempts actually made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
}

impl CheckResult {
    pub fn success(response_time: u64, status_code: u16) -> Self {
        Self {
            success: true,
            response_time,
            status_code: Some(status_code),
            error: None,
            timestamp: Utc::now(),
            attempt_number: None,
        }
    }

    pub fn failure(response_time: u64, status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            response_time,
            status_code,
            error: Some(error.into()),
            timestamp: Utc::now(),
            attempt_number: None,
        }
    }

    /// Error text used in alerts
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}

/// Immutable history entry, written exactly once per poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub monitor_id: Uuid,
    pub success: bool,
    pub response_time: u64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub attempt_number: Option<u32>,
}

impl CheckRecord {
    pub fn from_result(monitor_id: Uuid, result: &CheckResult) -> Self {
        Self {
            monitor_id,
            success: result.success,
            response_time: result.response_time,
            status_code: result.status_code,
            error: result.error.clone(),
            timestamp: result.timestamp,
            attempt_number: result.attempt_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn never_checked_monitor_is_due() {
        let monitor = Monitor::new("api", "https://example.com").with_interval(60);
        assert!(monitor.is_due(Utc::now()));
    }

    #[test]
    fn recently_checked_monitor_is_not_due() {
        let now = Utc::now();
        let monitor = Monitor::new("api", "https://example.com")
            .with_interval(60)
            .with_last_check(now - Duration::seconds(10));
        assert!(!monitor.is_due(now));
        assert!(monitor.is_due(now + Duration::seconds(50)));
    }

    #[test]
    fn status_parsing() {
        assert_eq!("up".parse::<MonitorStatus>().unwrap(), MonitorStatus::Up);
        assert_eq!("paused".parse::<MonitorStatus>().unwrap(), MonitorStatus::Paused);
        assert!("degraded".parse::<MonitorStatus>().is_err());
        assert!(!MonitorStatus::Paused.is_pollable());
        assert!(MonitorStatus::Down.is_pollable());
    }

    #[test]
    fn failure_without_message_reads_unknown() {
        let mut result = CheckResult::failure(10, Some(500), "boom");
        result.error = None;
        assert_eq!(result.error_message(), "Unknown error");
    }
}
