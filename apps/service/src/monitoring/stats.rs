use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::CheckRecord;

/// Percentage of successful checks; an empty history counts as fully up
pub fn uptime<'a>(checks: impl IntoIterator<Item = &'a CheckRecord>) -> f64 {
    let (total, successful) = checks
        .into_iter()
        .fold((0usize, 0usize), |(total, ok), c| (total + 1, ok + usize::from(c.success)));
    if total == 0 {
        return 100.0;
    }
    successful as f64 / total as f64 * 100.0
}

pub fn average_response_time(response_times: &[u64]) -> f64 {
    if response_times.is_empty() {
        return 0.0;
    }
    response_times.iter().sum::<u64>() as f64 / response_times.len() as f64
}

/// Rolling uptime figures for one monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub monitor_id: Uuid,
    pub uptime_24h: f64,
    pub uptime_7d: f64,
    pub uptime_30d: f64,
    /// Mean over successful checks of the last 30 days
    pub avg_response_time: f64,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
    pub last_updated: DateTime<Utc>,
}

impl MonitorStats {
    /// Window length covered by `compute`
    pub const WINDOW_DAYS: i64 = 30;

    /// Build stats from the last 30 days of history.
    ///
    /// Records older than the window are ignored, so callers may pass a
    /// wider slice.
    pub fn compute(monitor_id: Uuid, checks: &[CheckRecord], now: DateTime<Utc>) -> Self {
        let since = |window: Duration| {
            let cutoff = now - window;
            checks.iter().filter(|c| c.timestamp >= cutoff).collect::<Vec<_>>()
        };

        let last_24h = since(Duration::hours(24));
        let last_7d = since(Duration::days(7));
        let last_30d = since(Duration::days(Self::WINDOW_DAYS));

        let successful: Vec<u64> = last_30d
            .iter()
            .filter(|c| c.success)
            .map(|c| c.response_time)
            .collect();

        Self {
            monitor_id,
            uptime_24h: uptime(last_24h.iter().copied()),
            uptime_7d: uptime(last_7d.iter().copied()),
            uptime_30d: uptime(last_30d.iter().copied()),
            avg_response_time: average_response_time(&successful),
            total_checks: last_30d.len(),
            successful_checks: successful.len(),
            failed_checks: last_30d.len() - successful.len(),
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, response_time: u64, age: Duration) -> CheckRecord {
        CheckRecord {
            monitor_id: Uuid::nil(),
            success,
            response_time,
            status_code: None,
            error: None,
            timestamp: Utc::now() - age,
            attempt_number: Some(1),
        }
    }

    #[test]
    fn uptime_of_empty_history_is_full() {
        let empty: Vec<CheckRecord> = Vec::new();
        assert_eq!(uptime(&empty), 100.0);
    }

    #[test]
    fn uptime_is_success_ratio() {
        let checks = vec![record(true, 10, Duration::zero()), record(false, 10, Duration::zero())];
        assert_eq!(uptime(&checks), 50.0);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average_response_time(&[]), 0.0);
        assert_eq!(average_response_time(&[100, 200, 300]), 200.0);
    }

    #[test]
    fn stats_split_by_window() {
        let now = Utc::now();
        let checks = vec![
            record(true, 100, Duration::hours(1)),
            record(false, 900, Duration::hours(2)),
            record(true, 300, Duration::days(3)),
            record(false, 50, Duration::days(20)),
            record(true, 999, Duration::days(45)),
        ];

        let stats = MonitorStats::compute(Uuid::nil(), &checks, now);

        assert_eq!(stats.uptime_24h, 50.0);
        assert!((stats.uptime_7d - 66.666).abs() < 0.01);
        assert_eq!(stats.uptime_30d, 50.0);
        assert_eq!(stats.total_checks, 4);
        assert_eq!(stats.successful_checks, 2);
        assert_eq!(stats.failed_checks, 2);
        assert_eq!(stats.avg_response_time, 200.0);
    }
}
