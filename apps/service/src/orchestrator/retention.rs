//! Age-based pruning of check history.
//!
//! Check records are append-only; this is the only code that removes them.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::store::CheckHistory;

/// How long check history is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Days to keep check records
    pub check_history_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { check_history_days: 90 }
    }
}

impl RetentionPolicy {
    /// Records strictly older than this are expired
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.check_history_days)
    }
}

/// Cleanup manager for expired check records
pub struct RetentionCleanup {
    history: Arc<dyn CheckHistory>,
    policy: RetentionPolicy,
}

impl RetentionCleanup {
    pub fn new(history: Arc<dyn CheckHistory>, policy: RetentionPolicy) -> Self {
        Self { history, policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Delete every expired check, returning how many were removed
    pub async fn run_once(&self) -> Result<u64> {
        let cutoff = self.policy.cutoff(Utc::now());
        let deleted = self.history.prune_checks_before(cutoff).await?;
        info!(deleted, days = self.policy.check_history_days, "Retention cleanup completed");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{CheckRecord, CheckResult};
    use crate::test_support::MemoryStore;
    use uuid::Uuid;

    #[test]
    fn test_retention_policy_defaults() {
        assert_eq!(RetentionPolicy::default().check_history_days, 90);
    }

    #[test]
    fn test_cutoff_calculation() {
        let now = Utc::now();
        let policy = RetentionPolicy { check_history_days: 7 };
        assert_eq!(policy.cutoff(now), now - Duration::days(7));
    }

    #[tokio::test]
    async fn test_run_once_removes_only_expired_checks() {
        let store = Arc::new(MemoryStore::default());
        let monitor_id = Uuid::new_v4();
        let mut old = CheckRecord::from_result(monitor_id, &CheckResult::success(10, 200));
        old.timestamp = Utc::now() - Duration::days(91);
        let fresh = CheckRecord::from_result(monitor_id, &CheckResult::success(10, 200));
        store.add_check(old);
        store.add_check(fresh.clone());

        let cleanup = RetentionCleanup::new(store.clone(), RetentionPolicy::default());
        let deleted = cleanup.run_once().await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.checks(), vec![fresh]);
    }
}
