/// Orchestrator module - the check scheduler
///
/// The orchestrator is the core coordinator that:
/// - Selects due monitors within a wall-clock execution budget
/// - Runs each through the retry controller, strictly one after another
/// - Persists the check, updates status, then alerts on an up to down edge
///
/// ## Retention
/// The `retention` submodule prunes check history by age. It is driven by
/// the triggers, never by a batch run.

pub mod retention;


pub use retention::{RetentionCleanup, RetentionPolicy};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::alerting::{AlertDispatcher, ContactResolver, PushNotifier};
use crate::monitoring::types::{CheckRecord, CheckResult, Monitor, MonitorStatus};
use crate::monitoring::RetryController;
use crate::store::{CheckSink, MonitorSource};

/// Default wall-clock ceiling for one batch
pub const DEFAULT_EXECUTION_BUDGET: Duration = Duration::from_secs(55);

/// Alerts fire only on the edge from `up` to a failed check
pub fn should_alert(previous: MonitorStatus, success: bool) -> bool {
    previous == MonitorStatus::Up && !success
}

/// Result of one batch invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub success: bool,
    /// Monitors loaded as pollable at the start of the run
    pub monitors_checked: usize,
    pub checked: usize,
    /// Not yet due
    pub skipped: usize,
    /// Left for the next run because the budget ran out
    pub deferred: usize,
    pub failed: usize,
    pub alerts_fired: usize,
}

/// Outcome of running one monitor through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCheck {
    pub monitor_id: Uuid,
    pub result: CheckResult,
    pub previous_status: MonitorStatus,
    pub current_status: MonitorStatus,
    pub alert_fired: bool,
}

/// Time-budgeted scheduler over every pollable monitor
pub struct CheckOrchestrator {
    monitors: Arc<dyn MonitorSource>,
    checks: Arc<dyn CheckSink>,
    retry: RetryController,
    resolver: ContactResolver,
    dispatcher: AlertDispatcher,
    push: Option<PushNotifier>,
    execution_budget: Duration,
}

impl CheckOrchestrator {
    pub fn new(monitors: Arc<dyn MonitorSource>, checks: Arc<dyn CheckSink>, retry: RetryController) -> Self {
        Self {
            monitors,
            checks,
            retry,
            resolver: ContactResolver::direct_only(),
            dispatcher: AlertDispatcher::new(),
            push: None,
            execution_budget: DEFAULT_EXECUTION_BUDGET,
        }
    }

    pub fn with_resolver(mut self, resolver: ContactResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: AlertDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Also push to every device when a monitor goes down
    pub fn with_push(mut self, push: PushNotifier) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_execution_budget(mut self, budget: Duration) -> Self {
        self.execution_budget = budget;
        self
    }

    pub fn execution_budget(&self) -> Duration {
        self.execution_budget
    }

    /// Run one batch over every pollable monitor, in listing order.
    ///
    /// Only a failure to load monitors is returned as an error; anything that
    /// goes wrong for a single monitor is logged and counted as failed.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let monitors = self.monitors.list_pollable().await.context("Failed to load pollable monitors")?;
        let started = Instant::now();

        let mut summary = BatchSummary { success: true, monitors_checked: monitors.len(), ..Default::default() };
        info!(monitors = monitors.len(), "Starting check batch");

        for (index, monitor) in monitors.iter().enumerate() {
            if started.elapsed() > self.execution_budget {
                summary.deferred = monitors.len() - index;
                warn!(
                    deferred = summary.deferred,
                    budget_secs = self.execution_budget.as_secs(),
                    "Execution budget exhausted, deferring remaining monitors"
                );
                break;
            }

            let now = Utc::now();
            if !monitor.is_due(now) {
                debug!(monitor = %monitor.name, "Not due yet, skipping");
                summary.skipped += 1;
                continue;
            }

            match self.check_monitor(monitor, now).await {
                Ok(outcome) => {
                    summary.checked += 1;
                    if outcome.alert_fired {
                        summary.alerts_fired += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(monitor = %monitor.name, error = %e, "Error checking monitor");
                }
            }
        }

        info!(
            checked = summary.checked,
            skipped = summary.skipped,
            deferred = summary.deferred,
            failed = summary.failed,
            alerts = summary.alerts_fired,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Check batch finished"
        );
        Ok(summary)
    }

    /// Check one monitor right away, ignoring its interval and its paused
    /// state. Returns `None` when no monitor has this id.
    pub async fn check_now(&self, id: Uuid) -> Result<Option<MonitorCheck>> {
        let Some(monitor) = self.monitors.get_monitor(id).await? else {
            return Ok(None);
        };
        self.check_monitor(&monitor, Utc::now()).await.map(Some)
    }

    /// Probe, persist the check, update status, then alert on a down edge.
    ///
    /// `now` is when the monitor was picked up and becomes its `last_check`,
    /// so probe and backoff time never push the next due time back.
    async fn check_monitor(&self, monitor: &Monitor, now: DateTime<Utc>) -> Result<MonitorCheck> {
        let timeout = Duration::from_secs(monitor.timeout_seconds);
        let result = self.retry.check(&monitor.url, timeout).await;

        self.checks
            .record_check(&CheckRecord::from_result(monitor.id, &result))
            .await
            .with_context(|| format!("Failed to record check for {}", monitor.name))?;

        let previous_status = monitor.status;
        let current_status = MonitorStatus::from_success(result.success);
        self.monitors
            .update_status(monitor.id, current_status, now)
            .await
            .with_context(|| format!("Failed to update status for {}", monitor.name))?;

        if let Some(attempt) = result.attempt_number.filter(|attempt| *attempt > 1) {
            info!(monitor = %monitor.name, attempt, success = result.success, "Check needed retries");
        }
        debug!(
            monitor = %monitor.name,
            status = %current_status,
            response_time = result.response_time,
            "Check complete"
        );

        let alert_fired = should_alert(previous_status, result.success);
        if alert_fired {
            self.fire_alerts(monitor, result.error_message()).await;
        }

        Ok(MonitorCheck { monitor_id: monitor.id, result, previous_status, current_status, alert_fired })
    }

    async fn fire_alerts(&self, monitor: &Monitor, error_message: &str) {
        warn!(monitor = %monitor.name, error = error_message, "Monitor went down, sending alerts");

        let contacts = self.resolver.resolve(&monitor.alerts, &monitor.contact_lists).await;
        self.dispatcher.dispatch(monitor, &contacts, error_message).await;

        if let Some(push) = &self.push {
            if let Err(e) = push.notify_down(monitor, error_message).await {
                warn!(monitor = %monitor.name, error = %e, "Failed to send down push notification");
            }
        }
    }
}
