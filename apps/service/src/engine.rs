//! Wires storage, probing and alerting together from a [`Config`].
//!
//! Both triggers (the CLI and the HTTP server) go through this type.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::alerting::{ContactResolver, PushNotifier, PushOutcome};
use crate::config::Config;
use crate::database::DatabaseImpl;
use crate::monitoring::{HttpProber, MonitorStats, RetryController};
use crate::orchestrator::{BatchSummary, CheckOrchestrator, MonitorCheck, RetentionCleanup};
use crate::store::{CheckHistory, MonitorSource};

pub struct Engine {
    database: Arc<DatabaseImpl>,
    orchestrator: CheckOrchestrator,
    retention: RetentionCleanup,
    push: Option<PushNotifier>,
}

impl Engine {
    /// Open (and migrate) the configured database, then build the engine on it
    pub async fn open(config: &Config) -> Result<Self> {
        info!(path = %config.database.path, "Opening database");
        let database = DatabaseImpl::open(&config.database.path, config.database.pool_size).await?;
        Self::from_database(config, Arc::new(database))
    }

    pub fn from_database(config: &Config, database: Arc<DatabaseImpl>) -> Result<Self> {
        let prober = Arc::new(HttpProber::new()?);
        let retry = RetryController::new(prober, config.retry.clone());
        let dispatcher = config.alert_dispatcher().context("Failed to configure alert senders")?;

        let push = config
            .push_sender()
            .context("Failed to configure push relay")?
            .map(|sender| PushNotifier::new(Arc::new(sender), database.clone()));

        let mut orchestrator = CheckOrchestrator::new(database.clone(), database.clone(), retry)
            .with_resolver(ContactResolver::new(database.clone()))
            .with_dispatcher(dispatcher)
            .with_execution_budget(config.execution_budget());

        let push_on_down = config.push.as_ref().is_some_and(|push| push.notify_on_down);
        if let Some(notifier) = push.clone().filter(|_| push_on_down) {
            orchestrator = orchestrator.with_push(notifier);
        }

        let retention = RetentionCleanup::new(database.clone(), config.retention.clone());

        Ok(Self { database, orchestrator, retention, push })
    }

    pub fn database(&self) -> &Arc<DatabaseImpl> {
        &self.database
    }

    pub fn orchestrator(&self) -> &CheckOrchestrator {
        &self.orchestrator
    }

    pub async fn run_batch(&self) -> Result<BatchSummary> {
        self.orchestrator.run_batch().await
    }

    pub async fn check_now(&self, id: Uuid) -> Result<Option<MonitorCheck>> {
        self.orchestrator.check_now(id).await
    }

    /// Rolling uptime for one monitor, `None` if it does not exist
    pub async fn stats(&self, id: Uuid) -> Result<Option<MonitorStats>> {
        if self.database.get_monitor(id).await?.is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let checks = self
            .database
            .checks_since(id, now - Duration::days(MonitorStats::WINDOW_DAYS))
            .await?;
        Ok(Some(MonitorStats::compute(id, &checks, now)))
    }

    pub async fn prune(&self) -> Result<u64> {
        self.retention.run_once().await
    }

    /// Send a test push to every device; `None` when push is not configured
    pub async fn send_test_push(&self) -> Result<Option<PushOutcome>> {
        match &self.push {
            Some(push) => push.send_test().await.map(Some),
            None => Ok(None),
        }
    }
}
