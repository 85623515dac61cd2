//! Storage boundaries the engine talks to.
//!
//! The engine never owns these stores: monitors, contact lists and device
//! tokens are managed elsewhere, and the engine only performs the narrow
//! reads and writes declared here.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::ContactList;
use crate::monitoring::types::{CheckRecord, Monitor, MonitorStatus};

#[async_trait]
pub trait MonitorSource: Send + Sync {
    /// All monitors whose status is `up` or `down`, in listing order
    async fn list_pollable(&self) -> Result<Vec<Monitor>>;

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>>;

    async fn update_status(&self, id: Uuid, status: MonitorStatus, last_check: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait CheckSink: Send + Sync {
    /// Append one immutable check record
    async fn record_check(&self, record: &CheckRecord) -> Result<()>;
}

#[async_trait]
pub trait ContactListSource: Send + Sync {
    /// Lists matching `ids`; ids with no stored list are skipped
    async fn lookup_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>>;
}

#[async_trait]
pub trait DeviceTokenSource: Send + Sync {
    async fn active_tokens(&self) -> Result<Vec<String>>;

    /// Returns the number of tokens that were deactivated
    async fn deactivate_tokens(&self, tokens: &[String]) -> Result<u64>;
}

#[async_trait]
pub trait CheckHistory: Send + Sync {
    /// Checks of one monitor at or after `since`, newest first
    async fn checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<CheckRecord>>;

    async fn recent_checks(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<CheckRecord>>;

    /// Delete every check older than `cutoff`, returning how many were removed
    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
