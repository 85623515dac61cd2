use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};
use tracing::warn;
use uuid::Uuid;

use super::models::{ContactList, DevicePlatform, DeviceToken, from_millis, to_millis};
use crate::monitoring::types::{AlertTargets, CheckRecord, Monitor, MonitorStatus};
use crate::monitoring::validation::validate_monitor;
use crate::pool::{LibsqlManager, LibsqlPool, open_pool};
use crate::store::{CheckHistory, CheckSink, ContactListSource, DeviceTokenSource, MonitorSource};

const MONITOR_COLUMNS: &str = "id, name, url, interval_seconds, timeout_seconds, status, last_check, \
     alert_emails, alert_phones, alert_webhooks, contact_lists, created_at, updated_at";

const CHECK_COLUMNS: &str =
    "monitor_id, success, response_time_ms, status_code, error, timestamp, attempt_number";

/// LibSQL-backed implementation of every storage boundary
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Open the database file, migrate it, and return a ready repository
    pub async fn open(path: &str, pool_size: usize) -> Result<Self> {
        let pool = open_pool(path, pool_size)
            .await
            .with_context(|| format!("failed to open database at {}", path))?;
        let database = Self::new_from_pool(pool);
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> Result<()> {
        let conn = self.get_conn().await?;
        super::initialize_database(&conn).await
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("database connection unavailable: {}", e))
    }

    /// Insert or replace a monitor after validating its configuration
    pub async fn save_monitor(&self, monitor: &Monitor) -> Result<()> {
        validate_monitor(monitor)?;
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO monitors (id, name, url, interval_seconds, timeout_seconds, status, last_check, \
             alert_emails, alert_phones, alert_webhooks, contact_lists, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, url = excluded.url, \
             interval_seconds = excluded.interval_seconds, timeout_seconds = excluded.timeout_seconds, \
             status = excluded.status, last_check = excluded.last_check, alert_emails = excluded.alert_emails, \
             alert_phones = excluded.alert_phones, alert_webhooks = excluded.alert_webhooks, \
             contact_lists = excluded.contact_lists, updated_at = excluded.updated_at",
            params![
                monitor.id.to_string(),
                monitor.name.clone(),
                monitor.url.clone(),
                monitor.interval_seconds as i64,
                monitor.timeout_seconds as i64,
                monitor.status.as_str(),
                monitor.last_check.map(to_millis),
                serde_json::to_string(&monitor.alerts.email)?,
                serde_json::to_string(&monitor.alerts.phone)?,
                serde_json::to_string(&monitor.alerts.webhook)?,
                serde_json::to_string(&monitor.contact_lists)?,
                to_millis(monitor.created_at),
                to_millis(Utc::now())
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn save_contact_list(&self, list: &ContactList) -> Result<()> {
        let conn = self.get_conn().await?;
        let now = to_millis(Utc::now());

        conn.execute(
            "INSERT INTO contact_lists (id, name, description, emails, phones, webhooks, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description, \
             emails = excluded.emails, phones = excluded.phones, webhooks = excluded.webhooks, \
             updated_at = excluded.updated_at",
            params![
                list.id.to_string(),
                list.name.clone(),
                list.description.clone(),
                serde_json::to_string(&list.emails)?,
                serde_json::to_string(&list.phones)?,
                serde_json::to_string(&list.webhooks)?,
                now,
                now
            ],
        )
        .await?;

        Ok(())
    }

    /// Register a device, reactivating it if the token is already known
    pub async fn register_device(&self, token: &str, platform: DevicePlatform) -> Result<()> {
        let conn = self.get_conn().await?;
        let now = to_millis(Utc::now());

        conn.execute(
            "INSERT INTO device_tokens (token, platform, is_active, created_at, updated_at) VALUES (?, ?, 1, ?, ?) \
             ON CONFLICT(token) DO UPDATE SET platform = excluded.platform, is_active = 1, updated_at = excluded.updated_at",
            params![token.trim(), platform.as_str(), now, now],
        )
        .await?;

        Ok(())
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceToken>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query("SELECT token, platform, is_active, created_at FROM device_tokens ORDER BY created_at, rowid", ())
            .await?;

        let mut devices = Vec::new();
        while let Some(row) = rows.next().await? {
            let platform: String = row.get(1)?;
            devices.push(DeviceToken {
                token: row.get(0)?,
                platform: DevicePlatform::parse(&platform)
                    .with_context(|| format!("unknown device platform {}", platform))?,
                is_active: row.get::<i64>(2)? != 0,
                created_at: from_millis(row.get(3)?),
            });
        }

        Ok(devices)
    }

    async fn query_checks(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;

        let mut checks = Vec::new();
        while let Some(row) = rows.next().await? {
            checks.push(check_from_row(&row)?);
        }
        Ok(checks)
    }
}

fn json_list<T: serde::de::DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

fn monitor_from_row(row: &Row) -> Result<Monitor> {
    let id: String = row.get(0)?;
    let status: String = row.get(5)?;
    let alert_emails: String = row.get(7)?;
    let alert_phones: String = row.get(8)?;
    let alert_webhooks: String = row.get(9)?;
    let contact_lists: String = row.get(10)?;

    Ok(Monitor {
        id: Uuid::parse_str(&id)?,
        name: row.get(1)?,
        url: row.get(2)?,
        interval_seconds: row.get::<i64>(3)? as u64,
        timeout_seconds: row.get::<i64>(4)? as u64,
        status: status.parse()?,
        last_check: row.get::<Option<i64>>(6)?.map(from_millis),
        alerts: AlertTargets {
            email: json_list(&alert_emails)?,
            phone: json_list(&alert_phones)?,
            webhook: json_list(&alert_webhooks)?,
        },
        contact_lists: json_list(&contact_lists)?,
        created_at: from_millis(row.get(11)?),
        updated_at: from_millis(row.get(12)?),
    })
}

fn check_from_row(row: &Row) -> Result<CheckRecord> {
    let monitor_id: String = row.get(0)?;

    Ok(CheckRecord {
        monitor_id: Uuid::parse_str(&monitor_id)?,
        success: row.get::<i64>(1)? != 0,
        response_time: row.get::<i64>(2)?.max(0) as u64,
        status_code: row.get::<Option<i64>>(3)?.map(|v| v as u16),
        error: row.get(4)?,
        timestamp: from_millis(row.get(5)?),
        attempt_number: row.get::<Option<i64>>(6)?.map(|v| v as u32),
    })
}

#[async_trait]
impl MonitorSource for DatabaseImpl {
    async fn list_pollable(&self) -> Result<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM monitors WHERE status IN ('up', 'down') ORDER BY created_at, id",
            MONITOR_COLUMNS
        );
        let mut rows = conn.query(&sql, ()).await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            match monitor_from_row(&row) {
                Ok(monitor) => monitors.push(monitor),
                Err(e) => {
                    let id = row.get::<String>(0).unwrap_or_default();
                    warn!(monitor = %id, error = %e, "Skipping monitor row that could not be decoded");
                }
            }
        }

        Ok(monitors)
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM monitors WHERE id = ?", MONITOR_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: Uuid, status: MonitorStatus, last_check: DateTime<Utc>) -> Result<()> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE monitors SET status = ?, last_check = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), to_millis(last_check), to_millis(Utc::now()), id.to_string()],
            )
            .await?;

        if updated == 0 {
            anyhow::bail!("monitor {} no longer exists", id);
        }
        Ok(())
    }
}

#[async_trait]
impl CheckSink for DatabaseImpl {
    async fn record_check(&self, record: &CheckRecord) -> Result<()> {
        let conn = self.get_conn().await?;
        let sql = format!("INSERT INTO monitor_checks ({}) VALUES (?, ?, ?, ?, ?, ?, ?)", CHECK_COLUMNS);

        conn.execute(
            &sql,
            params![
                record.monitor_id.to_string(),
                if record.success { 1 } else { 0 },
                record.response_time as i64,
                record.status_code.map(|v| v as i64),
                record.error.clone(),
                to_millis(record.timestamp),
                record.attempt_number.map(|v| v as i64)
            ],
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ContactListSource for DatabaseImpl {
    async fn lookup_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>> {
        let conn = self.get_conn().await?;
        let mut lists = Vec::with_capacity(ids.len());

        for id in ids {
            let mut rows = conn
                .query(
                    "SELECT id, name, description, emails, phones, webhooks FROM contact_lists WHERE id = ?",
                    params![id.to_string()],
                )
                .await?;

            let Some(row) = rows.next().await? else {
                warn!(contact_list = %id, "Contact list referenced by a monitor does not exist");
                continue;
            };

            let list_id: String = row.get(0)?;
            let emails: String = row.get(3)?;
            let phones: String = row.get(4)?;
            let webhooks: String = row.get(5)?;

            lists.push(ContactList {
                id: Uuid::parse_str(&list_id)?,
                name: row.get(1)?,
                description: row.get(2)?,
                emails: json_list(&emails)?,
                phones: json_list(&phones)?,
                webhooks: json_list(&webhooks)?,
            });
        }

        Ok(lists)
    }
}

#[async_trait]
impl DeviceTokenSource for DatabaseImpl {
    async fn active_tokens(&self) -> Result<Vec<String>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query("SELECT token FROM device_tokens WHERE is_active = 1 ORDER BY created_at, rowid", ())
            .await?;

        let mut tokens = Vec::new();
        while let Some(row) = rows.next().await? {
            tokens.push(row.get::<String>(0)?);
        }
        Ok(tokens)
    }

    async fn deactivate_tokens(&self, tokens: &[String]) -> Result<u64> {
        let conn = self.get_conn().await?;
        let now = to_millis(Utc::now());
        let mut changed = 0;

        for token in tokens {
            changed += conn
                .execute(
                    "UPDATE device_tokens SET is_active = 0, updated_at = ? WHERE token = ? AND is_active = 1",
                    params![now, token.clone()],
                )
                .await?;
        }

        Ok(changed)
    }
}

#[async_trait]
impl CheckHistory for DatabaseImpl {
    async fn checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<CheckRecord>> {
        let sql = format!(
            "SELECT {} FROM monitor_checks WHERE monitor_id = ? AND timestamp >= ? ORDER BY timestamp DESC",
            CHECK_COLUMNS
        );
        self.query_checks(&sql, params![monitor_id.to_string(), to_millis(since)]).await
    }

    async fn recent_checks(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<CheckRecord>> {
        let sql = format!(
            "SELECT {} FROM monitor_checks WHERE monitor_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            CHECK_COLUMNS
        );
        self.query_checks(&sql, params![monitor_id.to_string(), limit as i64]).await
    }

    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM monitor_checks WHERE timestamp < ?", params![to_millis(cutoff)])
            .await?;
        Ok(deleted)
    }
}
