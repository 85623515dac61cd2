//! In-memory fakes shared by unit tests.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::alerting::senders::{
    EmailSender, PushOutcome, PushSender, SenderError, VoiceCallSender, WebhookSender,
};
use crate::database::models::{ContactList, DevicePlatform, DeviceToken};
use crate::monitoring::checker::Prober;
use crate::monitoring::types::{CheckRecord, CheckResult, Monitor, MonitorStatus};
use crate::store::{CheckHistory, CheckSink, ContactListSource, DeviceTokenSource, MonitorSource};

/// Prober that plays back a fixed sequence of outcomes, repeating the last one
pub struct ScriptedProber {
    script: Vec<bool>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(script: Vec<bool>) -> Self {
        Self { script, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _url: &str, _timeout: Duration) -> CheckResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let healthy = self.script.get(call - 1).or(self.script.last()).copied().unwrap_or(true);
        if healthy {
            CheckResult::success(5, 200)
        } else {
            CheckResult::failure(5, Some(500), format!("scripted failure {}", call))
        }
    }
}

/// Prober whose health can be flipped between batches, per URL or globally
#[derive(Default)]
pub struct ToggleProber {
    down_urls: Mutex<HashSet<String>>,
    all_down: AtomicBool,
    latency: Mutex<Option<Duration>>,
    probed: Mutex<Vec<String>>,
}

impl ToggleProber {
    pub fn set_all_down(&self, down: bool) {
        self.all_down.store(down, Ordering::SeqCst);
    }

    pub fn set_down(&self, url: &str, down: bool) {
        let mut urls = self.down_urls.lock().unwrap();
        if down {
            urls.insert(url.to_string());
        } else {
            urls.remove(url);
        }
    }

    /// Every probe sleeps this long on the tokio clock before answering
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ToggleProber {
    async fn probe(&self, url: &str, _timeout: Duration) -> CheckResult {
        self.probed.lock().unwrap().push(url.to_string());
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let down = self.all_down.load(Ordering::SeqCst) || self.down_urls.lock().unwrap().contains(url);
        if down {
            CheckResult::failure(12, None, "Connection failed")
        } else {
            CheckResult::success(12, 200)
        }
    }
}

/// Every store boundary backed by vectors, with switchable failures
#[derive(Default)]
pub struct MemoryStore {
    monitors: Mutex<Vec<Monitor>>,
    checks: Mutex<Vec<CheckRecord>>,
    contact_lists: Mutex<Vec<ContactList>>,
    devices: Mutex<Vec<DeviceToken>>,
    fail_listing: AtomicBool,
    fail_contact_lookups: AtomicBool,
    fail_record_for: Mutex<HashSet<Uuid>>,
    contact_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn add_monitor(&self, monitor: Monitor) -> Uuid {
        let id = monitor.id;
        self.monitors.lock().unwrap().push(monitor);
        id
    }

    pub fn monitor(&self, id: Uuid) -> Option<Monitor> {
        self.monitors.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }

    /// Move a monitor's last check into the past so it becomes due again
    pub fn backdate(&self, id: Uuid, by: chrono::Duration) {
        let mut monitors = self.monitors.lock().unwrap();
        if let Some(monitor) = monitors.iter_mut().find(|m| m.id == id) {
            monitor.last_check = monitor.last_check.map(|at| at - by);
        }
    }

    pub fn checks(&self) -> Vec<CheckRecord> {
        self.checks.lock().unwrap().clone()
    }

    pub fn checks_for(&self, id: Uuid) -> Vec<CheckRecord> {
        self.checks().into_iter().filter(|c| c.monitor_id == id).collect()
    }

    pub fn add_check(&self, record: CheckRecord) {
        self.checks.lock().unwrap().push(record);
    }

    pub fn add_contact_list(&self, list: ContactList) {
        self.contact_lists.lock().unwrap().push(list);
    }

    pub fn add_device(&self, token: &str, platform: DevicePlatform) {
        self.devices.lock().unwrap().push(DeviceToken {
            token: token.to_string(),
            platform,
            is_active: true,
            created_at: Utc::now(),
        });
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_contact_lookups(&self, fail: bool) {
        self.fail_contact_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_record_check_for(&self, id: Uuid) {
        self.fail_record_for.lock().unwrap().insert(id);
    }

    pub fn contact_lookups(&self) -> usize {
        self.contact_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MonitorSource for MemoryStore {
    async fn list_pollable(&self) -> Result<Vec<Monitor>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            bail!("database unavailable");
        }
        Ok(self.monitors.lock().unwrap().iter().filter(|m| m.status.is_pollable()).cloned().collect())
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            bail!("database unavailable");
        }
        Ok(self.monitor(id))
    }

    async fn update_status(&self, id: Uuid, status: MonitorStatus, last_check: DateTime<Utc>) -> Result<()> {
        let mut monitors = self.monitors.lock().unwrap();
        let monitor = monitors.iter_mut().find(|m| m.id == id).ok_or_else(|| anyhow!("Monitor {} not found", id))?;
        monitor.status = status;
        monitor.last_check = Some(last_check);
        monitor.updated_at = last_check;
        Ok(())
    }
}

#[async_trait]
impl CheckSink for MemoryStore {
    async fn record_check(&self, record: &CheckRecord) -> Result<()> {
        if self.fail_record_for.lock().unwrap().contains(&record.monitor_id) {
            bail!("disk full");
        }
        self.checks.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ContactListSource for MemoryStore {
    async fn lookup_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>> {
        self.contact_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_contact_lookups.load(Ordering::SeqCst) {
            bail!("contact list lookup failed");
        }
        let lists = self.contact_lists.lock().unwrap();
        Ok(ids.iter().filter_map(|id| lists.iter().find(|l| l.id == *id).cloned()).collect())
    }
}

#[async_trait]
impl DeviceTokenSource for MemoryStore {
    async fn active_tokens(&self) -> Result<Vec<String>> {
        Ok(self.devices.lock().unwrap().iter().filter(|d| d.is_active).map(|d| d.token.clone()).collect())
    }

    async fn deactivate_tokens(&self, tokens: &[String]) -> Result<u64> {
        let mut count = 0;
        for device in self.devices.lock().unwrap().iter_mut() {
            if device.is_active && tokens.contains(&device.token) {
                device.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl CheckHistory for MemoryStore {
    async fn checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<CheckRecord>> {
        let mut checks: Vec<CheckRecord> =
            self.checks_for(monitor_id).into_iter().filter(|c| c.timestamp >= since).collect();
        checks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(checks)
    }

    async fn recent_checks(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<CheckRecord>> {
        let mut checks = self.checks_for(monitor_id);
        checks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        checks.truncate(limit);
        Ok(checks)
    }

    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut checks = self.checks.lock().unwrap();
        let before = checks.len();
        checks.retain(|c| c.timestamp >= cutoff);
        Ok((before - checks.len()) as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentAlert {
    Email { to: String, monitor: String, url: String, error: String },
    Webhook { url: String, monitor: String, monitor_url: String, error: String },
    Voice { to: String, monitor: String, url: String },
}

impl SentAlert {
    pub fn destination(&self) -> &str {
        match self {
            SentAlert::Email { to, .. } | SentAlert::Voice { to, .. } => to,
            SentAlert::Webhook { url, .. } => url,
        }
    }
}

/// Records every email, webhook and call; fails for chosen destinations
#[derive(Default)]
pub struct RecordingSender {
    failing: HashSet<String>,
    sent: Mutex<Vec<SentAlert>>,
}

impl RecordingSender {
    pub fn failing_for<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { failing: destinations.into_iter().map(Into::into).collect(), sent: Mutex::default() }
    }

    /// Every attempted send, including the failed ones, in call order
    pub fn sent(&self) -> Vec<SentAlert> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, alert: SentAlert) -> Result<(), SenderError> {
        let fail = self.failing.contains(alert.destination());
        let destination = alert.destination().to_string();
        self.sent.lock().unwrap().push(alert);
        if fail {
            return Err(SenderError::SendFailed(format!("refused by {}", destination)));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send_email(&self, to: &str, monitor_name: &str, url: &str, error_message: &str) -> Result<(), SenderError> {
        self.record(SentAlert::Email {
            to: to.into(),
            monitor: monitor_name.into(),
            url: url.into(),
            error: error_message.into(),
        })
    }
}

#[async_trait]
impl WebhookSender for RecordingSender {
    async fn send_webhook(
        &self,
        url: &str,
        monitor_name: &str,
        monitor_url: &str,
        error_message: &str,
    ) -> Result<(), SenderError> {
        self.record(SentAlert::Webhook {
            url: url.into(),
            monitor: monitor_name.into(),
            monitor_url: monitor_url.into(),
            error: error_message.into(),
        })
    }
}

#[async_trait]
impl VoiceCallSender for RecordingSender {
    async fn send_voice_call(&self, to: &str, monitor_name: &str, url: &str) -> Result<(), SenderError> {
        self.record(SentAlert::Voice { to: to.into(), monitor: monitor_name.into(), url: url.into() })
    }
}

#[derive(Debug, Clone)]
pub struct RecordedPush {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

/// Push sender that accepts every token except the rejected ones
#[derive(Default)]
pub struct RecordingPushSender {
    rejected: HashSet<String>,
    pushes: Mutex<Vec<RecordedPush>>,
}

impl RecordingPushSender {
    pub fn rejecting<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { rejected: tokens.into_iter().map(Into::into).collect(), pushes: Mutex::default() }
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send_push(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<PushOutcome, SenderError> {
        self.pushes.lock().unwrap().push(RecordedPush {
            tokens: tokens.to_vec(),
            title: title.into(),
            body: body.into(),
            data: data.clone(),
        });

        let mut outcome = PushOutcome::default();
        for token in tokens {
            if self.rejected.contains(token) {
                outcome.failed += 1;
                outcome.invalid_tokens.push(token.clone());
            } else {
                outcome.succeeded += 1;
            }
        }
        Ok(outcome)
    }
}
