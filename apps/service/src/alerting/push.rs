use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::senders::{PushOutcome, PushSender};
use crate::monitoring::types::Monitor;
use crate::store::DeviceTokenSource;

/// Account-wide push channel to every registered device.
///
/// Independent of contact lists: all active device tokens receive the
/// notification. Tokens the push service rejects as invalid are deactivated.
#[derive(Clone)]
pub struct PushNotifier {
    sender: Arc<dyn PushSender>,
    devices: Arc<dyn DeviceTokenSource>,
}

impl PushNotifier {
    pub fn new(sender: Arc<dyn PushSender>, devices: Arc<dyn DeviceTokenSource>) -> Self {
        Self { sender, devices }
    }

    pub async fn notify_down(&self, monitor: &Monitor, error_message: &str) -> Result<PushOutcome> {
        let data = HashMap::from([
            ("type".to_string(), "monitor_down".to_string()),
            ("monitorName".to_string(), monitor.name.clone()),
            ("url".to_string(), monitor.url.clone()),
            ("error".to_string(), error_message.to_string()),
        ]);
        self.broadcast(
            &format!("🚨 {} is DOWN", monitor.name),
            &format!("{} is not responding: {}", monitor.url, error_message),
            &data,
        )
        .await
    }

    pub async fn notify_recovery(&self, monitor: &Monitor) -> Result<PushOutcome> {
        let data = HashMap::from([
            ("type".to_string(), "monitor_recovery".to_string()),
            ("monitorName".to_string(), monitor.name.clone()),
            ("url".to_string(), monitor.url.clone()),
        ]);
        self.broadcast(
            &format!("✅ {} is UP", monitor.name),
            &format!("{} is responding again", monitor.url),
            &data,
        )
        .await
    }

    pub async fn send_test(&self) -> Result<PushOutcome> {
        let data = HashMap::from([("type".to_string(), "test".to_string())]);
        self.broadcast(
            "🔔 Test Notification",
            "Push notifications are working. You will be alerted when a monitor goes down.",
            &data,
        )
        .await
    }

    async fn broadcast(&self, title: &str, body: &str, data: &HashMap<String, String>) -> Result<PushOutcome> {
        let tokens = self.devices.active_tokens().await.context("Failed to load device tokens")?;
        if tokens.is_empty() {
            debug!("No active device tokens, skipping push");
            return Ok(PushOutcome::default());
        }

        let outcome = self.sender.send_push(&tokens, title, body, data).await?;

        if !outcome.invalid_tokens.is_empty() {
            match self.devices.deactivate_tokens(&outcome.invalid_tokens).await {
                Ok(count) => info!(count, "Deactivated invalid device tokens"),
                Err(e) => warn!(error = %e, "Failed to deactivate invalid device tokens"),
            }
        }

        Ok(outcome)
    }
}
