use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{SenderError, WebhookSender};

/// Posts a JSON alert payload to arbitrary webhook URLs
pub struct HttpWebhookSender {
    client: Client,
}

impl HttpWebhookSender {
    pub fn new() -> Result<Self, SenderError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send_webhook(
        &self,
        url: &str,
        monitor_name: &str,
        monitor_url: &str,
        error_message: &str,
    ) -> Result<(), SenderError> {
        let payload = serde_json::json!({
            "event": "monitor.down",
            "monitor": monitor_name,
            "url": monitor_url,
            "error": error_message,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {}. Body: {}",
                status, body
            )));
        }

        debug!(url, "Webhook alert delivered");
        Ok(())
    }
}
