use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod email;
pub mod relay;
pub mod voice;
pub mod webhook;

pub use email::SmtpEmailSender;
pub use relay::RelayPushSender;
pub use voice::TwilioVoiceSender;
pub use webhook::HttpWebhookSender;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Escapes text for both the HTML email body and TwiML
pub(crate) fn escape_markup(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Delivers one down alert to one email address
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        monitor_name: &str,
        url: &str,
        error_message: &str,
    ) -> Result<(), SenderError>;
}

/// Posts one down alert to one webhook URL
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send_webhook(
        &self,
        url: &str,
        monitor_name: &str,
        monitor_url: &str,
        error_message: &str,
    ) -> Result<(), SenderError>;
}

/// Places one outbound voice call to one phone number
#[async_trait]
pub trait VoiceCallSender: Send + Sync {
    async fn send_voice_call(&self, to: &str, monitor_name: &str, url: &str) -> Result<(), SenderError>;
}

/// Per-token delivery tally of one push fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Tokens the push service reported as unknown or malformed
    pub invalid_tokens: Vec<String>,
}

/// Sends a push notification to a set of registered devices
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<PushOutcome, SenderError>;
}
