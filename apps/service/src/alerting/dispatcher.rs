use std::sync::Arc;
use tracing::{error, info, warn};

use super::contacts::ContactSet;
use super::senders::{EmailSender, VoiceCallSender, WebhookSender};
use crate::monitoring::types::Monitor;

/// Tally of one fan-out, across every channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Contacts on a channel with no configured sender
    pub skipped: usize,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Sends one down alert per contact per channel.
///
/// Every send is isolated: a failed delivery is logged and the remaining
/// contacts are still attempted. Nothing here retries.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    email: Option<Arc<dyn EmailSender>>,
    webhook: Option<Arc<dyn WebhookSender>>,
    voice: Option<Arc<dyn VoiceCallSender>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email = Some(sender);
        self
    }

    pub fn with_webhook(mut self, sender: Arc<dyn WebhookSender>) -> Self {
        self.webhook = Some(sender);
        self
    }

    pub fn with_voice(mut self, sender: Arc<dyn VoiceCallSender>) -> Self {
        self.voice = Some(sender);
        self
    }

    pub async fn dispatch(&self, monitor: &Monitor, contacts: &ContactSet, error_message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        match &self.email {
            Some(sender) => {
                for to in &contacts.emails {
                    match sender.send_email(to, &monitor.name, &monitor.url, error_message).await {
                        Ok(()) => report.sent += 1,
                        Err(e) => {
                            report.failed += 1;
                            error!(monitor = %monitor.name, to = %to, error = %e, "Failed to send alert email");
                        }
                    }
                }
            }
            None => skip_channel(&mut report, "email", contacts.emails.len(), &monitor.name),
        }

        match &self.webhook {
            Some(sender) => {
                for url in &contacts.webhooks {
                    match sender.send_webhook(url, &monitor.name, &monitor.url, error_message).await {
                        Ok(()) => report.sent += 1,
                        Err(e) => {
                            report.failed += 1;
                            error!(monitor = %monitor.name, webhook = %url, error = %e, "Failed to send alert webhook");
                        }
                    }
                }
            }
            None => skip_channel(&mut report, "webhook", contacts.webhooks.len(), &monitor.name),
        }

        match &self.voice {
            Some(sender) => {
                for to in &contacts.phones {
                    match sender.send_voice_call(to, &monitor.name, &monitor.url).await {
                        Ok(()) => report.sent += 1,
                        Err(e) => {
                            report.failed += 1;
                            error!(monitor = %monitor.name, to = %to, error = %e, "Failed to place alert call");
                        }
                    }
                }
            }
            None => skip_channel(&mut report, "voice", contacts.phones.len(), &monitor.name),
        }

        info!(
            monitor = %monitor.name,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Alerts dispatched"
        );
        report
    }
}

fn skip_channel(report: &mut DispatchReport, channel: &str, count: usize, monitor_name: &str) {
    if count > 0 {
        warn!(monitor = %monitor_name, channel, count, "Alert channel not configured, skipping contacts");
        report.skipped += count;
    }
}
