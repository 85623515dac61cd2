use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{SenderError, VoiceCallSender, escape_markup};

/// Places alert calls through the Twilio REST API
pub struct TwilioVoiceSender {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioVoiceSender {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Result<Self, SenderError> {
        let account_sid = account_sid.into();
        let from_number = from_number.into();
        if account_sid.trim().is_empty() || from_number.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Twilio account SID and caller number are required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account_sid,
            auth_token: auth_token.into(),
            from_number,
        })
    }

    fn calls_endpoint(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Calls.json", self.api_base, self.account_sid)
    }
}

/// TwiML read out to whoever picks up
pub fn alert_twiml(monitor_name: &str, url: &str) -> String {
    format!(
        "<Response><Say voice=\"alice\">Alert. Your monitor {} is down. The endpoint {} is not responding. \
         Please check your service.</Say><Pause length=\"1\"/><Say voice=\"alice\">Repeating. Monitor {} is down.</Say></Response>",
        escape_markup(monitor_name),
        escape_markup(url),
        escape_markup(monitor_name)
    )
}

#[async_trait]
impl VoiceCallSender for TwilioVoiceSender {
    async fn send_voice_call(&self, to: &str, monitor_name: &str, url: &str) -> Result<(), SenderError> {
        let twiml = alert_twiml(monitor_name, url);
        let form = [("To", to), ("From", self.from_number.as_str()), ("Twiml", twiml.as_str())];

        let response = self
            .client
            .post(self.calls_endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SenderError::SendFailed(format!("Twilio returned {}: {}", status, body)));
        }

        debug!(to, "Voice call queued");
        Ok(())
    }
}
