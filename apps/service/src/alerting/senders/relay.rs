use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use super::{PushOutcome, PushSender, SenderError};

/// Delivers push notifications through an FCM relay, one request per token
pub struct RelayPushSender {
    client: Client,
    relay_url: String,
    api_key: String,
}

impl RelayPushSender {
    pub fn new(relay_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SenderError> {
        let relay_url = relay_url.into();
        let api_key = api_key.into();
        if relay_url.trim().is_empty() || api_key.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "push relay URL and API key are required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            relay_url,
            api_key,
        })
    }

    async fn send_one(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<(), String> {
        let payload = serde_json::json!({
            "deviceToken": token,
            "title": title,
            "body": body,
            "data": data,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Relay returned {}: {}", status.as_u16(), text));
        }
        Ok(())
    }
}

/// Relay errors that mean the token will never work again
fn is_invalid_token_error(error: &str) -> bool {
    error.contains("invalid") || error.contains("not-registered")
}

fn token_prefix(token: &str) -> &str {
    token.char_indices().nth(10).map_or(token, |(idx, _)| &token[..idx])
}

#[async_trait]
impl PushSender for RelayPushSender {
    async fn send_push(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<PushOutcome, SenderError> {
        let mut outcome = PushOutcome::default();

        for token in tokens {
            match self.send_one(token, title, body, data).await {
                Ok(()) => outcome.succeeded += 1,
                Err(error) => {
                    outcome.failed += 1;
                    warn!(token = %token_prefix(token), %error, "Failed to send push via relay");
                    if is_invalid_token_error(&error) {
                        outcome.invalid_tokens.push(token.clone());
                    }
                }
            }
        }

        info!(succeeded = outcome.succeeded, failed = outcome.failed, "Push notification sent (relay)");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn token_prefix_is_char_safe() {
        assert_eq!(token_prefix("short"), "short");
        assert_eq!(token_prefix("abcdefghijklmnop"), "abcdefghij");
    }

    #[tokio::test]
    async fn counts_successes_and_invalid_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-API-Key", "relay-key"))
            .and(body_partial_json(serde_json::json!({ "deviceToken": "good-token" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "deviceToken": "stale-token" })))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("messaging/registration-token-not-registered"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "deviceToken": "flaky-token" })))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;

        let sender = RelayPushSender::new(server.uri(), "relay-key").unwrap();
        let tokens = vec!["good-token".to_string(), "stale-token".to_string(), "flaky-token".to_string()];
        let data = HashMap::from([("type".to_string(), "test".to_string())]);

        let outcome = sender.send_push(&tokens, "title", "body", &data).await.unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.invalid_tokens, vec!["stale-token".to_string()]);
    }

    #[test]
    fn requires_url_and_key() {
        assert!(RelayPushSender::new("", "key").is_err());
        assert!(RelayPushSender::new("https://relay.example.com", " ").is_err());
    }
}
