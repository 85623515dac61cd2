use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;

use super::types::CheckResult;

/// Maximum redirect hops followed before a probe is classified as failed
pub const MAX_REDIRECTS: usize = 5;

/// A single bounded probe of an endpoint.
///
/// Implementations never fail: every outcome, including transport errors,
/// is reported through `CheckResult::success`.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> CheckResult;
}

/// HTTP/HTTPS prober issuing one GET per call
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("uptime-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
        if error.is_timeout() {
            format!("Request timed out after {}ms", timeout.as_millis())
        } else if error.is_redirect() {
            format!("Too many redirects (limit {})", MAX_REDIRECTS)
        } else if error.is_connect() {
            format!("Connection failed: {}", error)
        } else if error.is_builder() {
            format!("Invalid request: {}", error)
        } else {
            format!("HTTP request failed: {}", error)
        }
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> CheckResult {
        let start = Instant::now();

        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let latency = start.elapsed().as_millis() as u64;
                let status = response.status();

                // 2xx and 3xx count as up
                if status.is_success() || status.is_redirection() {
                    CheckResult::success(latency, status.as_u16())
                } else {
                    CheckResult::failure(
                        latency,
                        Some(status.as_u16()),
                        format!("HTTP check failed with status code: {}", status.as_u16()),
                    )
                }
            }
            Err(e) => {
                let latency = start.elapsed().as_millis() as u64;
                CheckResult::failure(
                    latency,
                    e.status().map(|s| s.as_u16()),
                    Self::describe_error(&e, timeout),
                )
            }
        }
    }
}
