use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{EmailSender, SenderError, escape_markup};

/// Port on which SMTP speaks TLS from the first byte instead of STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends alert emails through an SMTP relay
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self, SenderError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("invalid from address {}: {}", from, e)))?;

        let builder = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| SenderError::InvalidConfiguration(format!("invalid SMTP host {}: {}", host, e)))?
        .port(port);

        let builder = match (username, password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.to_string(), pass.to_string())),
            _ => builder,
        };

        Ok(Self { transport: builder.build(), from })
    }
}

pub fn alert_subject(monitor_name: &str) -> String {
    format!("🚨 Alert: {} is down", monitor_name)
}

pub fn alert_html(monitor_name: &str, url: &str, error_message: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #dc2626;">Monitor down: {name}</h2>
  <p><strong>URL:</strong> <a href="{url}">{url}</a></p>
  <p><strong>Error:</strong> {error}</p>
  <p><strong>Detected at:</strong> {time}</p>
  <hr style="border: 1px solid #e5e7eb; margin: 20px 0;" />
  <p style="color: #9ca3af; font-size: 12px;">Uptime Monitor - Keep your services running</p>
</div>"#,
        name = escape_markup(monitor_name),
        url = escape_markup(url),
        error = escape_markup(error_message),
        time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(
        &self,
        to: &str,
        monitor_name: &str,
        url: &str,
        error_message: &str,
    ) -> Result<(), SenderError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("invalid recipient {}: {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(alert_subject(monitor_name))
            .header(ContentType::TEXT_HTML)
            .body(alert_html(monitor_name, url, error_message))
            .map_err(|e| SenderError::Smtp(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| SenderError::Smtp(e.to_string()))?;

        debug!(to, "Alert email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_body_escapes_error_text() {
        let html = alert_html("api", "https://api.example.com", "<script>alert(1)</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Monitor down: api"));
    }

    #[test]
    fn subject_names_monitor() {
        assert_eq!(alert_subject("billing"), "🚨 Alert: billing is down");
    }

    #[test]
    fn rejects_bad_from_address() {
        let result = SmtpEmailSender::new("smtp.example.com", 587, None, None, "not an address");
        assert!(matches!(result, Err(SenderError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn rejects_bad_recipient_before_connecting() {
        let sender =
            SmtpEmailSender::new("smtp.example.com", 587, None, None, "noreply@uptimemonitor.com").unwrap();
        let err = sender
            .send_email("definitely not email", "api", "https://api.example.com", "boom")
            .await
            .unwrap_err();
        assert!(matches!(err, SenderError::InvalidConfiguration(_)));
    }
}
