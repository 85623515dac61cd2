use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::alerting::senders::{HttpWebhookSender, RelayPushSender, SenderError, SmtpEmailSender, TwilioVoiceSender};
use crate::alerting::AlertDispatcher;
use crate::monitoring::RetryConfig;
use crate::orchestrator::RetentionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read { path: path::PathBuf, source: std::io::Error },
    #[error("Failed to write config file {path}: {source}")]
    Write { path: path::PathBuf, source: std::io::Error },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("No config directory available ($XDG_CONFIG_HOME and $HOME are unset)")]
    PathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
    pub scheduler: SchedulerConfig,
    pub retention: RetentionPolicy,
    pub server: ServerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "uptime.db".into(), pool_size: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock ceiling for one batch
    pub execution_budget_secs: u64,
    /// Tick of the `watch` command
    pub watch_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { execution_budget_secs: 55, watch_interval_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Bearer token required on `POST /checks/run` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080, cron_secret: None }
    }
}

/// SMTP relay; port 465 speaks implicit TLS, anything else STARTTLS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".into(),
            port: 587,
            username: None,
            password: None,
            from: "noreply@uptimemonitor.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: "https://api.twilio.com".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub relay_url: String,
    pub api_key: String,
    /// Push to every device when a monitor goes down
    pub notify_on_down: bool,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uptime-engine/config.toml or
/// $HOME/.config/...)
pub fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("uptime-engine/config.toml"))
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw, "Ignoring unparseable environment override");
            None
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let secret = |set: bool| if set { "<set>" } else { "<unset>" };

        writeln!(f, "Current Engine Configuration:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Pool Size", &self.database.pool_size)?;

        write_title_1(f, "Retry")?;
        write_1(f, "Retries", &self.retry.retry_count)?;
        write_1(f, "Initial Delay (ms)", &self.retry.initial_delay_ms)?;
        write_1(f, "Multiplier", &self.retry.multiplier)?;
        write_1(f, "Max Delay (ms)", &self.retry.max_delay_ms)?;

        write_title_1(f, "Scheduler")?;
        write_1(f, "Execution Budget (s)", &self.scheduler.execution_budget_secs)?;
        write_1(f, "Watch Interval (s)", &self.scheduler.watch_interval_secs)?;
        write_1(f, "Check History (days)", &self.retention.check_history_days)?;

        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_1(f, "Cron Secret", &secret(self.server.cron_secret.is_some()))?;

        write_title_1(f, "Channels")?;
        match &self.email {
            Some(email) => write_1(f, "Email", &format!("{}:{} from {}", email.host, email.port, email.from))?,
            None => write_1(f, "Email", &"disabled")?,
        }
        match &self.voice {
            Some(voice) => write_1(f, "Voice", &format!("twilio {}", voice.from_number))?,
            None => write_1(f, "Voice", &"disabled")?,
        }
        match &self.push {
            Some(push) => write_1(
                f,
                "Push",
                &format!("relay {} (api key {}, on down: {})", push.relay_url, secret(!push.api_key.is_empty()), push.notify_on_down),
            )?,
            None => write_1(f, "Push", &"disabled")?,
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uptime-engine/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// use std::path;
    /// use uptime_engine::config;
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::Read { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| env::var(key).ok());
    }

    /// Apply overrides from `lookup`; values that fail to parse are ignored
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = path;
        }

        if let Some(v) = lookup("RETRY_COUNT").and_then(|raw| parse_env("RETRY_COUNT", &raw)) {
            self.retry.retry_count = v;
        }
        if let Some(v) = lookup("RETRY_INITIAL_DELAY").and_then(|raw| parse_env("RETRY_INITIAL_DELAY", &raw)) {
            self.retry.initial_delay_ms = v;
        }
        if let Some(v) = lookup("RETRY_MULTIPLIER").and_then(|raw| parse_env("RETRY_MULTIPLIER", &raw)) {
            self.retry.multiplier = v;
        }
        if let Some(v) = lookup("RETRY_MAX_DELAY").and_then(|raw| parse_env("RETRY_MAX_DELAY", &raw)) {
            self.retry.max_delay_ms = v;
        }
        if let Some(v) = lookup("EXECUTION_BUDGET_SECS").and_then(|raw| parse_env("EXECUTION_BUDGET_SECS", &raw)) {
            self.scheduler.execution_budget_secs = v;
        }

        if let Some(secret) = lookup("CRON_SECRET").filter(|s| !s.is_empty()) {
            self.server.cron_secret = Some(secret);
        }

        let email_keys = ["EMAIL_HOST", "EMAIL_PORT", "EMAIL_USER", "EMAIL_PASSWORD", "EMAIL_FROM"];
        if email_keys.into_iter().any(|key| lookup(key).is_some()) {
            let email = self.email.get_or_insert_with(EmailConfig::default);
            if let Some(host) = lookup("EMAIL_HOST") {
                email.host = host;
            }
            if let Some(port) = lookup("EMAIL_PORT").and_then(|raw| parse_env("EMAIL_PORT", &raw)) {
                email.port = port;
            }
            if let Some(user) = lookup("EMAIL_USER") {
                email.username = Some(user);
            }
            if let Some(password) = lookup("EMAIL_PASSWORD") {
                email.password = Some(password);
            }
            if let Some(from) = lookup("EMAIL_FROM") {
                email.from = from;
            }
        }

        let voice_keys = ["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_PHONE_NUMBER"];
        if voice_keys.into_iter().any(|key| lookup(key).is_some()) {
            let voice = self.voice.get_or_insert_with(VoiceConfig::default);
            if let Some(sid) = lookup("TWILIO_ACCOUNT_SID") {
                voice.account_sid = sid;
            }
            if let Some(token) = lookup("TWILIO_AUTH_TOKEN") {
                voice.auth_token = token;
            }
            if let Some(number) = lookup("TWILIO_PHONE_NUMBER") {
                voice.from_number = number;
            }
        }

        if ["FCM_RELAY_URL", "FCM_RELAY_API_KEY"].into_iter().any(|key| lookup(key).is_some()) {
            let push = self.push.get_or_insert_with(PushConfig::default);
            if let Some(url) = lookup("FCM_RELAY_URL") {
                push.relay_url = url;
            }
            if let Some(key) = lookup("FCM_RELAY_API_KEY") {
                push.api_key = key;
            }
        }
    }

    pub fn execution_budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scheduler.execution_budget_secs)
    }

    /// Dispatcher wired with every configured channel.
    ///
    /// Webhooks need no credentials and are always available.
    pub fn alert_dispatcher(&self) -> Result<AlertDispatcher, SenderError> {
        let mut dispatcher = AlertDispatcher::new().with_webhook(std::sync::Arc::new(HttpWebhookSender::new()?));

        if let Some(email) = &self.email {
            let sender = SmtpEmailSender::new(
                &email.host,
                email.port,
                email.username.as_deref(),
                email.password.as_deref(),
                &email.from,
            )?;
            dispatcher = dispatcher.with_email(std::sync::Arc::new(sender));
        }

        if let Some(voice) = &self.voice {
            let sender = TwilioVoiceSender::new(
                voice.api_base.as_str(),
                voice.account_sid.as_str(),
                voice.auth_token.as_str(),
                voice.from_number.as_str(),
            )?;
            dispatcher = dispatcher.with_voice(std::sync::Arc::new(sender));
        }

        Ok(dispatcher)
    }

    /// Relay push sender, if push is configured
    pub fn push_sender(&self) -> Result<Option<RelayPushSender>, SenderError> {
        self.push
            .as_ref()
            .map(|push| RelayPushSender::new(push.relay_url.as_str(), push.api_key.as_str()))
            .transpose()
    }
}
