use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reusable, named bag of alert destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactList {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub webhooks: Vec<String>,
}

impl ContactList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            emails: Vec::new(),
            phones: Vec::new(),
            webhooks: Vec::new(),
        }
    }

    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails = emails.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_phones<I, S>(mut self, phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = phones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_webhooks<I, S>(mut self, webhooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.webhooks = webhooks.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Ios,
    Android,
}

impl DevicePlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            DevicePlatform::Ios => "ios",
            DevicePlatform::Android => "android",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ios" => Some(DevicePlatform::Ios),
            "android" => Some(DevicePlatform::Android),
            _ => None,
        }
    }
}

/// Mobile device registered for push alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub token: String,
    pub platform: DevicePlatform,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Milliseconds since the epoch, as stored in every timestamp column
pub fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(DateTime::UNIX_EPOCH)
}
