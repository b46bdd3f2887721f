//! License records as stored in the registry document.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Timestamp layout used by the registry document.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Active,
    Inactive,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Case-insensitive parse of a stored status string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the license registry.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseRecord {
    pub key: String,
    pub client_name: String,
    pub site: String,
    /// Validated email or empty.
    pub contact_email: String,
    pub status: LicenseStatus,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub site_name: Option<String>,
    pub wp_version: Option<String>,
    pub plugin_version: Option<String>,
    /// Fields written by other tools, carried through untouched.
    pub extra: Map<String, Value>,
}

impl LicenseRecord {
    pub fn new(
        key: impl Into<String>,
        client_name: impl Into<String>,
        site: impl Into<String>,
        contact_email: impl Into<String>,
        status: LicenseStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            client_name: client_name.into(),
            site: site.into(),
            contact_email: contact_email.into(),
            status,
            created_at,
            last_seen_at: None,
            site_name: None,
            wp_version: None,
            plugin_version: None,
            extra: Map::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    /// Serialize into the registry document shape.
    pub fn to_document(&self) -> Value {
        let mut doc = self.extra.clone();
        doc.insert("key".into(), Value::String(self.key.clone()));
        doc.insert("client_name".into(), Value::String(self.client_name.clone()));
        doc.insert("site".into(), Value::String(self.site.clone()));
        doc.insert("contact_email".into(), Value::String(self.contact_email.clone()));
        doc.insert("status".into(), Value::String(self.status.as_str().to_string()));
        doc.insert("created".into(), Value::String(format_timestamp(&self.created_at)));
        doc.insert(
            "last_seen".into(),
            self.last_seen_at
                .as_ref()
                .map(|t| Value::String(format_timestamp(t)))
                .unwrap_or(Value::Null),
        );
        for (field, value) in [
            ("site_name", &self.site_name),
            ("wp_version", &self.wp_version),
            ("plugin_version", &self.plugin_version),
        ] {
            match value {
                Some(v) => doc.insert(field.into(), Value::String(v.clone())),
                None => doc.remove(field),
            };
        }
        Value::Object(doc)
    }
}

/// Site details reported by an activation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationDetails {
    pub site: String,
    pub site_name: Option<String>,
    pub wp_version: Option<String>,
    pub plugin_version: Option<String>,
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts the registry layout and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
