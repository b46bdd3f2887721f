//! Normalize-on-read for the registry document.
//!
//! Every read passes the raw document through [`normalize_document`]. Legacy
//! keys are purged, malformed entries are coerced into records, and the
//! caller is told whether anything changed so it can write the cleaned
//! document back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::licensing::key_codec::{is_legacy, redact};
use crate::licensing::sanitize::sanitize_email;
use crate::types::{parse_timestamp, LicenseRecord, LicenseStatus};

/// Fields mapped onto typed record members; everything else lands in `extra`.
const KNOWN_FIELDS: [&str; 10] = [
    "key",
    "client_name",
    "site",
    "contact_email",
    "status",
    "created",
    "last_seen",
    "site_name",
    "wp_version",
    "plugin_version",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Kept { record: LicenseRecord, repaired: bool },
    Dropped,
}

/// Coerce one raw registry entry. Legacy or blank keys are dropped.
pub fn normalize_record(raw_key: &str, raw: &Value, now: DateTime<Utc>) -> Normalized {
    if raw_key.trim().is_empty() || is_legacy(raw_key) {
        return Normalized::Dropped;
    }

    let empty = Map::new();
    let (fields, mut repaired) = match raw {
        Value::Object(map) => (map, false),
        _ => (&empty, true),
    };

    if fields.get("key").and_then(Value::as_str) != Some(raw_key) {
        repaired = true;
    }

    let client_name = text_field(fields, "client_name", &mut repaired);
    let site = text_field(fields, "site", &mut repaired);

    let contact_email = match fields.get("contact_email") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => {
            let clean = sanitize_email(s);
            if clean != *s {
                repaired = true;
            }
            clean
        }
        Some(_) => {
            repaired = true;
            String::new()
        }
    };

    let status = match fields.get("status") {
        Some(Value::String(s)) => match LicenseStatus::parse(s) {
            Some(status) => {
                if status.as_str() != s.as_str() {
                    repaired = true;
                }
                status
            }
            None => {
                repaired = true;
                LicenseStatus::Inactive
            }
        },
        None => {
            repaired = true;
            LicenseStatus::Active
        }
        Some(_) => {
            repaired = true;
            LicenseStatus::Inactive
        }
    };

    let created_at = match fields.get("created").and_then(Value::as_str).and_then(parse_timestamp) {
        Some(at) => at,
        None => {
            repaired = true;
            now
        }
    };

    let last_seen_at = match fields.get("last_seen") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => {
            let parsed = parse_timestamp(s);
            if parsed.is_none() {
                repaired = true;
            }
            parsed
        }
        Some(_) => {
            repaired = true;
            None
        }
    };

    let extra: Map<String, Value> = fields
        .iter()
        .filter(|(name, _)| !KNOWN_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let record = LicenseRecord {
        key: raw_key.to_string(),
        client_name,
        site,
        contact_email,
        status,
        created_at,
        last_seen_at,
        site_name: optional_text(fields, "site_name"),
        wp_version: optional_text(fields, "wp_version"),
        plugin_version: optional_text(fields, "plugin_version"),
        extra,
    };
    Normalized::Kept { record, repaired }
}

/// Normalize the whole registry document. Returns the surviving records and
/// whether the stored document differs from them.
pub fn normalize_document(
    doc: &Value,
    now: DateTime<Utc>,
) -> (BTreeMap<String, LicenseRecord>, bool) {
    let mut records = BTreeMap::new();
    let entries = match doc {
        Value::Object(entries) => entries,
        Value::Null => return (records, false),
        other => {
            warn!(kind = value_kind(other), "license registry is not a map; treating as empty");
            return (records, false);
        }
    };

    let mut did_update = false;
    for (raw_key, raw) in entries {
        match normalize_record(raw_key, raw, now) {
            Normalized::Kept { record, repaired } => {
                did_update |= repaired;
                records.insert(raw_key.clone(), record);
            }
            Normalized::Dropped => {
                warn!(license = %redact(raw_key), "dropping legacy license from registry");
                did_update = true;
            }
        }
    }
    (records, did_update)
}

fn text_field(fields: &Map<String, Value>, name: &str, repaired: &mut bool) -> String {
    match fields.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => {
            *repaired = true;
            n.to_string()
        }
        Some(_) => {
            *repaired = true;
            String::new()
        }
    }
}

fn optional_text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
