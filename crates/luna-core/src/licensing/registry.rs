//! LicenseRegistry — the registry document behind an injected option store.
//!
//! Reads are self-healing: the document is normalized on every read and
//! written back when anything was repaired. Writes apply the same cleaning.
//! There is no optimistic concurrency; the last writer wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::SeedLicense;
use crate::errors::StorageError;
use crate::traits::{Clock, IOptionStore};
use crate::types::{ActivationDetails, LicenseRecord, LicenseStatus};

use super::key_codec::{self, is_legacy, redact};
use super::migrator::normalize_document;
use super::sanitize::sanitize_email;

pub struct LicenseRegistry {
    store: Arc<dyn IOptionStore>,
    option_name: String,
    clock: Arc<dyn Clock>,
}

impl LicenseRegistry {
    pub fn new(store: Arc<dyn IOptionStore>, option_name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            option_name: option_name.into(),
            clock,
        }
    }

    pub fn option_name(&self) -> &str {
        &self.option_name
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Every live record, keyed by license key.
    pub fn all(&self) -> Result<BTreeMap<String, LicenseRecord>, StorageError> {
        let raw = self
            .store
            .get_option(&self.option_name)?
            .unwrap_or(Value::Null);
        let (records, did_update) = normalize_document(&raw, self.clock.now());
        if did_update {
            info!(records = records.len(), "license registry repaired on read");
            self.write(&records)?;
        }
        Ok(records)
    }

    /// Replace the whole registry. Legacy keys are dropped, each record's key
    /// is forced to its map key and emails are sanitized.
    pub fn replace_all(&self, records: BTreeMap<String, LicenseRecord>) -> Result<(), StorageError> {
        let cleaned: BTreeMap<String, LicenseRecord> = records
            .into_iter()
            .filter(|(key, _)| {
                let keep = !key.trim().is_empty() && !is_legacy(key);
                if !keep {
                    warn!(license = %redact(key), "refusing to store legacy license");
                }
                keep
            })
            .map(|(key, mut record)| {
                record.key = key.clone();
                record.contact_email = sanitize_email(&record.contact_email);
                (key, record)
            })
            .collect();
        self.write(&cleaned)
    }

    /// Exact-match lookup. Legacy keys never resolve.
    pub fn lookup(&self, key: &str) -> Result<Option<LicenseRecord>, StorageError> {
        if key.is_empty() || is_legacy(key) {
            return Ok(None);
        }
        let mut records = self.all()?;
        if let Some(record) = records.remove(key) {
            return Ok(Some(record));
        }
        Ok(records.into_values().find(|r| r.key == key))
    }

    /// New inactive license with a fresh key.
    pub fn create(&self, client_name: &str, site: &str, contact_email: &str) -> Result<LicenseRecord, StorageError> {
        self.create_with_key(client_name, site, &key_codec::generate(), LicenseStatus::Inactive, contact_email)
    }

    /// Store a license under `key`. A legacy key is replaced by a fresh one.
    pub fn create_with_key(
        &self,
        client_name: &str,
        site: &str,
        key: &str,
        status: LicenseStatus,
        contact_email: &str,
    ) -> Result<LicenseRecord, StorageError> {
        let key = if is_legacy(key) || key.trim().is_empty() {
            warn!(license = %redact(key), "legacy license creation discarded; generating a new key");
            key_codec::generate()
        } else {
            key.to_string()
        };
        let record = LicenseRecord::new(
            key.clone(),
            client_name,
            site,
            sanitize_email(contact_email),
            status,
            self.clock.now(),
        );
        let mut records = self.all()?;
        records.insert(key.clone(), record.clone());
        self.write(&records)?;
        info!(license = %redact(&key), client = client_name, "license created");
        Ok(record)
    }

    /// Remove a license. Returns the removed record.
    pub fn remove(&self, key: &str) -> Result<Option<LicenseRecord>, StorageError> {
        let mut records = self.all()?;
        let removed = records.remove(key);
        if removed.is_some() {
            self.write(&records)?;
            info!(license = %redact(key), "license removed");
        }
        Ok(removed)
    }

    /// Apply `f` to a record and persist. Unknown keys write nothing.
    pub fn update<F>(&self, key: &str, f: F) -> Result<Option<LicenseRecord>, StorageError>
    where
        F: FnOnce(&mut LicenseRecord),
    {
        if is_legacy(key) {
            return Ok(None);
        }
        let mut records = self.all()?;
        let Some(record) = records.get_mut(key) else {
            debug!(license = %redact(key), "update on unknown license ignored");
            return Ok(None);
        };
        f(record);
        record.key = key.to_string();
        record.contact_email = sanitize_email(&record.contact_email);
        let updated = record.clone();
        self.write(&records)?;
        Ok(Some(updated))
    }

    pub fn set_status(&self, key: &str, status: LicenseStatus) -> Result<Option<LicenseRecord>, StorageError> {
        self.update(key, |record| record.status = status)
    }

    /// Activation call from a client site: mark active, refresh site details.
    pub fn record_activation(
        &self,
        key: &str,
        details: &ActivationDetails,
    ) -> Result<Option<LicenseRecord>, StorageError> {
        let now = self.clock.now();
        self.update(key, |record| {
            record.status = LicenseStatus::Active;
            record.last_seen_at = Some(now);
            if !details.site.is_empty() {
                record.site = details.site.clone();
            }
            if details.site_name.is_some() {
                record.site_name = details.site_name.clone();
            }
            if details.wp_version.is_some() {
                record.wp_version = details.wp_version.clone();
            }
            if details.plugin_version.is_some() {
                record.plugin_version = details.plugin_version.clone();
            }
        })
    }

    /// Heartbeat from a client site: stamp last-seen, force active.
    pub fn record_heartbeat(&self, key: &str) -> Result<Option<LicenseRecord>, StorageError> {
        let now = self.clock.now();
        self.update(key, |record| {
            record.status = LicenseStatus::Active;
            record.last_seen_at = Some(now);
        })
    }

    /// Install the seeds into an empty registry. Returns how many were added.
    pub fn seed_if_empty(&self, seeds: &[SeedLicense]) -> Result<usize, StorageError> {
        if !self.all()?.is_empty() {
            return Ok(0);
        }
        self.ensure_seeded(seeds)
    }

    /// Add every seed license that is missing. Existing records are untouched.
    pub fn ensure_seeded(&self, seeds: &[SeedLicense]) -> Result<usize, StorageError> {
        let mut records = self.all()?;
        let now = self.clock.now();
        let mut added = 0;
        for seed in seeds {
            if is_legacy(&seed.key) || records.contains_key(&seed.key) {
                continue;
            }
            records.insert(
                seed.key.clone(),
                LicenseRecord::new(
                    seed.key.clone(),
                    seed.client_name.clone(),
                    seed.site.clone(),
                    sanitize_email(&seed.contact_email),
                    seed.status,
                    now,
                ),
            );
            added += 1;
        }
        if added > 0 {
            self.write(&records)?;
            info!(added, "seed licenses installed");
        }
        Ok(added)
    }

    fn write(&self, records: &BTreeMap<String, LicenseRecord>) -> Result<(), StorageError> {
        let doc: Map<String, Value> = records
            .iter()
            .map(|(key, record)| (key.clone(), record.to_document()))
            .collect();
        self.store.set_option(&self.option_name, &Value::Object(doc))
    }
}
