//! License registry configuration and seed licenses.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::licensing::key_codec;
use crate::types::LicenseStatus;

/// A license installed when the registry is empty or missing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedLicense {
    pub key: String,
    pub client_name: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub status: LicenseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Name of the option document holding the registry.
    pub option_name: String,
    /// Licenses every deployment must carry.
    pub seed_licenses: Vec<SeedLicense>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            option_name: "vl_licenses_registry".to_string(),
            seed_licenses: vec![
                seed(
                    "VL-GC5K-YKBM-BM5F",
                    "Commonwealth Health Services",
                    "https://commonwealthhealthservices.com",
                    "admin@commonwealthhealthservices.com",
                ),
                seed(
                    "VL-VYAK-9BPQ-NKCC",
                    "Commonwealth Health Services",
                    "https://commonwealthhealthservices.com",
                    "admin@commonwealthhealthservices.com",
                ),
                seed(
                    "VL-H2K3-ZFQK-DKDC",
                    "Site Assembly",
                    "https://siteassembly.com",
                    "admin@siteassembly.com",
                ),
                seed(
                    "VL-AWJJ-8J6S-GD6R",
                    "Visible Light",
                    "https://visiblelight.ai",
                    "admin@visiblelight.ai",
                ),
            ],
        }
    }
}

fn seed(key: &str, client: &str, site: &str, email: &str) -> SeedLicense {
    SeedLicense {
        key: key.to_string(),
        client_name: client.to_string(),
        site: site.to_string(),
        contact_email: email.to_string(),
        status: LicenseStatus::Active,
    }
}

impl RegistryConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.option_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "registry.option_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        for seed in &self.seed_licenses {
            if key_codec::is_legacy(&seed.key) || !key_codec::is_canonical(&seed.key) {
                return Err(ConfigError::Invalid {
                    field: "registry.seed_licenses".to_string(),
                    reason: format!("seed key {} is not a canonical license key", seed.key),
                });
            }
        }
        Ok(())
    }
}
