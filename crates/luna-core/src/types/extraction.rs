use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a request's license came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    ExplicitParam,
    LegacyParam,
    PathSegment,
    None,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitParam => "explicit_param",
            Self::LegacyParam => "legacy_param",
            Self::PathSegment => "path_segment",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort license pulled from one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseExtraction {
    pub license: String,
    pub source: ExtractionSource,
}

impl LicenseExtraction {
    pub fn none() -> Self {
        Self {
            license: String::new(),
            source: ExtractionSource::None,
        }
    }

    pub fn new(license: impl Into<String>, source: ExtractionSource) -> Self {
        Self {
            license: license.into(),
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.license.is_empty()
    }

    /// Whether the key must be written back into the `license` slot.
    pub fn needs_normalization(&self) -> bool {
        !self.is_empty() && self.source != ExtractionSource::ExplicitParam
    }
}
