//! Graph construction parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Streaming values above this many bytes are stored outside the element record.
pub const DEFAULT_LARGE_VALUE_THRESHOLD: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Streaming content longer than this is offloaded through
    /// `StorageBackend::put_large_value`.
    pub large_value_threshold: usize,
    /// Prepended to engine-generated element ids.
    pub id_prefix: Option<String>,
    /// Push committed text to the attached search index.
    pub search_index_enabled: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            large_value_threshold: DEFAULT_LARGE_VALUE_THRESHOLD,
            id_prefix: None,
            search_index_enabled: true,
        }
    }
}

impl GraphConfig {
    pub fn with_large_value_threshold(mut self, bytes: usize) -> Self {
        self.large_value_threshold = bytes;
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    pub fn with_search_index_enabled(mut self, enabled: bool) -> Self {
        self.search_index_enabled = enabled;
        self
    }

    /// Build from flat string settings, as read from a properties file.
    ///
    /// Recognized keys: `maxStreamingPropertyValueTableDataSize`, `idPrefix`,
    /// `search` (`"none"`/`"false"` disables indexing). Unknown keys are ignored.
    pub fn from_map(settings: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = settings.get("maxStreamingPropertyValueTableDataSize") {
            config.large_value_threshold = raw.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!(
                    "maxStreamingPropertyValueTableDataSize must be a byte count, got '{raw}'"
                ))
            })?;
        }
        if let Some(prefix) = settings.get("idPrefix") {
            if !prefix.is_empty() {
                config.id_prefix = Some(prefix.clone());
            }
        }
        if let Some(search) = settings.get("search") {
            config.search_index_enabled = !matches!(search.trim().to_ascii_lowercase().as_str(), "none" | "false" | "off");
        }
        Ok(config)
    }
}
