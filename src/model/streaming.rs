//! Large property values, materialized lazily.
//!
//! A `StreamingValue` starts out inline. When an element is committed and the
//! content exceeds the graph's large-value threshold, the content is written
//! through [`StorageBackend::put_large_value`] and the property keeps only an
//! external reference. Reading an external value fetches the content from the
//! backend on every call, so repeated reads return identical bytes.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ValueType;
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// Where the content of a streaming value lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StreamSource {
    Inline { data: Vec<u8> },
    External { key: String, length: u64 },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StreamingValue {
    value_type: ValueType,
    source: StreamSource,
    #[serde(skip)]
    store: Option<Arc<dyn StorageBackend>>,
}

impl StreamingValue {
    pub fn from_bytes(data: impl Into<Vec<u8>>, value_type: ValueType) -> Self {
        Self {
            value_type,
            source: StreamSource::Inline { data: data.into() },
            store: None,
        }
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self::from_bytes(s.into().into_bytes(), ValueType::String)
    }

    /// Drain `reader` into a new inline value.
    pub fn from_reader(mut reader: impl Read, value_type: ValueType) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data, value_type))
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn source(&self) -> &StreamSource {
        &self.source
    }

    pub fn is_external(&self) -> bool {
        matches!(self.source, StreamSource::External { .. })
    }

    pub fn len(&self) -> u64 {
        match &self.source {
            StreamSource::Inline { data } => data.len() as u64,
            StreamSource::External { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the full content.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            StreamSource::Inline { data } => Ok(data.clone()),
            StreamSource::External { key, length } => {
                let store = self.store.as_ref().ok_or_else(|| {
                    Error::StorageError(format!("large value '{key}' has no attached store"))
                })?;
                let data = store
                    .get_large_value(key)
                    .await?
                    .ok_or_else(|| Error::StorageError(format!("large value '{key}' is missing")))?;
                if data.len() as u64 != *length {
                    return Err(Error::StorageError(format!(
                        "large value '{key}' has {} bytes, expected {length}",
                        data.len()
                    )));
                }
                Ok(data)
            }
        }
    }

    /// Materialize the content as UTF-8 text.
    pub async fn read_to_string(&self) -> Result<String> {
        String::from_utf8(self.read().await?)
            .map_err(|e| Error::InvalidArgument(format!("streaming value is not UTF-8: {e}")))
    }

    pub(crate) fn inline_data(&self) -> Option<&[u8]> {
        match &self.source {
            StreamSource::Inline { data } => Some(data),
            StreamSource::External { .. } => None,
        }
    }

    pub(crate) fn external_key(&self) -> Option<&str> {
        match &self.source {
            StreamSource::External { key, .. } => Some(key),
            StreamSource::Inline { .. } => None,
        }
    }

    pub(crate) fn externalize(&mut self, key: String, store: Arc<dyn StorageBackend>) {
        let length = self.len();
        self.source = StreamSource::External { key, length };
        self.store = Some(store);
    }

    pub(crate) fn attach_store(&mut self, store: Arc<dyn StorageBackend>) {
        if self.is_external() {
            self.store = Some(store);
        }
    }
}

impl PartialEq for StreamingValue {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type && self.source == other.source
    }
}

impl fmt::Debug for StreamingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StreamingValue");
        s.field("value_type", &self.value_type);
        match &self.source {
            StreamSource::Inline { data } => s.field("inline_len", &data.len()),
            StreamSource::External { key, length } => s.field("external", key).field("len", length),
        };
        s.finish()
    }
}
