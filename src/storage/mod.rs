//! # Storage Backend Trait
//!
//! The contract between the graph engine and whatever persists its records.
//! The engine serializes elements into [`ElementRecord`]s and applies all
//! visibility filtering itself; a backend only stores, fetches and scans
//! records by `(element type, id)`.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory for testing/embedding |

pub mod memory;
pub mod record;
pub mod serializer;

use async_trait::async_trait;

use crate::Result;

pub use crate::model::ElementType;
pub use memory::MemoryBackend;
pub use record::{EdgeEndpoints, ElementRecord, MetadataRecord, PropertyRecord};
pub use serializer::{JsonValueSerializer, ValueSerializer};

// ============================================================================
// Scans
// ============================================================================

/// Lazy sequence of records. Holds no backend lock between items, so a
/// consumer may stop pulling at any point.
pub type RecordCursor = Box<dyn Iterator<Item = Result<ElementRecord>> + Send>;

/// Id range over one element type. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub element_type: ElementType,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ScanRange {
    /// Every element of `element_type`.
    pub fn all(element_type: ElementType) -> Self {
        Self { element_type, start: None, end: None }
    }

    pub fn between(element_type: ElementType, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { element_type, start: Some(start.into()), end: Some(end.into()) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.start.as_deref().is_none_or(|s| id >= s) && self.end.as_deref().is_none_or(|e| id < e)
    }
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The storage collaborator.
///
/// Writes to one record are serialized by the engine; a backend need not
/// provide any cross-record atomicity. Errors are surfaced to callers
/// unchanged.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the backend, flushing any pending writes.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Element records
    // ========================================================================

    /// Insert or overwrite the record at `(record.element_type, record.id)`.
    async fn put_element(&self, record: ElementRecord) -> Result<()>;

    async fn get_element(&self, element_type: ElementType, id: &str) -> Result<Option<ElementRecord>>;

    /// Delete a record. Returns true if it existed.
    async fn delete_element(&self, element_type: ElementType, id: &str) -> Result<bool>;

    /// Scan records whose id falls in `range`, in a stable order.
    async fn scan_elements(&self, range: ScanRange) -> Result<RecordCursor>;

    /// Fetch several records by id, skipping ids that do not exist.
    ///
    /// Default falls back to sequential `get_element` calls.
    async fn get_elements(&self, element_type: ElementType, ids: &[String]) -> Result<RecordCursor> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_element(element_type, id).await? {
                records.push(Ok(record));
            }
        }
        Ok(Box::new(records.into_iter()))
    }

    /// Number of stored records of `element_type`, visible or not.
    async fn element_count(&self, element_type: ElementType) -> Result<u64>;

    // ========================================================================
    // Large values
    // ========================================================================

    /// Store content referenced by a streaming property value.
    async fn put_large_value(&self, key: &str, data: Vec<u8>) -> Result<()>;

    async fn get_large_value(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns true if the content existed.
    async fn delete_large_value(&self, key: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_range_bounds() {
        let r = ScanRange::between(ElementType::Vertex, "b", "d");
        assert!(!r.contains("a"));
        assert!(r.contains("b"));
        assert!(r.contains("c9"));
        assert!(!r.contains("d"));
        assert!(ScanRange::all(ElementType::Edge).contains("anything"));
    }
}
