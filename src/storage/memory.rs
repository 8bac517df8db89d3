//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! It uses ordered maps protected by RwLock, so scans come back sorted by id
//! and repeat identically between calls.
//!
//! ## Limitations
//!
//! - **No persistence**: `shutdown()` drops nothing and flushes nothing.
//! - **Snapshot scans**: a cursor captures the matching ids when it is
//!   opened and looks each record up as it is pulled. Records deleted in
//!   between are skipped; records added in between are not seen.
//!
//! Use this backend for:
//! - Testing the engine, query and path finder
//! - Embedding the graph in applications that don't need persistence

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ElementRecord, ElementType, RecordCursor, ScanRange, StorageBackend};
use crate::Result;

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory record storage.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    vertices: RwLock<BTreeMap<String, ElementRecord>>,
    edges: RwLock<BTreeMap<String, ElementRecord>>,
    /// key → content of offloaded streaming values
    large_values: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryInner {
    fn table(&self, element_type: ElementType) -> &RwLock<BTreeMap<String, ElementRecord>> {
        match element_type {
            ElementType::Vertex => &self.vertices,
            ElementType::Edge => &self.edges,
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored large values (for tests and diagnostics).
    pub fn large_value_count(&self) -> usize {
        self.inner.large_values.read().len()
    }

    /// Lazy cursor over `ids`: each record is cloned under a brief read lock
    /// when pulled.
    fn cursor(&self, element_type: ElementType, ids: Vec<String>) -> RecordCursor {
        let inner = Arc::clone(&self.inner);
        Box::new(
            ids.into_iter()
                .filter_map(move |id| inner.table(element_type).read().get(&id).cloned())
                .map(Ok),
        )
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("vertices", &self.inner.vertices.read().len())
            .field("edges", &self.inner.edges.read().len())
            .field("large_values", &self.inner.large_values.read().len())
            .finish()
    }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Element records
    // ========================================================================

    async fn put_element(&self, record: ElementRecord) -> Result<()> {
        self.inner
            .table(record.element_type)
            .write()
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_element(&self, element_type: ElementType, id: &str) -> Result<Option<ElementRecord>> {
        Ok(self.inner.table(element_type).read().get(id).cloned())
    }

    async fn delete_element(&self, element_type: ElementType, id: &str) -> Result<bool> {
        Ok(self.inner.table(element_type).write().remove(id).is_some())
    }

    async fn scan_elements(&self, range: ScanRange) -> Result<RecordCursor> {
        let ids: Vec<String> = {
            let table = self.inner.table(range.element_type).read();
            table.keys().filter(|id| range.contains(id)).cloned().collect()
        };
        Ok(self.cursor(range.element_type, ids))
    }

    async fn get_elements(&self, element_type: ElementType, ids: &[String]) -> Result<RecordCursor> {
        Ok(self.cursor(element_type, ids.to_vec()))
    }

    async fn element_count(&self, element_type: ElementType) -> Result<u64> {
        Ok(self.inner.table(element_type).read().len() as u64)
    }

    // ========================================================================
    // Large values
    // ========================================================================

    async fn put_large_value(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.inner.large_values.write().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_large_value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.large_values.read().get(key).cloned())
    }

    async fn delete_large_value(&self, key: &str) -> Result<bool> {
        Ok(self.inner.large_values.write().remove(key).is_some())
    }
}

// ============================================================================
// Tests
// ============================================================================
