//! # Free-Text Search
//!
//! The search collaborator maps text to candidate element ids. It is never
//! trusted with authorization: it may index every string value of an
//! element, and the engine re-checks each candidate against the reader's
//! view before returning it.

pub mod memory;

use async_trait::async_trait;

use crate::model::ElementType;
use crate::Result;

pub use memory::MemorySearchIndex;

/// External free-text search capability.
#[async_trait]
pub trait SearchIndex: Send + Sync + 'static {
    /// Replace whatever was indexed for `(element_type, id)` with `fields`
    /// (property name, text).
    async fn index_element(&self, element_type: ElementType, id: &str, fields: Vec<(String, String)>) -> Result<()>;

    async fn remove_element(&self, element_type: ElementType, id: &str) -> Result<()>;

    /// Ids of elements whose indexed text contains every term of `text`.
    async fn search(&self, element_type: ElementType, text: &str) -> Result<Vec<String>>;
}

/// Split text into lowercase alphanumeric terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
