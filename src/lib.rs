//! # securegraph — Visibility-Labelled Property Graph
//!
//! An embeddable property graph in which every vertex, edge, property and
//! metadata entry carries a visibility expression, and every read is
//! filtered through the caller's authorizations.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between engine and storage
//! 2. **Views, not rows**: `Vertex` and `Edge` are already filtered for their reader
//! 3. **Deferred commands**: mutations queue and fold atomically on `save()`
//! 4. **Absent, not denied**: reads never reveal whether a hidden element exists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use securegraph::{Authorizations, ElementMutation, Graph, GraphElement, Visibility};
//!
//! # async fn example() -> securegraph::Result<()> {
//! let graph = Graph::open_memory().await?;
//! let a = Visibility::new("a")?;
//! let auths = Authorizations::new(["a"]);
//!
//! let v1 = graph
//!     .prepare_vertex(Some("v1"), &a)
//!     .set_property("name", "Ada", &a)
//!     .save(&graph, &auths)
//!     .await?;
//!
//! let seen = graph.get_vertex(v1.id(), &auths).await?;
//! assert!(seen.is_some());
//! assert!(graph.get_vertex("v1", &Authorizations::empty()).await?.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | `MemoryBackend` | In-memory graph for testing/embedding |

// ============================================================================
// Modules
// ============================================================================

pub mod visibility;
pub mod model;
pub mod mutation;
pub mod storage;
pub mod graph;
pub mod query;
pub mod index;
pub mod path;

// ============================================================================
// Re-exports: Visibility
// ============================================================================

pub use visibility::{can_read, Authorizations, Visibility};

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Direction, Edge, EdgeRef, Element, ElementType, GeoPoint, GeoShape, GraphElement,
    Metadata, MetadataEntry, Property, StreamingValue, Value, ValueType, Vertex, DEFAULT_KEY,
};

// ============================================================================
// Re-exports: Mutation, Storage, Engine
// ============================================================================

pub use mutation::{EdgeBuilder, ElementMutation, ExistingElementMutation, Mutation, VertexBuilder};
pub use storage::{MemoryBackend, StorageBackend, ValueSerializer, JsonValueSerializer};
pub use graph::{Graph, GraphConfig};
pub use query::{Compare, GeoCompare, GraphQuery, PropertyDefinition, ResultIter};
pub use index::{MemorySearchIndex, SearchIndex};
pub use path::PathFinder;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Visibility syntax error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
