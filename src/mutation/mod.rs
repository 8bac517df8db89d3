//! # Mutation Builders
//!
//! Changes to an element are queued as [`Mutation`] commands and applied in
//! one step by `save()`. Queuing never touches storage and never fails:
//! validation happens when the commands are folded over the element's current
//! state at commit time. Nothing a builder queues is visible to any reader
//! until `save()` returns successfully.
//!
//! - [`VertexBuilder`] / [`EdgeBuilder`] stage a brand-new element.
//! - [`ExistingElementMutation`] stages changes to a persisted element and
//!   keeps the pre-mutation snapshot available through `get_element()`.

pub(crate) mod fold;

use crate::graph::Graph;
use crate::model::{Edge, Metadata, Value, Vertex, DEFAULT_KEY};
use crate::storage::StorageBackend;
use crate::visibility::{Authorizations, Visibility};
use crate::Result;

// ============================================================================
// Commands
// ============================================================================

/// One pending change to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Add or replace the property at `(key, name, visibility)`.
    SetProperty {
        key: String,
        name: String,
        value: Value,
        visibility: Visibility,
        metadata: Metadata,
    },
    /// Remove every readable property with `name` (and `key`, when given).
    RemoveProperties { key: Option<String>, name: String },
    /// Remove exactly one property version.
    RemoveProperty { key: String, name: String, visibility: Visibility },
    /// Move a property to a new visibility. `from` selects the version when
    /// several readable versions share `(key, name)`.
    AlterPropertyVisibility {
        key: String,
        name: String,
        from: Option<Visibility>,
        visibility: Visibility,
    },
    SetPropertyMetadata {
        key: String,
        name: String,
        metadata_name: String,
        value: Value,
        visibility: Visibility,
    },
    AlterElementVisibility { visibility: Visibility },
    MarkPropertyHidden {
        key: String,
        name: String,
        visibility: Visibility,
        hidden: Visibility,
    },
    MarkPropertyVisible {
        key: String,
        name: String,
        visibility: Visibility,
        hidden: Visibility,
    },
}

// ============================================================================
// Builder surface
// ============================================================================

/// Chained command queuing shared by every builder.
pub trait ElementMutation: Sized {
    /// Append a raw command.
    fn with_mutation(self, mutation: Mutation) -> Self;

    /// Queued commands, oldest first.
    fn mutations(&self) -> &[Mutation];

    fn set_property(self, name: impl Into<String>, value: impl Into<Value>, visibility: &Visibility) -> Self {
        self.add_property_value(DEFAULT_KEY, name, value, visibility)
    }

    fn set_property_with_metadata(
        self,
        name: impl Into<String>,
        value: impl Into<Value>,
        metadata: Metadata,
        visibility: &Visibility,
    ) -> Self {
        self.add_property_value_with_metadata(DEFAULT_KEY, name, value, metadata, visibility)
    }

    /// Multivalued add: distinct keys under one name coexist.
    fn add_property_value(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
        visibility: &Visibility,
    ) -> Self {
        self.add_property_value_with_metadata(key, name, value, Metadata::new(), visibility)
    }

    fn add_property_value_with_metadata(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
        metadata: Metadata,
        visibility: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::SetProperty {
            key: key.into(),
            name: name.into(),
            value: value.into(),
            visibility: visibility.clone(),
            metadata,
        })
    }

    /// Remove every readable value of `name`, whatever its key.
    fn remove_property(self, name: impl Into<String>) -> Self {
        self.with_mutation(Mutation::RemoveProperties { key: None, name: name.into() })
    }

    fn remove_property_key(self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.with_mutation(Mutation::RemoveProperties { key: Some(key.into()), name: name.into() })
    }

    /// Remove the single version at `(key, name, visibility)`; absent is an error at save.
    fn remove_property_version(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::RemoveProperty {
            key: key.into(),
            name: name.into(),
            visibility: visibility.clone(),
        })
    }

    fn alter_property_visibility(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::AlterPropertyVisibility {
            key: key.into(),
            name: name.into(),
            from: None,
            visibility: visibility.clone(),
        })
    }

    fn alter_property_visibility_from(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        from: &Visibility,
        visibility: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::AlterPropertyVisibility {
            key: key.into(),
            name: name.into(),
            from: Some(from.clone()),
            visibility: visibility.clone(),
        })
    }

    fn set_property_metadata(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        metadata_name: impl Into<String>,
        value: impl Into<Value>,
        visibility: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::SetPropertyMetadata {
            key: key.into(),
            name: name.into(),
            metadata_name: metadata_name.into(),
            value: value.into(),
            visibility: visibility.clone(),
        })
    }

    fn alter_element_visibility(self, visibility: &Visibility) -> Self {
        self.with_mutation(Mutation::AlterElementVisibility { visibility: visibility.clone() })
    }

    fn mark_property_hidden(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: &Visibility,
        hidden: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::MarkPropertyHidden {
            key: key.into(),
            name: name.into(),
            visibility: visibility.clone(),
            hidden: hidden.clone(),
        })
    }

    fn mark_property_visible(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: &Visibility,
        hidden: &Visibility,
    ) -> Self {
        self.with_mutation(Mutation::MarkPropertyVisible {
            key: key.into(),
            name: name.into(),
            visibility: visibility.clone(),
            hidden: hidden.clone(),
        })
    }
}

// ============================================================================
// New elements
// ============================================================================

/// Payload of a vertex that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVertex;

/// Payload of an edge that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEdge {
    pub(crate) label: String,
    pub(crate) out_vertex_id: String,
    pub(crate) in_vertex_id: String,
}

/// Inert staging area for a new element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBuilder<K> {
    pub(crate) id: Option<String>,
    pub(crate) visibility: Visibility,
    pub(crate) mutations: Vec<Mutation>,
    pub(crate) kind: K,
}

pub type VertexBuilder = ElementBuilder<NewVertex>;
pub type EdgeBuilder = ElementBuilder<NewEdge>;

impl<K> ElementBuilder<K> {
    pub(crate) fn new(id: Option<&str>, visibility: &Visibility, kind: K) -> Self {
        Self {
            id: id.map(str::to_string),
            visibility: visibility.clone(),
            mutations: Vec::new(),
            kind,
        }
    }

    /// Caller-supplied id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }
}

impl<K> ElementMutation for ElementBuilder<K> {
    fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

impl VertexBuilder {
    /// Create the vertex. Fails if `authorizations` cannot read its visibility.
    pub async fn save<B: StorageBackend>(self, graph: &Graph<B>, authorizations: &Authorizations) -> Result<Vertex> {
        graph.commit_new_vertex(self, authorizations).await
    }
}

impl EdgeBuilder {
    pub fn label(&self) -> &str {
        &self.kind.label
    }

    /// Create the edge. Both endpoints must be visible to `authorizations`.
    pub async fn save<B: StorageBackend>(self, graph: &Graph<B>, authorizations: &Authorizations) -> Result<Edge> {
        graph.commit_new_edge(self, authorizations).await
    }
}

// ============================================================================
// Existing elements
// ============================================================================

/// Staged changes to a persisted element.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingElementMutation<T> {
    element: T,
    mutations: Vec<Mutation>,
}

impl<T> ExistingElementMutation<T> {
    pub(crate) fn new(element: T) -> Self {
        Self { element, mutations: Vec::new() }
    }

    /// The snapshot this mutation was prepared from.
    pub fn get_element(&self) -> &T {
        &self.element
    }

    pub(crate) fn into_parts(self) -> (T, Vec<Mutation>) {
        (self.element, self.mutations)
    }
}

impl<T> ElementMutation for ExistingElementMutation<T> {
    fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

impl ExistingElementMutation<Vertex> {
    /// Fold the queued commands over the stored vertex and commit the result.
    pub async fn save<B: StorageBackend>(self, graph: &Graph<B>, authorizations: &Authorizations) -> Result<Vertex> {
        let (vertex, mutations) = self.into_parts();
        graph.commit_existing::<Vertex>(vertex.data.id, mutations, authorizations).await
    }
}

impl ExistingElementMutation<Edge> {
    pub async fn save<B: StorageBackend>(self, graph: &Graph<B>, authorizations: &Authorizations) -> Result<Edge> {
        let (edge, mutations) = self.into_parts();
        graph.commit_existing::<Edge>(edge.data.id, mutations, authorizations).await
    }
}
