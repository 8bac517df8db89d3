//! # Graph Engine
//!
//! `Graph` owns element lifecycle: it creates, fetches, mutates, hides and
//! removes vertices and edges, and opens queries and path searches. Every
//! read is filtered through the caller's authorizations; every commit is
//! checked against them.
//!
//! Reads degrade to "absent": an element that does not exist and one the
//! caller may not see are indistinguishable. Writes surface errors.

pub mod config;
pub(crate) mod codec;
pub(crate) mod locks;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::index::SearchIndex;
use crate::model::{
    Direction, Edge, EdgeRef, Element, ElementData, ElementType, GraphElement, StreamSource, StreamingValue, Value,
    Vertex,
};
use crate::mutation::{fold, EdgeBuilder, ElementBuilder, Mutation, NewEdge, NewVertex, VertexBuilder};
use crate::path::PathFinder;
use crate::query::{GraphQuery, PropertyDefinition, QuerySource, ResultIter};
use crate::storage::{
    EdgeEndpoints, ElementRecord, JsonValueSerializer, MemoryBackend, ScanRange, StorageBackend,
    ValueSerializer,
};
use crate::visibility::{Authorizations, Visibility};
use crate::{Error, Result};

use codec::{large_value_key, Codec, FromRaw, RawElement};
use locks::ElementLocks;

pub use config::GraphConfig;

// ============================================================================
// Graph
// ============================================================================

/// The primary entry point. A `Graph` wraps a storage backend and enforces
/// visibility on everything that passes through it.
pub struct Graph<B: StorageBackend> {
    backend: Arc<B>,
    config: GraphConfig,
    codec: Codec,
    search: Option<Arc<dyn SearchIndex>>,
    definitions: RwLock<HashMap<String, PropertyDefinition>>,
    locks: ElementLocks,
}

/// In-memory graph for testing and embedding.
impl Graph<MemoryBackend> {
    pub async fn open_memory() -> Result<Self> {
        Ok(Self::with_backend(MemoryBackend::new()))
    }
}

impl<B: StorageBackend> Graph<B> {
    /// Create a Graph with the given backend and default configuration.
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, GraphConfig::default())
    }

    pub fn new(backend: B, config: GraphConfig) -> Self {
        let backend = Arc::new(backend);
        let store: Arc<dyn StorageBackend> = backend.clone();
        Self {
            codec: Codec::new(Arc::new(JsonValueSerializer), store),
            backend,
            config,
            search: None,
            definitions: RwLock::new(HashMap::new()),
            locks: ElementLocks::new(),
        }
    }

    /// Replace the value serializer. Must match the one existing records were written with.
    pub fn with_serializer(mut self, serializer: Arc<dyn ValueSerializer>) -> Self {
        self.codec = Codec::new(serializer, self.store());
        self
    }

    /// Attach a free-text search collaborator.
    pub fn with_search_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(index);
        self
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.backend.shutdown().await
    }

    fn store(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    pub(crate) fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn search_index(&self) -> Option<&Arc<dyn SearchIndex>> {
        self.search.as_ref()
    }

    fn generate_id(&self) -> String {
        let id = Uuid::now_v7().simple().to_string();
        match &self.config.id_prefix {
            Some(prefix) => format!("{prefix}{id}"),
            None => id,
        }
    }

    // ========================================================================
    // Property definitions
    // ========================================================================

    /// Declare the value type of a property name; queries check comparator values against it.
    pub fn define_property(&self, definition: PropertyDefinition) {
        debug!(property = %definition.name(), value_type = ?definition.value_type(), "property defined");
        self.definitions.write().insert(definition.name().to_string(), definition);
    }

    pub fn property_definition(&self, name: &str) -> Option<PropertyDefinition> {
        self.definitions.read().get(name).cloned()
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Stage a new vertex. `id` is generated at save time when `None`.
    pub fn prepare_vertex(&self, id: Option<&str>, visibility: &Visibility) -> VertexBuilder {
        ElementBuilder::new(id, visibility, NewVertex)
    }

    /// Stage a new edge from `out_vertex_id` to `in_vertex_id`.
    pub fn prepare_edge(
        &self,
        id: Option<&str>,
        out_vertex_id: &str,
        in_vertex_id: &str,
        label: &str,
        visibility: &Visibility,
    ) -> EdgeBuilder {
        ElementBuilder::new(
            id,
            visibility,
            NewEdge {
                label: label.to_string(),
                out_vertex_id: out_vertex_id.to_string(),
                in_vertex_id: in_vertex_id.to_string(),
            },
        )
    }

    pub async fn add_vertex(
        &self,
        id: Option<&str>,
        visibility: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<Vertex> {
        self.prepare_vertex(id, visibility).save(self, authorizations).await
    }

    pub async fn add_edge(
        &self,
        id: Option<&str>,
        out_vertex_id: &str,
        in_vertex_id: &str,
        label: &str,
        visibility: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<Edge> {
        self.prepare_edge(id, out_vertex_id, in_vertex_id, label, visibility)
            .save(self, authorizations)
            .await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn get_view<T: FromRaw>(&self, id: &str, authorizations: &Authorizations) -> Result<Option<T>> {
        match self.backend.get_element(T::ELEMENT_TYPE, id).await? {
            Some(record) => self.codec.decode_view(record, authorizations),
            None => Ok(None),
        }
    }

    /// Absent when the vertex does not exist or is not visible to `authorizations`.
    pub async fn get_vertex(&self, id: &str, authorizations: &Authorizations) -> Result<Option<Vertex>> {
        self.get_view(id, authorizations).await
    }

    pub async fn get_edge(&self, id: &str, authorizations: &Authorizations) -> Result<Option<Edge>> {
        self.get_view(id, authorizations).await
    }

    /// Fetch either kind of element by type and id.
    pub async fn get_element(
        &self,
        element_type: ElementType,
        id: &str,
        authorizations: &Authorizations,
    ) -> Result<Option<Element>> {
        Ok(match element_type {
            ElementType::Vertex => self.get_vertex(id, authorizations).await?.map(Element::from),
            ElementType::Edge => self.get_edge(id, authorizations).await?.map(Element::from),
        })
    }

    /// Every visible vertex. Each call starts a fresh scan.
    pub async fn get_vertices(&self, authorizations: &Authorizations) -> Result<ResultIter<Vertex>> {
        let cursor = self.backend.scan_elements(ScanRange::all(ElementType::Vertex)).await?;
        Ok(ResultIter::new(cursor, self.codec.clone(), authorizations.clone()))
    }

    pub async fn get_edges(&self, authorizations: &Authorizations) -> Result<ResultIter<Edge>> {
        let cursor = self.backend.scan_elements(ScanRange::all(ElementType::Edge)).await?;
        Ok(ResultIter::new(cursor, self.codec.clone(), authorizations.clone()))
    }

    /// The visible subset of `ids`, in the order given. Missing ids are skipped.
    pub async fn get_vertices_by_ids(
        &self,
        ids: &[String],
        authorizations: &Authorizations,
    ) -> Result<ResultIter<Vertex>> {
        let cursor = self.backend.get_elements(ElementType::Vertex, ids).await?;
        Ok(ResultIter::new(cursor, self.codec.clone(), authorizations.clone()))
    }

    pub async fn get_edges_by_ids(
        &self,
        ids: &[String],
        authorizations: &Authorizations,
    ) -> Result<ResultIter<Edge>> {
        let cursor = self.backend.get_elements(ElementType::Edge, ids).await?;
        Ok(ResultIter::new(cursor, self.codec.clone(), authorizations.clone()))
    }

    // ========================================================================
    // Queries and traversal
    // ========================================================================

    /// Predicate query over all elements.
    pub fn query(&self, authorizations: &Authorizations) -> GraphQuery<'_, B> {
        GraphQuery::new(self, authorizations, QuerySource::All)
    }

    /// Predicate query over the candidates of a free-text search.
    pub fn query_text(&self, text: &str, authorizations: &Authorizations) -> GraphQuery<'_, B> {
        GraphQuery::new(self, authorizations, QuerySource::Text(text.to_string()))
    }

    /// Predicate query over the neighbourhood of `vertex`.
    pub fn vertex_query(&self, vertex: &Vertex, authorizations: &Authorizations) -> GraphQuery<'_, B> {
        GraphQuery::new(
            self,
            authorizations,
            QuerySource::Adjacent { vertex_id: vertex.id().to_string(), edge_refs: vertex.edge_refs().to_vec() },
        )
    }

    /// Simple paths from `start` to `end` of at most `max_hops` edges.
    pub fn find_paths(
        &self,
        start_vertex_id: &str,
        end_vertex_id: &str,
        max_hops: usize,
        authorizations: &Authorizations,
    ) -> PathFinder<'_, B> {
        PathFinder::new(self, start_vertex_id, end_vertex_id, max_hops, authorizations)
    }

    // ========================================================================
    // Commits
    // ========================================================================

    pub(crate) async fn commit_new_vertex(
        &self,
        builder: VertexBuilder,
        authorizations: &Authorizations,
    ) -> Result<Vertex> {
        let ElementBuilder { id, visibility, mutations, .. } = builder;
        let raw = self.fold_new(ElementType::Vertex, id, visibility, &mutations, authorizations)?;
        let record = self.insert_new(raw).await?;
        debug!(vertex_id = %record.id, "vertex created");
        self.view_of(record, authorizations)
    }

    pub(crate) async fn commit_new_edge(&self, builder: EdgeBuilder, authorizations: &Authorizations) -> Result<Edge> {
        let ElementBuilder { id, visibility, mutations, kind } = builder;
        let NewEdge { label, out_vertex_id, in_vertex_id } = kind;
        if label.is_empty() {
            return Err(Error::InvalidArgument("edge label must not be empty".into()));
        }
        for endpoint in [&out_vertex_id, &in_vertex_id] {
            if self.get_vertex(endpoint, authorizations).await?.is_none() {
                return Err(Error::NotFound(format!("vertex {endpoint}")));
            }
        }

        let mut raw = self.fold_new(ElementType::Edge, id, visibility, &mutations, authorizations)?;
        raw.edge = Some(EdgeEndpoints {
            label: label.clone(),
            out_vertex_id: out_vertex_id.clone(),
            in_vertex_id: in_vertex_id.clone(),
        });
        let record = self.insert_new(raw).await?;
        let edge_id = record.id.clone();

        for (vertex_id, direction, other) in [
            (&out_vertex_id, Direction::Out, &in_vertex_id),
            (&in_vertex_id, Direction::In, &out_vertex_id),
        ] {
            let edge_ref = EdgeRef {
                edge_id: edge_id.clone(),
                label: label.clone(),
                other_vertex_id: other.clone(),
                direction,
                visibility: record.visibility.clone(),
                hidden_visibilities: Vec::new(),
            };
            let attached = self.update_edge_refs(vertex_id, |refs| refs.push(edge_ref)).await?;
            if !attached {
                // the endpoint vanished after the visibility check
                self.remove_edge_record(&edge_id, None).await?;
                return Err(Error::NotFound(format!("vertex {vertex_id}")));
            }
        }

        debug!(edge_id = %edge_id, label = %label, out_vertex_id = %out_vertex_id, in_vertex_id = %in_vertex_id, "edge created");
        self.view_of(record, authorizations)
    }

    /// Fold a new element's commands over an empty state.
    fn fold_new(
        &self,
        element_type: ElementType,
        id: Option<String>,
        visibility: Visibility,
        mutations: &[Mutation],
        authorizations: &Authorizations,
    ) -> Result<RawElement> {
        if !visibility.can_read(authorizations) {
            return Err(Error::AuthorizationError(format!(
                "{element_type} visibility '{visibility}' is not satisfied by {authorizations}"
            )));
        }
        let id = match id {
            Some(id) if id.is_empty() => {
                return Err(Error::InvalidArgument(format!("{element_type} id must not be empty")));
            }
            Some(id) => id,
            None => self.generate_id(),
        };
        let data = fold::apply(&ElementData::new(id, visibility), mutations, authorizations)?;
        Ok(RawElement::new(element_type, data))
    }

    async fn insert_new(&self, mut raw: RawElement) -> Result<ElementRecord> {
        let record = {
            let _guard = self.locks.lock(raw.element_type, &raw.data.id).await;
            if self.backend.get_element(raw.element_type, &raw.data.id).await?.is_some() {
                return Err(Error::AlreadyExists(format!("{} {}", raw.element_type, raw.data.id)));
            }
            self.offload_large_values(&mut raw, &[]).await?;
            let record = self.codec.encode(&raw)?;
            self.backend.put_element(record.clone()).await?;
            record
        };
        self.index_element(&raw).await?;
        Ok(record)
    }

    fn view_of<T: FromRaw>(&self, record: ElementRecord, authorizations: &Authorizations) -> Result<T> {
        let id = record.id.clone();
        self.codec
            .decode_view(record, authorizations)?
            .ok_or_else(|| Error::NotFound(format!("{} {id}", T::ELEMENT_TYPE)))
    }

    /// Apply queued commands to a persisted element.
    pub(crate) async fn commit_existing<T: FromRaw>(
        &self,
        id: String,
        mutations: Vec<Mutation>,
        authorizations: &Authorizations,
    ) -> Result<T> {
        let element_type = T::ELEMENT_TYPE;
        let (after, record, visibility_changed) = {
            let _guard = self.locks.lock(element_type, &id).await;
            let stored = self
                .backend
                .get_element(element_type, &id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("{element_type} {id}")))?;
            check_writable(&stored, authorizations)?;

            let before = self.codec.decode_full(stored)?;
            let data = fold::apply(&before.data, &mutations, authorizations)?;
            let mut after = RawElement { data, ..before.clone() };
            let owned: Vec<String> = before.external_keys().into_iter().map(str::to_string).collect();
            self.offload_large_values(&mut after, &owned).await?;
            let record = self.codec.encode(&after)?;
            self.backend.put_element(record.clone()).await?;
            self.release_large_values(&before, &after).await?;
            let changed = before.data.visibility != after.data.visibility;
            (after, record, changed)
        };

        if visibility_changed {
            if let Some(endpoints) = &after.edge {
                let visibility = after.data.visibility.clone();
                for vertex_id in [&endpoints.out_vertex_id, &endpoints.in_vertex_id] {
                    self.update_edge_refs(vertex_id, |refs| {
                        for r in refs.iter_mut().filter(|r| r.edge_id == id) {
                            r.visibility = visibility.clone();
                        }
                    })
                    .await?;
                }
            }
        }
        self.index_element(&after).await?;
        debug!(element_type = %element_type, element_id = %id, mutations = mutations.len(), "element mutation committed");
        self.view_of(record, authorizations)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove a vertex and every edge incident to it.
    ///
    /// Fails with `AuthorizationError`, removing nothing, when the caller
    /// cannot read the vertex or any of its incident edges.
    pub async fn remove_vertex(&self, id: &str, authorizations: &Authorizations) -> Result<()> {
        let stored = self
            .backend
            .get_element(ElementType::Vertex, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vertex {id}")))?;
        check_writable(&stored, authorizations)?;

        let mut edge_ids: Vec<&str> = Vec::new();
        for r in &stored.edge_refs {
            if !r.visibility.can_read(authorizations) {
                return Err(Error::AuthorizationError(format!(
                    "vertex {id} has an incident edge not readable by {authorizations}"
                )));
            }
            if !edge_ids.contains(&r.edge_id.as_str()) {
                edge_ids.push(&r.edge_id);
            }
        }
        for edge_id in &edge_ids {
            if let Some(edge) = self.backend.get_element(ElementType::Edge, edge_id).await? {
                if !edge.visibility.can_read(authorizations) {
                    return Err(Error::AuthorizationError(format!(
                        "edge {edge_id} is not readable by {authorizations}"
                    )));
                }
            }
        }

        for edge_id in &edge_ids {
            self.remove_edge_record(edge_id, Some(id)).await?;
        }

        let removed = {
            let _guard = self.locks.lock(ElementType::Vertex, id).await;
            match self.backend.get_element(ElementType::Vertex, id).await? {
                Some(record) => {
                    self.backend.delete_element(ElementType::Vertex, id).await?;
                    Some(record)
                }
                None => None,
            }
        };
        if let Some(record) = removed {
            self.forget_element(&record).await?;
        }
        debug!(vertex_id = %id, edges = edge_ids.len(), "vertex removed");
        Ok(())
    }

    /// Remove an edge. Fails with `AuthorizationError` when the caller cannot read it.
    pub async fn remove_edge(&self, id: &str, authorizations: &Authorizations) -> Result<()> {
        let stored = self
            .backend
            .get_element(ElementType::Edge, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("edge {id}")))?;
        check_writable(&stored, authorizations)?;
        self.remove_edge_record(id, None).await?;
        debug!(edge_id = %id, "edge removed");
        Ok(())
    }

    /// Delete an edge record and detach it from its endpoints, except `skip_vertex`.
    async fn remove_edge_record(&self, id: &str, skip_vertex: Option<&str>) -> Result<()> {
        let removed = {
            let _guard = self.locks.lock(ElementType::Edge, id).await;
            let record = self.backend.get_element(ElementType::Edge, id).await?;
            if record.is_some() {
                self.backend.delete_element(ElementType::Edge, id).await?;
            }
            record
        };
        let Some(record) = removed else {
            return Ok(());
        };
        if let Some(endpoints) = &record.edge {
            for vertex_id in [&endpoints.out_vertex_id, &endpoints.in_vertex_id] {
                if skip_vertex == Some(vertex_id.as_str()) {
                    continue;
                }
                self.update_edge_refs(vertex_id, |refs| refs.retain(|r| r.edge_id != id)).await?;
            }
        }
        self.forget_element(&record).await
    }

    /// Release offloaded content and search entries of a deleted record.
    async fn forget_element(&self, record: &ElementRecord) -> Result<()> {
        for key in self.codec.external_keys(record) {
            self.backend.delete_large_value(&key).await?;
        }
        if let Some(search) = &self.search {
            search.remove_element(record.element_type, &record.id).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Hidden elements
    // ========================================================================

    /// Hide a vertex from readers whose authorizations satisfy `hidden`.
    pub async fn mark_vertex_hidden(
        &self,
        id: &str,
        hidden: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<()> {
        self.set_element_hidden(ElementType::Vertex, id, hidden, true, authorizations).await
    }

    pub async fn mark_vertex_visible(
        &self,
        id: &str,
        hidden: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<()> {
        self.set_element_hidden(ElementType::Vertex, id, hidden, false, authorizations).await
    }

    pub async fn mark_edge_hidden(
        &self,
        id: &str,
        hidden: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<()> {
        self.set_element_hidden(ElementType::Edge, id, hidden, true, authorizations).await
    }

    pub async fn mark_edge_visible(
        &self,
        id: &str,
        hidden: &Visibility,
        authorizations: &Authorizations,
    ) -> Result<()> {
        self.set_element_hidden(ElementType::Edge, id, hidden, false, authorizations).await
    }

    async fn set_element_hidden(
        &self,
        element_type: ElementType,
        id: &str,
        hidden: &Visibility,
        hide: bool,
        authorizations: &Authorizations,
    ) -> Result<()> {
        if !hidden.can_read(authorizations) {
            return Err(Error::AuthorizationError(format!(
                "hidden visibility '{hidden}' is not satisfied by {authorizations}"
            )));
        }
        let (endpoints, hidden_visibilities) = {
            let _guard = self.locks.lock(element_type, id).await;
            let mut record = self
                .backend
                .get_element(element_type, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("{element_type} {id}")))?;
            if !record.visibility.can_read(authorizations) {
                return Err(Error::AuthorizationError(format!(
                    "{element_type} {id} is not readable by {authorizations}"
                )));
            }
            if hide {
                if !record.hidden_visibilities.contains(hidden) {
                    record.hidden_visibilities.push(hidden.clone());
                }
            } else {
                record.hidden_visibilities.retain(|h| h != hidden);
            }
            let endpoints = record.edge.clone();
            let hidden_visibilities = record.hidden_visibilities.clone();
            self.backend.put_element(record).await?;
            (endpoints, hidden_visibilities)
        };

        // adjacency mirrors the edge's markers so hidden edges drop out of vertex views
        if let Some(endpoints) = endpoints {
            for vertex_id in [&endpoints.out_vertex_id, &endpoints.in_vertex_id] {
                self.update_edge_refs(vertex_id, |refs| {
                    for r in refs.iter_mut().filter(|r| r.edge_id == id) {
                        r.hidden_visibilities = hidden_visibilities.clone();
                    }
                })
                .await?;
            }
        }
        debug!(element_type = %element_type, element_id = %id, hidden = %hidden, hide, "element hidden markers changed");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Edit a vertex's stored adjacency under its commit lock. Returns false
    /// if the vertex record does not exist.
    async fn update_edge_refs(&self, vertex_id: &str, edit: impl FnOnce(&mut Vec<EdgeRef>)) -> Result<bool> {
        let _guard = self.locks.lock(ElementType::Vertex, vertex_id).await;
        let Some(mut record) = self.backend.get_element(ElementType::Vertex, vertex_id).await? else {
            return Ok(false);
        };
        edit(&mut record.edge_refs);
        self.backend.put_element(record).await?;
        Ok(true)
    }

    /// Move inline streaming content above the threshold into large-value
    /// storage. External content not listed in `owned` belongs to another
    /// element (a value copied across) and gets a copy under a fresh key, so
    /// removing the source cannot strand this element.
    async fn offload_large_values(&self, raw: &mut RawElement, owned: &[String]) -> Result<()> {
        let threshold = self.config.large_value_threshold;
        let element_type = raw.element_type;
        let id = raw.data.id.clone();
        for property in raw.data.properties.iter_mut() {
            let source = match property.value().as_stream().map(StreamingValue::source) {
                Some(StreamSource::Inline { data }) if data.len() > threshold => None,
                Some(StreamSource::External { key, .. }) if !owned.contains(key) => Some(key.clone()),
                _ => continue,
            };
            let data = match &source {
                Some(foreign) => self
                    .backend
                    .get_large_value(foreign)
                    .await?
                    .ok_or_else(|| Error::StorageError(format!("large value '{foreign}' is missing")))?,
                None => match property.value().as_stream().and_then(StreamingValue::inline_data) {
                    Some(data) => data.to_vec(),
                    None => continue,
                },
            };
            let key = large_value_key(element_type, &id, property, &Uuid::now_v7().simple().to_string());
            let Value::Stream(stream) = property.value_mut() else {
                continue;
            };
            let length = data.len();
            self.backend.put_large_value(&key, data).await?;
            debug!(element_id = %id, key = %key, length, copied_from = ?source, "large value offloaded");
            stream.externalize(key, self.store());
        }
        Ok(())
    }

    /// Delete offloaded content `before` referenced and `after` no longer does.
    async fn release_large_values(&self, before: &RawElement, after: &RawElement) -> Result<()> {
        let kept = after.external_keys();
        for key in before.external_keys() {
            if !kept.contains(&key) {
                trace!(key = %key, "large value released");
                self.backend.delete_large_value(key).await?;
            }
        }
        Ok(())
    }

    async fn index_element(&self, raw: &RawElement) -> Result<()> {
        if !self.config.search_index_enabled {
            return Ok(());
        }
        let Some(search) = &self.search else {
            return Ok(());
        };
        let fields: Vec<(String, String)> = raw
            .data
            .properties
            .iter()
            .filter_map(|p| p.value().as_str().map(|s| (p.name().to_string(), s.to_string())))
            .collect();
        search.index_element(raw.element_type, &raw.data.id, fields).await
    }
}

/// A stored element may be changed only by a caller who can read it and for
/// whom it is not hidden.
fn check_writable(record: &ElementRecord, authorizations: &Authorizations) -> Result<()> {
    if !record.visibility.can_read(authorizations) {
        return Err(Error::AuthorizationError(format!(
            "{} {} is not readable by {authorizations}",
            record.element_type, record.id
        )));
    }
    if record.hidden_visibilities.iter().any(|h| h.can_read(authorizations)) {
        return Err(Error::NotFound(format!("{} {}", record.element_type, record.id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::ElementMutation;

    fn vis(s: &str) -> Visibility {
        Visibility::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_generated_ids_use_prefix() {
        let graph = Graph::new(MemoryBackend::new(), GraphConfig::default().with_id_prefix("sg-"));
        let auths = Authorizations::empty();
        let v = graph.add_vertex(None, &Visibility::empty(), &auths).await.unwrap();
        assert!(v.id().starts_with("sg-"));
        let w = graph.add_vertex(None, &Visibility::empty(), &auths).await.unwrap();
        assert_ne!(v.id(), w.id());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let graph = Graph::open_memory().await.unwrap();
        let auths = Authorizations::empty();
        graph.add_vertex(Some("v1"), &Visibility::empty(), &auths).await.unwrap();
        let again = graph.add_vertex(Some("v1"), &Visibility::empty(), &auths).await;
        assert!(matches!(again, Err(Error::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_unsatisfiable_element_visibility_rejected() {
        let graph = Graph::open_memory().await.unwrap();
        let result = graph.add_vertex(Some("v1"), &vis("a"), &Authorizations::new(["b"])).await;
        assert!(matches!(result, Err(Error::AuthorizationError(_))));
        assert_eq!(graph.backend().element_count(ElementType::Vertex).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edge_visibility_change_updates_endpoint_refs() {
        let graph = Graph::open_memory().await.unwrap();
        let ab = Authorizations::new(["a", "b"]);
        graph.add_vertex(Some("v1"), &Visibility::empty(), &ab).await.unwrap();
        graph.add_vertex(Some("v2"), &Visibility::empty(), &ab).await.unwrap();
        let e = graph.add_edge(Some("e1"), "v1", "v2", "knows", &vis("a"), &ab).await.unwrap();

        e.prepare_mutation().alter_element_visibility(&vis("b")).save(&graph, &ab).await.unwrap();

        let a_only = Authorizations::new(["a"]);
        let v1 = graph.get_vertex("v1", &a_only).await.unwrap().unwrap();
        assert!(v1.edge_refs().is_empty());
        let v1 = graph.get_vertex("v1", &ab).await.unwrap().unwrap();
        assert_eq!(v1.edge_refs()[0].visibility, vis("b"));
    }

    #[tokio::test]
    async fn test_hidden_element_cannot_be_mutated() {
        let graph = Graph::open_memory().await.unwrap();
        let ab = Authorizations::new(["a", "b"]);
        let v = graph.add_vertex(Some("v1"), &vis("a"), &ab).await.unwrap();
        graph.mark_vertex_hidden("v1", &vis("b"), &ab).await.unwrap();

        let result = v.prepare_mutation().set_property("name", "x", &vis("a")).save(&graph, &ab).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(graph.get_vertex("v1", &ab).await.unwrap().is_none());
        assert!(graph.get_vertex("v1", &Authorizations::new(["a"])).await.unwrap().is_some());

        graph.mark_vertex_visible("v1", &vis("b"), &ab).await.unwrap();
        assert!(graph.get_vertex("v1", &ab).await.unwrap().is_some());
    }
}
