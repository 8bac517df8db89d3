//! # Query Engine
//!
//! A `GraphQuery` composes property predicates, then streams the matching
//! vertices or edges visible to one reader. Filters are order independent;
//! `skip` and `limit` apply after filtering.
//!
//! ```rust,no_run
//! # use securegraph::{Authorizations, Compare, Graph};
//! # async fn example(graph: &Graph<securegraph::MemoryBackend>, auths: &Authorizations) -> securegraph::Result<()> {
//! let adults = graph
//!     .query(auths)
//!     .has("age", Compare::GreaterThanEqual, 18)
//!     .limit(10)
//!     .vertices()
//!     .await?;
//! for vertex in adults {
//!     let _vertex = vertex?;
//! }
//! # Ok(())
//! # }
//! ```

mod predicate;

pub use predicate::{Compare, GeoCompare, PropertyDefinition};
pub(crate) use predicate::Predicate;

use tracing::debug;

use crate::graph::codec::{Codec, FromRaw};
use crate::graph::Graph;
use crate::index::tokenize;
use crate::model::{Direction, Edge, EdgeRef, ElementType, GeoShape, GraphElement, Value, Vertex};
use crate::storage::{ElementRecord, RecordCursor, ScanRange, StorageBackend};
use crate::visibility::Authorizations;
use crate::{Error, Result};

// ============================================================================
// Query source
// ============================================================================

/// Where candidate elements come from.
#[derive(Debug, Clone)]
pub(crate) enum QuerySource {
    All,
    Text(String),
    Adjacent { vertex_id: String, edge_refs: Vec<EdgeRef> },
}

// ============================================================================
// GraphQuery
// ============================================================================

/// Predicate query builder. Construction errors are deferred to the terminal call.
pub struct GraphQuery<'g, B: StorageBackend> {
    graph: &'g Graph<B>,
    authorizations: Authorizations,
    source: QuerySource,
    predicates: Vec<Predicate>,
    direction: Direction,
    labels: Vec<String>,
    skip: usize,
    limit: Option<usize>,
    error: Option<Error>,
}

impl<'g, B: StorageBackend> GraphQuery<'g, B> {
    pub(crate) fn new(graph: &'g Graph<B>, authorizations: &Authorizations, source: QuerySource) -> Self {
        Self {
            graph,
            authorizations: authorizations.clone(),
            source,
            predicates: Vec::new(),
            direction: Direction::Both,
            labels: Vec::new(),
            skip: 0,
            limit: None,
            error: None,
        }
    }

    fn push(mut self, predicate: Predicate) -> Self {
        if self.error.is_none() {
            let definition = self.graph.property_definition(predicate.name());
            match predicate.validate(definition.as_ref()) {
                Ok(()) => self.predicates.push(predicate),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Keep elements with a visible `name` value satisfying `value <compare> target`.
    pub fn has(self, name: &str, compare: Compare, value: impl Into<Value>) -> Self {
        self.push(Predicate::Has { name: name.to_string(), compare, value: value.into() })
    }

    /// Equality shorthand.
    pub fn has_value(self, name: &str, value: impl Into<Value>) -> Self {
        self.has(name, Compare::Equal, value)
    }

    /// Inclusive on both bounds.
    pub fn range(self, name: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(Predicate::Range { name: name.to_string(), low: low.into(), high: high.into() })
    }

    pub fn has_geo(self, name: &str, compare: GeoCompare, shape: GeoShape) -> Self {
        self.push(Predicate::Geo { name: name.to_string(), compare, shape })
    }

    pub fn within(self, name: &str, shape: GeoShape) -> Self {
        self.has_geo(name, GeoCompare::Within, shape)
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Restrict a vertex query to edges in `direction`.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict to edges with one of `labels`. Empty means any label.
    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub async fn vertices(self) -> Result<ResultIter<Vertex>> {
        self.run().await
    }

    pub async fn edges(self) -> Result<ResultIter<Edge>> {
        self.run().await
    }

    async fn run<T: FromRaw + Send + 'static>(mut self) -> Result<ResultIter<T>> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let element_type = T::ELEMENT_TYPE;
        let cursor = self.candidates(element_type).await?;
        debug!(
            element_type = %element_type,
            predicates = self.predicates.len(),
            skip = self.skip,
            limit = ?self.limit,
            "query started"
        );

        let terms = match &self.source {
            QuerySource::Text(text) => tokenize(text),
            _ => Vec::new(),
        };
        let predicates = self.predicates;
        let labels = self.labels;
        let filter = move |element: &T| {
            if !labels.is_empty() {
                if let Some(label) = element.edge_label() {
                    if !labels.iter().any(|l| l == label) {
                        return false;
                    }
                }
            }
            if !terms.is_empty() && !contains_terms(element, &terms) {
                return false;
            }
            predicates.iter().all(|p| p.matches(element))
        };

        Ok(ResultIter::new(cursor, self.graph.codec().clone(), self.authorizations)
            .with_filter(Box::new(filter))
            .with_page(self.skip, self.limit))
    }

    async fn candidates(&self, element_type: ElementType) -> Result<RecordCursor> {
        let backend = self.graph.backend();
        match &self.source {
            QuerySource::All => backend.scan_elements(ScanRange::all(element_type)).await,
            QuerySource::Text(text) => {
                let search = self.graph.search_index().ok_or_else(|| {
                    Error::InvalidArgument("text query requires an attached search index".into())
                })?;
                let ids = search.search(element_type, text).await?;
                backend.get_elements(element_type, &ids).await
            }
            QuerySource::Adjacent { vertex_id, edge_refs } => {
                let edge_ids = self.adjacent_edge_ids(edge_refs);
                match element_type {
                    ElementType::Edge => backend.get_elements(ElementType::Edge, &edge_ids).await,
                    ElementType::Vertex => {
                        let mut others: Vec<String> = Vec::new();
                        for edge in self.graph.get_edges_by_ids(&edge_ids, &self.authorizations).await? {
                            let edge = edge?;
                            if let Some(other) = edge.other_vertex_id(vertex_id) {
                                if !others.iter().any(|o| o == other) {
                                    others.push(other.to_string());
                                }
                            }
                        }
                        backend.get_elements(ElementType::Vertex, &others).await
                    }
                }
            }
        }
    }

    fn adjacent_edge_ids(&self, edge_refs: &[EdgeRef]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for r in edge_refs {
            let selected = self.direction.includes(r.direction)
                && (self.labels.is_empty() || self.labels.contains(&r.label))
                && r.is_visible(&self.authorizations);
            if selected && !ids.contains(&r.edge_id) {
                ids.push(r.edge_id.clone());
            }
        }
        ids
    }
}

/// Every term occurs in some visible string value. The search index may
/// have matched text the reader cannot see.
fn contains_terms<T: GraphElement>(element: &T, terms: &[String]) -> bool {
    let visible: Vec<String> = element
        .properties()
        .iter()
        .filter_map(|p| p.value().as_str())
        .flat_map(tokenize)
        .collect();
    terms.iter().all(|t| visible.contains(t))
}

// ============================================================================
// ResultIter
// ============================================================================

type Decode<T> = fn(&Codec, ElementRecord, &Authorizations) -> Result<Option<T>>;

/// Lazy, visibility-filtered element sequence over a storage cursor.
///
/// Each call that produces a `ResultIter` starts a fresh cursor; dropping one
/// early releases nothing but the cursor itself.
pub struct ResultIter<T> {
    cursor: RecordCursor,
    codec: Codec,
    authorizations: Authorizations,
    decode: Decode<T>,
    filter: Option<Box<dyn Fn(&T) -> bool + Send>>,
    skip: usize,
    remaining: Option<usize>,
}

impl<T: FromRaw> ResultIter<T> {
    pub(crate) fn new(cursor: RecordCursor, codec: Codec, authorizations: Authorizations) -> Self {
        Self {
            cursor,
            codec,
            authorizations,
            decode: Codec::decode_view::<T>,
            filter: None,
            skip: 0,
            remaining: None,
        }
    }
}

impl<T> ResultIter<T> {
    pub(crate) fn with_filter(mut self, filter: Box<dyn Fn(&T) -> bool + Send>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn with_page(mut self, skip: usize, limit: Option<usize>) -> Self {
        self.skip = skip;
        self.remaining = limit;
        self
    }
}

impl<T> Iterator for ResultIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let record = match self.cursor.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            let element = match (self.decode)(&self.codec, record, &self.authorizations) {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };
            if self.filter.as_ref().is_some_and(|keep| !keep(&element)) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(n) = self.remaining.as_mut() {
                *n -= 1;
            }
            return Some(Ok(element));
        }
    }
}

impl<T> std::fmt::Debug for ResultIter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultIter")
            .field("authorizations", &self.authorizations)
            .field("skip", &self.skip)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::ElementMutation;
    use crate::visibility::Visibility;
    use crate::MemorySearchIndex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn vis(s: &str) -> Visibility {
        Visibility::new(s).unwrap()
    }

    async fn people() -> Graph<crate::MemoryBackend> {
        let graph = Graph::open_memory().await.unwrap().with_search_index(Arc::new(MemorySearchIndex::new()));
        let auths = Authorizations::new(["a", "b"]);
        for (id, name, age, v) in [("v1", "joe", 25, "a"), ("v2", "bob", 30, "a"), ("v3", "eve", 30, "b")] {
            graph
                .prepare_vertex(Some(id), &vis("a"))
                .set_property("name", name, &vis(v))
                .set_property("age", age, &vis(v))
                .save(&graph, &auths)
                .await
                .unwrap();
        }
        graph
    }

    fn ids<T: GraphElement>(iter: ResultIter<T>) -> Vec<String> {
        iter.map(|r| r.unwrap().id().to_string()).collect()
    }

    #[tokio::test]
    async fn test_has_sees_only_visible_values() {
        let graph = people().await;
        let a = Authorizations::new(["a"]);
        let found = graph.query(&a).has_value("age", 30).vertices().await.unwrap();
        assert_eq!(ids(found), vec!["v2"]);

        let ab = Authorizations::new(["a", "b"]);
        let found = graph.query(&ab).has_value("age", 30).vertices().await.unwrap();
        assert_eq!(ids(found), vec!["v2", "v3"]);
    }

    #[tokio::test]
    async fn test_range_and_paging() {
        let graph = people().await;
        let ab = Authorizations::new(["a", "b"]);
        let all = graph.query(&ab).range("age", 20, 30).vertices().await.unwrap();
        assert_eq!(all.count(), 3);

        let page = graph.query(&ab).range("age", 20, 30).skip(1).limit(1).vertices().await.unwrap();
        assert_eq!(ids(page), vec!["v2"]);
        let beyond = graph.query(&ab).skip(10).vertices().await.unwrap();
        assert_eq!(beyond.count(), 0);
    }

    #[tokio::test]
    async fn test_definition_mismatch_surfaces_at_terminal() {
        let graph = people().await;
        graph.define_property(PropertyDefinition::new("age", crate::ValueType::Integer));
        let result = graph.query(&Authorizations::new(["a"])).has("age", Compare::LessThan, "old").vertices().await;
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_text_query_rechecks_visibility() {
        let graph = people().await;
        let found = graph.query_text("eve", &Authorizations::new(["a"])).vertices().await.unwrap();
        assert_eq!(found.count(), 0);
        let found = graph.query_text("EVE", &Authorizations::new(["a", "b"])).vertices().await.unwrap();
        assert_eq!(ids(found), vec!["v3"]);
    }

    #[tokio::test]
    async fn test_text_query_without_index_fails() {
        let graph = Graph::open_memory().await.unwrap();
        let result = graph.query_text("x", &Authorizations::empty()).vertices().await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
