//! Vertices and their stored adjacency.

use serde::{Deserialize, Serialize};

use super::{Direction, Edge, ElementData, ElementType, GraphElement};
use crate::graph::Graph;
use crate::mutation::ExistingElementMutation;
use crate::storage::StorageBackend;
use crate::visibility::{Authorizations, Visibility};
use crate::Result;

/// One incident edge as recorded on a vertex.
///
/// `direction` is relative to the owning vertex: `Out` when the vertex is the
/// edge's source. The ref mirrors the edge's visibility and hidden markers
/// so a reader's view only lists edges it may read and that are not hidden
/// from it. Views always carry empty `hidden_visibilities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub edge_id: String,
    pub label: String,
    pub other_vertex_id: String,
    pub direction: Direction,
    pub visibility: Visibility,
    #[serde(default)]
    pub hidden_visibilities: Vec<Visibility>,
}

impl EdgeRef {
    /// Whether `authorizations` may see the edge through this ref.
    pub fn is_visible(&self, authorizations: &Authorizations) -> bool {
        self.visibility.can_read(authorizations)
            && !self.hidden_visibilities.iter().any(|h| h.can_read(authorizations))
    }
}

/// A vertex as seen by one reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub(crate) data: ElementData,
    pub(crate) edge_refs: Vec<EdgeRef>,
}

impl GraphElement for Vertex {
    const ELEMENT_TYPE: ElementType = ElementType::Vertex;

    fn data(&self) -> &ElementData {
        &self.data
    }
}

impl Vertex {
    pub fn edge_refs(&self) -> &[EdgeRef] {
        &self.edge_refs
    }

    /// Ids of incident edges in `direction`, without duplicates (self-loops
    /// are recorded once per direction).
    pub fn edge_ids(&self, direction: Direction) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for r in self.edge_refs.iter().filter(|r| direction.includes(r.direction)) {
            if !ids.contains(&r.edge_id.as_str()) {
                ids.push(&r.edge_id);
            }
        }
        ids
    }

    fn matching_edge_ids(&self, direction: Direction, labels: &[&str], other: Option<&str>) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for r in &self.edge_refs {
            if !direction.includes(r.direction) {
                continue;
            }
            if !labels.is_empty() && !labels.contains(&r.label.as_str()) {
                continue;
            }
            if other.is_some_and(|o| o != r.other_vertex_id) {
                continue;
            }
            if !ids.contains(&r.edge_id) {
                ids.push(r.edge_id.clone());
            }
        }
        ids
    }

    /// Incident edges visible to `authorizations`, optionally limited to `labels`.
    pub async fn get_edges<B: StorageBackend>(
        &self,
        graph: &Graph<B>,
        direction: Direction,
        labels: &[&str],
        authorizations: &Authorizations,
    ) -> Result<Vec<Edge>> {
        let ids = self.matching_edge_ids(direction, labels, None);
        graph.get_edges_by_ids(&ids, authorizations).await?.collect()
    }

    /// Incident edges whose opposite endpoint is `other_vertex_id`.
    pub async fn get_edges_to<B: StorageBackend>(
        &self,
        graph: &Graph<B>,
        other_vertex_id: &str,
        direction: Direction,
        authorizations: &Authorizations,
    ) -> Result<Vec<Edge>> {
        let ids = self.matching_edge_ids(direction, &[], Some(other_vertex_id));
        graph.get_edges_by_ids(&ids, authorizations).await?.collect()
    }

    /// Adjacent vertices reachable over visible edges. Each vertex appears once.
    pub async fn get_vertices<B: StorageBackend>(
        &self,
        graph: &Graph<B>,
        direction: Direction,
        authorizations: &Authorizations,
    ) -> Result<Vec<Vertex>> {
        let mut other_ids: Vec<String> = Vec::new();
        for edge in self.get_edges(graph, direction, &[], authorizations).await? {
            if let Some(other) = edge.other_vertex_id(self.id()) {
                if !other_ids.iter().any(|o| o == other) {
                    other_ids.push(other.to_string());
                }
            }
        }
        graph.get_vertices_by_ids(&other_ids, authorizations).await?.collect()
    }

    pub fn prepare_mutation(&self) -> ExistingElementMutation<Vertex> {
        ExistingElementMutation::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_ref(id: &str, label: &str, other: &str, direction: Direction) -> EdgeRef {
        EdgeRef {
            edge_id: id.into(),
            label: label.into(),
            other_vertex_id: other.into(),
            direction,
            visibility: Visibility::empty(),
            hidden_visibilities: Vec::new(),
        }
    }

    #[test]
    fn test_edge_ids_by_direction() {
        let v = Vertex {
            data: ElementData::new("v1".into(), Visibility::empty()),
            edge_refs: vec![
                edge_ref("e1", "knows", "v2", Direction::Out),
                edge_ref("e2", "knows", "v3", Direction::In),
                edge_ref("loop", "self", "v1", Direction::Out),
                edge_ref("loop", "self", "v1", Direction::In),
            ],
        };
        assert_eq!(v.edge_ids(Direction::Out), vec!["e1", "loop"]);
        assert_eq!(v.edge_ids(Direction::In), vec!["e2", "loop"]);
        assert_eq!(v.edge_ids(Direction::Both), vec!["e1", "e2", "loop"]);
        assert_eq!(v.matching_edge_ids(Direction::Both, &["knows"], Some("v3")), vec!["e2".to_string()]);
    }
}
