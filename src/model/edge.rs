//! Edges: directed, labelled links between two vertices.

use serde::{Deserialize, Serialize};

use super::{ElementData, ElementType, GraphElement, Vertex};
use crate::graph::Graph;
use crate::mutation::ExistingElementMutation;
use crate::storage::StorageBackend;
use crate::visibility::Authorizations;
use crate::{Error, Result};

/// Traversal direction. `Both` is a query-time concept and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
            Direction::Both => Direction::Both,
        }
    }

    /// Whether a stored direction is selected by this query direction.
    pub fn includes(self, stored: Direction) -> bool {
        self == Direction::Both || self == stored
    }
}

/// An edge as seen by one reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) data: ElementData,
    pub(crate) label: String,
    pub(crate) out_vertex_id: String,
    pub(crate) in_vertex_id: String,
}

impl GraphElement for Edge {
    const ELEMENT_TYPE: ElementType = ElementType::Edge;

    fn data(&self) -> &ElementData {
        &self.data
    }
}

impl Edge {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn out_vertex_id(&self) -> &str {
        &self.out_vertex_id
    }

    pub fn in_vertex_id(&self) -> &str {
        &self.in_vertex_id
    }

    /// Endpoint id for `Out` (source) or `In` (target).
    pub fn vertex_id(&self, direction: Direction) -> Result<&str> {
        match direction {
            Direction::Out => Ok(&self.out_vertex_id),
            Direction::In => Ok(&self.in_vertex_id),
            Direction::Both => Err(Error::InvalidArgument(
                "an edge endpoint is either Out or In, not Both".into(),
            )),
        }
    }

    /// The endpoint opposite `known_vertex_id`, or `None` if it is not an endpoint.
    pub fn other_vertex_id(&self, known_vertex_id: &str) -> Option<&str> {
        if known_vertex_id == self.out_vertex_id {
            Some(&self.in_vertex_id)
        } else if known_vertex_id == self.in_vertex_id {
            Some(&self.out_vertex_id)
        } else {
            None
        }
    }

    /// Fetch an endpoint. Absent when the vertex is not visible to `authorizations`.
    pub async fn get_vertex<B: StorageBackend>(
        &self,
        graph: &Graph<B>,
        direction: Direction,
        authorizations: &Authorizations,
    ) -> Result<Option<Vertex>> {
        graph.get_vertex(self.vertex_id(direction)?, authorizations).await
    }

    pub async fn get_other_vertex<B: StorageBackend>(
        &self,
        graph: &Graph<B>,
        known_vertex_id: &str,
        authorizations: &Authorizations,
    ) -> Result<Option<Vertex>> {
        match self.other_vertex_id(known_vertex_id) {
            Some(id) => graph.get_vertex(id, authorizations).await,
            None => Ok(None),
        }
    }

    pub fn prepare_mutation(&self) -> ExistingElementMutation<Edge> {
        ExistingElementMutation::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Visibility;

    fn edge() -> Edge {
        Edge {
            data: ElementData::new("e1".into(), Visibility::empty()),
            label: "knows".into(),
            out_vertex_id: "v1".into(),
            in_vertex_id: "v2".into(),
        }
    }

    #[test]
    fn test_vertex_id_by_direction() {
        let e = edge();
        assert_eq!(e.vertex_id(Direction::Out).unwrap(), "v1");
        assert_eq!(e.vertex_id(Direction::In).unwrap(), "v2");
        assert!(matches!(e.vertex_id(Direction::Both), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_other_vertex_id() {
        let e = edge();
        assert_eq!(e.other_vertex_id("v1"), Some("v2"));
        assert_eq!(e.other_vertex_id("v2"), Some("v1"));
        assert_eq!(e.other_vertex_id("v3"), None);
    }

    #[test]
    fn test_direction_includes() {
        assert!(Direction::Both.includes(Direction::In));
        assert!(Direction::Out.includes(Direction::Out));
        assert!(!Direction::Out.includes(Direction::In));
        assert_eq!(Direction::In.reverse(), Direction::Out);
    }
}
