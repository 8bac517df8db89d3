//! # Path Finder
//!
//! Breadth-first enumeration of simple paths between two vertices, bounded
//! by a hop count. Only vertices and edges the reader can see are walked.
//! Paths are produced on demand; a caller that stops pulling abandons the
//! search with nothing left to release.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use crate::graph::Graph;
use crate::model::GraphElement;
use crate::storage::StorageBackend;
use crate::visibility::Authorizations;
use crate::Result;

/// Lazy path search returned by [`Graph::find_paths`].
pub struct PathFinder<'g, B: StorageBackend> {
    graph: &'g Graph<B>,
    start: String,
    end: String,
    max_hops: usize,
    authorizations: Authorizations,
    started: bool,
    frontier: VecDeque<Vec<String>>,
    found: VecDeque<Vec<String>>,
    neighbours: HashMap<String, Vec<String>>,
}

impl<'g, B: StorageBackend> PathFinder<'g, B> {
    pub(crate) fn new(
        graph: &'g Graph<B>,
        start: &str,
        end: &str,
        max_hops: usize,
        authorizations: &Authorizations,
    ) -> Self {
        Self {
            graph,
            start: start.to_string(),
            end: end.to_string(),
            max_hops,
            authorizations: authorizations.clone(),
            started: false,
            frontier: VecDeque::new(),
            found: VecDeque::new(),
            neighbours: HashMap::new(),
        }
    }

    /// The next path, start to end inclusive, or `None` once exhausted.
    pub async fn next_path(&mut self) -> Result<Option<Vec<String>>> {
        if !self.started {
            self.started = true;
            self.seed().await?;
        }
        loop {
            if let Some(path) = self.found.pop_front() {
                return Ok(Some(path));
            }
            let Some(path) = self.frontier.pop_front() else {
                return Ok(None);
            };
            self.expand(path).await?;
        }
    }

    /// Drain every remaining path.
    pub async fn collect(mut self) -> Result<Vec<Vec<String>>> {
        let mut paths = Vec::new();
        while let Some(path) = self.next_path().await? {
            paths.push(path);
        }
        Ok(paths)
    }

    async fn seed(&mut self) -> Result<()> {
        debug!(start = %self.start, end = %self.end, max_hops = self.max_hops, "path search started");
        let graph = self.graph;
        if graph.get_vertex(&self.start, &self.authorizations).await?.is_none()
            || graph.get_vertex(&self.end, &self.authorizations).await?.is_none()
        {
            return Ok(());
        }
        if self.start == self.end {
            self.found.push_back(vec![self.start.clone()]);
        } else if self.max_hops > 0 {
            self.frontier.push_back(vec![self.start.clone()]);
        }
        Ok(())
    }

    async fn expand(&mut self, path: Vec<String>) -> Result<()> {
        let Some(tail) = path.last() else {
            return Ok(());
        };
        let neighbours = self.neighbours_of(tail).await?;
        let hops = path.len();
        for next in neighbours {
            if path.contains(&next) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            if extended.last() == Some(&self.end) {
                trace!(hops, "path found");
                self.found.push_back(extended);
            } else if hops < self.max_hops {
                self.frontier.push_back(extended);
            }
        }
        Ok(())
    }

    /// Vertices one visible edge away from `vertex_id`. Empty when the vertex
    /// itself is not visible.
    async fn neighbours_of(&mut self, vertex_id: &str) -> Result<Vec<String>> {
        if let Some(cached) = self.neighbours.get(vertex_id) {
            return Ok(cached.clone());
        }
        let mut result: Vec<String> = Vec::new();
        if let Some(vertex) = self.graph.get_vertex(vertex_id, &self.authorizations).await? {
            let mut edge_ids: Vec<String> = Vec::new();
            for r in vertex.edge_refs() {
                if !edge_ids.contains(&r.edge_id) {
                    edge_ids.push(r.edge_id.clone());
                }
            }
            for edge in self.graph.get_edges_by_ids(&edge_ids, &self.authorizations).await? {
                let edge = edge?;
                if let Some(other) = edge.other_vertex_id(vertex.id()) {
                    if other != vertex_id && !result.iter().any(|r| r == other) {
                        result.push(other.to_string());
                    }
                }
            }
        }
        self.neighbours.insert(vertex_id.to_string(), result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Visibility;
    use crate::MemoryBackend;

    async fn diamond(edge_visibility: &str) -> (Graph<MemoryBackend>, Authorizations) {
        let graph = Graph::open_memory().await.unwrap();
        let auths = Authorizations::new(["a", "b"]);
        let open = Visibility::empty();
        for id in ["v1", "v2", "v3", "v4"] {
            graph.add_vertex(Some(id), &open, &auths).await.unwrap();
        }
        let ev = Visibility::new(edge_visibility).unwrap();
        for (id, out, inv) in [("e1", "v1", "v2"), ("e2", "v2", "v4"), ("e3", "v1", "v3"), ("e4", "v3", "v4")] {
            let v = if id == "e4" { &ev } else { &open };
            graph.add_edge(Some(id), out, inv, "knows", v, &auths).await.unwrap();
        }
        (graph, auths)
    }

    #[tokio::test]
    async fn test_hop_bound() {
        let (graph, auths) = diamond("").await;
        assert_eq!(graph.find_paths("v1", "v4", 2, &auths).collect().await.unwrap().len(), 2);
        assert!(graph.find_paths("v1", "v4", 1, &auths).collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invisible_edge_is_not_walked() {
        let (graph, _) = diamond("b").await;
        let paths = graph.find_paths("v1", "v4", 3, &Authorizations::new(["a"])).collect().await.unwrap();
        assert_eq!(paths, vec![vec!["v1".to_string(), "v2".into(), "v4".into()]]);
    }

    #[tokio::test]
    async fn test_same_start_and_end() {
        let (graph, auths) = diamond("").await;
        let paths = graph.find_paths("v1", "v1", 2, &auths).collect().await.unwrap();
        assert_eq!(paths, vec![vec!["v1".to_string()]]);
        assert!(graph.find_paths("v1", "missing", 2, &auths).collect().await.unwrap().is_empty());
    }
}
