//! Storage records.
//!
//! A record holds the complete, unfiltered state of one element: every
//! property version, every metadata entry and every hidden marker regardless
//! of who will read it. Property and metadata values are opaque bytes
//! produced by the graph's [`ValueSerializer`](super::ValueSerializer), so a
//! backend never needs to understand them.

use serde::{Deserialize, Serialize};

use crate::model::{EdgeRef, ElementType};
use crate::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub element_type: ElementType,
    pub id: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub hidden_visibilities: Vec<Visibility>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
    /// Present for edges only.
    #[serde(default)]
    pub edge: Option<EdgeEndpoints>,
    /// Incident edges; vertices only.
    #[serde(default)]
    pub edge_refs: Vec<EdgeRef>,
}

impl ElementRecord {
    pub fn new(element_type: ElementType, id: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            element_type,
            id: id.into(),
            visibility,
            hidden_visibilities: Vec::new(),
            properties: Vec::new(),
            edge: None,
            edge_refs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub key: String,
    pub name: String,
    pub visibility: Visibility,
    pub value: Vec<u8>,
    #[serde(default)]
    pub metadata: Vec<MetadataRecord>,
    #[serde(default)]
    pub hidden_visibilities: Vec<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub visibility: Visibility,
    pub value: Vec<u8>,
}

/// The immutable part of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEndpoints {
    pub label: String,
    pub out_vertex_id: String,
    pub in_vertex_id: String,
}
