//! Shared element state and read accessors.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Edge, Property, Value, Vertex};
use crate::visibility::{Authorizations, Visibility};

/// The two addressable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Vertex,
    Edge,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Vertex => f.write_str("vertex"),
            ElementType::Edge => f.write_str("edge"),
        }
    }
}

/// Identity, visibility and properties common to vertices and edges.
///
/// Instances handed to callers are already filtered for the authorizations
/// they were read with; the same stored element produces different views for
/// different readers.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub(crate) id: String,
    pub(crate) visibility: Visibility,
    pub(crate) properties: Vec<Property>,
    pub(crate) hidden_visibilities: Vec<Visibility>,
}

impl ElementData {
    pub(crate) fn new(id: String, visibility: Visibility) -> Self {
        Self { id, visibility, properties: Vec::new(), hidden_visibilities: Vec::new() }
    }

    pub(crate) fn is_hidden(&self, authorizations: &Authorizations) -> bool {
        self.hidden_visibilities.iter().any(|v| v.can_read(authorizations))
    }

    /// Readable and not hidden under `authorizations`.
    pub(crate) fn is_visible(&self, authorizations: &Authorizations) -> bool {
        self.visibility.can_read(authorizations) && !self.is_hidden(authorizations)
    }
}

/// Read accessors shared by [`Vertex`] and [`Edge`].
pub trait GraphElement {
    const ELEMENT_TYPE: ElementType;

    fn data(&self) -> &ElementData;

    fn id(&self) -> &str {
        &self.data().id
    }

    fn visibility(&self) -> &Visibility {
        &self.data().visibility
    }

    fn hidden_visibilities(&self) -> &[Visibility] {
        &self.data().hidden_visibilities
    }

    /// All properties visible in this view.
    fn properties(&self) -> &[Property] {
        &self.data().properties
    }

    fn get_properties<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties().iter().filter(move |p| p.name() == name)
    }

    /// First property matching `(key, name)`.
    fn get_property(&self, key: &str, name: &str) -> Option<&Property> {
        self.properties().iter().find(|p| p.matches(key, name))
    }

    fn get_property_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.get_properties(name).map(Property::value)
    }

    /// First value of `name`, if any.
    fn get_property_value(&self, name: &str) -> Option<&Value> {
        self.properties().iter().find(|p| p.name() == name).map(Property::value)
    }
}

/// Either kind of element.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Element {
    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Vertex(_) => ElementType::Vertex,
            Element::Edge(_) => ElementType::Edge,
        }
    }

    pub fn data(&self) -> &ElementData {
        match self {
            Element::Vertex(v) => v.data(),
            Element::Edge(e) => e.data(),
        }
    }

    pub fn id(&self) -> &str {
        &self.data().id
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(v) => Some(v),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(e) => Some(e),
            Element::Vertex(_) => None,
        }
    }
}

impl From<Vertex> for Element {
    fn from(v: Vertex) -> Self {
        Element::Vertex(v)
    }
}

impl From<Edge> for Element {
    fn from(e: Edge) -> Self {
        Element::Edge(e)
    }
}
