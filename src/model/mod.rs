//! # Property Graph Model
//!
//! The values, properties and elements every other module exchanges.
//! Elements handed to callers are views: already filtered for the
//! authorizations they were read with.

pub mod value;
pub mod geo;
pub mod streaming;
pub mod property;
pub mod element;
pub mod vertex;
pub mod edge;

pub use value::{Value, ValueFamily, ValueType};
pub use geo::{GeoPoint, GeoShape};
pub use streaming::{StreamSource, StreamingValue};
pub use property::{Metadata, MetadataEntry, Property, DEFAULT_KEY};
pub use element::{Element, ElementData, ElementType, GraphElement};
pub use vertex::{EdgeRef, Vertex};
pub use edge::{Direction, Edge};
