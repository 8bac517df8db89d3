//! Conversion between storage records and elements.
//!
//! Two decodings exist. [`Codec::decode_full`] reconstructs every version of
//! every property and is used only inside commits. [`Codec::decode_view`]
//! produces what one reader may see: it checks the element's visibility
//! before decoding anything, then drops unreadable or hidden properties,
//! unreadable metadata entries and edge refs the reader cannot read.

use std::sync::Arc;

use crate::model::{
    EdgeRef, ElementData, ElementType, GraphElement, Metadata, MetadataEntry, Property, Value,
    Vertex, Edge,
};
use crate::storage::{
    EdgeEndpoints, ElementRecord, MetadataRecord, PropertyRecord, StorageBackend, ValueSerializer,
};
use crate::visibility::Authorizations;
use crate::{Error, Result};

/// Complete, unfiltered element state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawElement {
    pub(crate) element_type: ElementType,
    pub(crate) data: ElementData,
    pub(crate) edge: Option<EdgeEndpoints>,
    pub(crate) edge_refs: Vec<EdgeRef>,
}

impl RawElement {
    pub(crate) fn new(element_type: ElementType, data: ElementData) -> Self {
        Self { element_type, data, edge: None, edge_refs: Vec::new() }
    }

    pub(crate) fn external_keys(&self) -> Vec<&str> {
        self.data
            .properties
            .iter()
            .filter_map(|p| p.value().as_stream().and_then(|s| s.external_key()))
            .collect()
    }
}

/// Element kinds that can be assembled from decoded parts.
pub(crate) trait FromRaw: GraphElement + Sized {
    fn assemble(data: ElementData, edge: Option<EdgeEndpoints>, edge_refs: Vec<EdgeRef>) -> Result<Self>;

    fn edge_label(&self) -> Option<&str> {
        None
    }
}

impl FromRaw for Vertex {
    fn assemble(data: ElementData, _edge: Option<EdgeEndpoints>, edge_refs: Vec<EdgeRef>) -> Result<Self> {
        Ok(Vertex { data, edge_refs })
    }
}

impl FromRaw for Edge {
    fn assemble(data: ElementData, edge: Option<EdgeEndpoints>, _edge_refs: Vec<EdgeRef>) -> Result<Self> {
        let endpoints = edge.ok_or_else(|| {
            Error::StorageError(format!("edge record '{}' has no endpoints", data.id))
        })?;
        Ok(Edge {
            data,
            label: endpoints.label,
            out_vertex_id: endpoints.out_vertex_id,
            in_vertex_id: endpoints.in_vertex_id,
        })
    }

    fn edge_label(&self) -> Option<&str> {
        Some(&self.label)
    }
}

/// Storage key for offloaded streaming content of one property version.
///
/// `suffix` makes each offload distinct: a property keeps its key when its
/// visibility is altered, and a later version at the old triple must not
/// overwrite that content.
pub(crate) fn large_value_key(element_type: ElementType, id: &str, property: &Property, suffix: &str) -> String {
    format!(
        "{element_type}/{id}/{}/{}/{}/{suffix}",
        property.key(),
        property.name(),
        property.visibility()
    )
}

/// Serializer plus the store handle external streams read through.
#[derive(Clone)]
pub(crate) struct Codec {
    serializer: Arc<dyn ValueSerializer>,
    store: Arc<dyn StorageBackend>,
}

impl Codec {
    pub(crate) fn new(serializer: Arc<dyn ValueSerializer>, store: Arc<dyn StorageBackend>) -> Self {
        Self { serializer, store }
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value> {
        let mut value = self.serializer.decode(bytes)?;
        if let Value::Stream(stream) = &mut value {
            stream.attach_store(Arc::clone(&self.store));
        }
        Ok(value)
    }

    fn decode_property(&self, record: &PropertyRecord, reader: Option<&Authorizations>) -> Result<Property> {
        let mut metadata = Metadata::new();
        for entry in &record.metadata {
            if reader.is_some_and(|auths| !entry.visibility.can_read(auths)) {
                continue;
            }
            let value = self.decode_value(&entry.value)?;
            metadata.insert(entry.name.clone(), value, &entry.visibility);
        }
        let mut property = Property::new(
            record.key.clone(),
            record.name.clone(),
            self.decode_value(&record.value)?,
            record.visibility.clone(),
        )
        .with_metadata(metadata);
        // a reader's view never lists hidden markers
        if reader.is_none() {
            property.set_hidden_visibilities(record.hidden_visibilities.iter().cloned());
        }
        Ok(property)
    }

    pub(crate) fn decode_full(&self, record: ElementRecord) -> Result<RawElement> {
        let properties = record
            .properties
            .iter()
            .map(|p| self.decode_property(p, None))
            .collect::<Result<Vec<_>>>()?;
        Ok(RawElement {
            element_type: record.element_type,
            data: ElementData {
                id: record.id,
                visibility: record.visibility,
                properties,
                hidden_visibilities: record.hidden_visibilities,
            },
            edge: record.edge,
            edge_refs: record.edge_refs,
        })
    }

    /// The reader's view, or `None` when the element is unreadable or hidden
    /// for `authorizations`.
    pub(crate) fn decode_view<T: FromRaw>(
        &self,
        record: ElementRecord,
        authorizations: &Authorizations,
    ) -> Result<Option<T>> {
        if record.element_type != T::ELEMENT_TYPE {
            return Ok(None);
        }
        if !record.visibility.can_read(authorizations)
            || record.hidden_visibilities.iter().any(|h| h.can_read(authorizations))
        {
            return Ok(None);
        }

        let mut properties = Vec::with_capacity(record.properties.len());
        for p in &record.properties {
            let readable = p.visibility.can_read(authorizations)
                && !p.hidden_visibilities.iter().any(|h| h.can_read(authorizations));
            if readable {
                properties.push(self.decode_property(p, Some(authorizations))?);
            }
        }
        let edge_refs = record
            .edge_refs
            .into_iter()
            .filter(|r| r.is_visible(authorizations))
            .map(|r| EdgeRef { hidden_visibilities: Vec::new(), ..r })
            .collect();

        let data = ElementData {
            id: record.id,
            visibility: record.visibility,
            properties,
            hidden_visibilities: Vec::new(),
        };
        T::assemble(data, record.edge, edge_refs).map(Some)
    }

    /// Keys of offloaded content referenced by `record`. Values that fail to
    /// decode are skipped so a damaged record can still be removed.
    pub(crate) fn external_keys(&self, record: &ElementRecord) -> Vec<String> {
        record
            .properties
            .iter()
            .filter_map(|p| match self.serializer.decode(&p.value) {
                Ok(Value::Stream(stream)) => stream.external_key().map(str::to_string),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn encode(&self, raw: &RawElement) -> Result<ElementRecord> {
        let mut properties = Vec::with_capacity(raw.data.properties.len());
        for p in &raw.data.properties {
            let metadata = p
                .metadata()
                .iter()
                .map(|(name, MetadataEntry { value, visibility })| {
                    Ok(MetadataRecord {
                        name: name.to_string(),
                        visibility: visibility.clone(),
                        value: self.serializer.encode(value)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            properties.push(PropertyRecord {
                key: p.key().to_string(),
                name: p.name().to_string(),
                visibility: p.visibility().clone(),
                value: self.serializer.encode(p.value())?,
                metadata,
                hidden_visibilities: p.hidden_visibilities().to_vec(),
            });
        }
        Ok(ElementRecord {
            element_type: raw.element_type,
            id: raw.data.id.clone(),
            visibility: raw.data.visibility.clone(),
            hidden_visibilities: raw.data.hidden_visibilities.clone(),
            properties,
            edge: raw.edge.clone(),
            edge_refs: raw.edge_refs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonValueSerializer, MemoryBackend};
    use crate::visibility::Visibility;
    use pretty_assertions::assert_eq;

    fn vis(s: &str) -> Visibility {
        Visibility::new(s).unwrap()
    }

    fn codec() -> Codec {
        Codec::new(Arc::new(JsonValueSerializer), Arc::new(MemoryBackend::new()))
    }

    fn sample() -> RawElement {
        let mut hidden = Property::new("", "nick", "jj", vis("a"));
        hidden.add_hidden_visibility(vis("b"));
        let mut data = ElementData::new("v1".into(), vis("a"));
        data.properties = vec![
            Property::new("", "name", "joe", vis("a"))
                .with_metadata(Metadata::new().with("src", "x", &vis("a")).with("conf", 1, &vis("c"))),
            Property::new("", "name", "joseph", vis("b")),
            hidden,
        ];
        RawElement::new(ElementType::Vertex, data)
    }

    #[test]
    fn test_full_roundtrip() {
        let c = codec();
        let raw = sample();
        let back = c.decode_full(c.encode(&raw).unwrap()).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_view_filters_per_reader() {
        let c = codec();
        let record = c.encode(&sample()).unwrap();

        let a: Vertex = c.decode_view(record.clone(), &Authorizations::new(["a"])).unwrap().unwrap();
        let names: Vec<_> = a.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["name", "nick"]);
        assert_eq!(a.properties()[0].metadata().len(), 1);

        let ab: Vertex = c.decode_view(record.clone(), &Authorizations::new(["a", "b"])).unwrap().unwrap();
        assert_eq!(ab.get_property_values("name").count(), 2);
        assert!(ab.get_property_value("nick").is_none());

        let none: Option<Vertex> = c.decode_view(record.clone(), &Authorizations::new(["b"])).unwrap();
        assert!(none.is_none());
        let wrong_kind: Option<Edge> = c.decode_view(record, &Authorizations::new(["a"])).unwrap();
        assert!(wrong_kind.is_none());
    }

    #[test]
    fn test_unreadable_garbage_is_never_decoded() {
        let c = codec();
        let mut record = c.encode(&sample()).unwrap();
        record.properties[1].value = b"garbage".to_vec();
        let view: Option<Vertex> = c.decode_view(record.clone(), &Authorizations::new(["a"])).unwrap();
        assert!(view.is_some());
        assert!(c.decode_full(record).is_err());
    }

    #[test]
    fn test_large_value_key() {
        let p = Property::new("k1", "text", "x", vis("a&b"));
        assert_eq!(large_value_key(ElementType::Vertex, "v1", &p, "01"), "vertex/v1/k1/text/a&b/01");
    }
}
