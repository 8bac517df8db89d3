//! In-memory inverted index.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{tokenize, SearchIndex};
use crate::model::ElementType;
use crate::Result;

type DocKey = (ElementType, String);

/// Term → element ids, plus the reverse map so re-indexing drops stale terms.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    postings: RwLock<HashMap<(ElementType, String), BTreeSet<String>>>,
    documents: RwLock<HashMap<DocKey, Vec<String>>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn unindex(&self, element_type: ElementType, id: &str) {
        let Some(terms) = self.documents.write().remove(&(element_type, id.to_string())) else {
            return;
        };
        let mut postings = self.postings.write();
        for term in terms {
            let key = (element_type, term);
            if let Some(ids) = postings.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    postings.remove(&key);
                }
            }
        }
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_element(&self, element_type: ElementType, id: &str, fields: Vec<(String, String)>) -> Result<()> {
        self.unindex(element_type, id);
        let mut terms: Vec<String> = fields.iter().flat_map(|(_, text)| tokenize(text)).collect();
        terms.sort_unstable();
        terms.dedup();
        {
            let mut postings = self.postings.write();
            for term in &terms {
                postings
                    .entry((element_type, term.clone()))
                    .or_default()
                    .insert(id.to_string());
            }
        }
        self.documents.write().insert((element_type, id.to_string()), terms);
        Ok(())
    }

    async fn remove_element(&self, element_type: ElementType, id: &str) -> Result<()> {
        self.unindex(element_type, id);
        Ok(())
    }

    async fn search(&self, element_type: ElementType, text: &str) -> Result<Vec<String>> {
        let terms = tokenize(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let postings = self.postings.read();
        let mut result: Option<BTreeSet<String>> = None;
        for term in terms {
            let ids = postings.get(&(element_type, term)).cloned().unwrap_or_default();
            result = Some(match result {
                Some(acc) => acc.intersection(&ids).cloned().collect(),
                None => ids,
            });
        }
        Ok(result.unwrap_or_default().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<(String, String)> {
        vec![("text".to_string(), text.to_string())]
    }

    #[tokio::test]
    async fn test_all_terms_must_match() {
        let index = MemorySearchIndex::new();
        index.index_element(ElementType::Vertex, "v1", fields("Hello vertex")).await.unwrap();
        index.index_element(ElementType::Vertex, "v2", fields("hello dog")).await.unwrap();

        assert_eq!(index.search(ElementType::Vertex, "hello").await.unwrap(), vec!["v1", "v2"]);
        assert_eq!(index.search(ElementType::Vertex, "HELLO dog").await.unwrap(), vec!["v2"]);
        assert!(index.search(ElementType::Edge, "hello").await.unwrap().is_empty());
        assert!(index.search(ElementType::Vertex, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_drops_stale_terms() {
        let index = MemorySearchIndex::new();
        index.index_element(ElementType::Vertex, "v1", fields("old words")).await.unwrap();
        index.index_element(ElementType::Vertex, "v1", fields("new words")).await.unwrap();
        assert!(index.search(ElementType::Vertex, "old").await.unwrap().is_empty());
        assert_eq!(index.search(ElementType::Vertex, "new").await.unwrap(), vec!["v1"]);

        index.remove_element(ElementType::Vertex, "v1").await.unwrap();
        assert!(index.search(ElementType::Vertex, "words").await.unwrap().is_empty());
    }
}
