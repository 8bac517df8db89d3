//! End-to-end tests for predicate queries, free-text queries and pagination.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use securegraph::{
    Authorizations, Compare, ElementMutation, Error, GeoShape, Graph, GraphElement, MemoryBackend,
    MemorySearchIndex, PropertyDefinition, ResultIter, ValueType, Visibility,
};

fn vis(s: &str) -> Visibility {
    Visibility::new(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ids<T: GraphElement>(iter: ResultIter<T>) -> Vec<String> {
    let mut ids: Vec<String> = iter.map(|r| r.unwrap().id().to_string()).collect();
    ids.sort();
    ids
}

async fn sample_graph() -> (Graph<MemoryBackend>, Authorizations) {
    let graph = Graph::open_memory().await.unwrap().with_search_index(Arc::new(MemorySearchIndex::new()));
    let a = Authorizations::new(["a"]);
    graph
        .prepare_vertex(Some("v1"), &vis("a"))
        .set_property("name", "Hello vertex", &vis("a"))
        .set_property("age", 25, &vis("a"))
        .set_property("birthDate", date(1989, 1, 5), &vis("a"))
        .set_property("location", GeoShape::point(38.9186, -77.2297), &vis("a"))
        .save(&graph, &a)
        .await
        .unwrap();
    graph
        .prepare_vertex(Some("v2"), &vis("a"))
        .set_property("name", "Hello dog", &vis("a"))
        .set_property("age", 30, &vis("a"))
        .set_property("birthDate", date(1984, 1, 5), &vis("a"))
        .set_property("location", GeoShape::point(38.6270, -90.1994), &vis("a"))
        .save(&graph, &a)
        .await
        .unwrap();
    graph.add_vertex(Some("v3"), &vis("a"), &a).await.unwrap();
    graph.add_vertex(Some("v1b"), &vis("b"), &Authorizations::new(["b"])).await.unwrap();
    (graph, a)
}

async fn ages(graph: &Graph<MemoryBackend>, auths: &Authorizations, compare: Compare, age: i64) -> Vec<String> {
    ids(graph.query(auths).has("age", compare, age).vertices().await.unwrap())
}

// ============================================================================
// 1. Comparators and ranges
// ============================================================================

#[tokio::test]
async fn test_has_comparators() {
    let (graph, a) = sample_graph().await;
    assert_eq!(ages(&graph, &a, Compare::Equal, 25).await, vec!["v1"]);
    assert_eq!(ages(&graph, &a, Compare::NotEqual, 25).await, vec!["v2"]);
    assert_eq!(ages(&graph, &a, Compare::GreaterThan, 25).await, vec!["v2"]);
    assert_eq!(ages(&graph, &a, Compare::GreaterThanEqual, 25).await, vec!["v1", "v2"]);
    assert_eq!(ages(&graph, &a, Compare::LessThan, 30).await, vec!["v1"]);
    assert_eq!(ages(&graph, &a, Compare::LessThanEqual, 30).await, vec!["v1", "v2"]);
    assert_eq!(ids(graph.query(&a).has_value("age", 25).has_value("age", 30).vertices().await.unwrap()).len(), 0);
}

#[tokio::test]
async fn test_range_is_inclusive() {
    let (graph, a) = sample_graph().await;
    assert_eq!(ids(graph.query(&a).range("age", 25, 30).vertices().await.unwrap()), vec!["v1", "v2"]);
    assert_eq!(ids(graph.query(&a).range("age", 26, 30).vertices().await.unwrap()), vec!["v2"]);
    let born = graph.query(&a).range("birthDate", date(1985, 1, 1), date(1990, 1, 1)).vertices().await.unwrap();
    assert_eq!(ids(born), vec!["v1"]);
    let earlier = graph.query(&a).has("birthDate", Compare::LessThan, date(1985, 1, 1)).vertices().await.unwrap();
    assert_eq!(ids(earlier), vec!["v2"]);
}

#[tokio::test]
async fn test_geo_within() {
    let (graph, a) = sample_graph().await;
    let near_dc = graph.query(&a).within("location", GeoShape::circle(38.9, -77.2, 10.0)).vertices().await.unwrap();
    assert_eq!(ids(near_dc), vec!["v1"]);
    let wide = graph.query(&a).within("location", GeoShape::circle(38.9, -83.0, 1000.0)).vertices().await.unwrap();
    assert_eq!(ids(wide), vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_type_mismatch_against_definition() {
    let (graph, a) = sample_graph().await;
    graph.define_property(PropertyDefinition::new("age", ValueType::Integer));
    graph.define_property(PropertyDefinition::new("name", ValueType::String));

    let result = graph.query(&a).has("age", Compare::Equal, "25").vertices().await;
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    let result = graph.query(&a).within("name", GeoShape::point(0.0, 0.0)).vertices().await;
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    assert!(graph.query(&a).has("age", Compare::Equal, 25).vertices().await.is_ok());
}

#[tokio::test]
async fn test_only_visible_values_match() {
    let graph = Graph::open_memory().await.unwrap();
    let ab = Authorizations::new(["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), &vis("a"))
        .set_property("age", 25, &vis("b"))
        .save(&graph, &ab)
        .await
        .unwrap();
    let a = Authorizations::new(["a"]);
    assert_eq!(graph.query(&a).has_value("age", 25).vertices().await.unwrap().count(), 0);
    assert_eq!(graph.query(&ab).has_value("age", 25).vertices().await.unwrap().count(), 1);
}

// ============================================================================
// 2. Free text
// ============================================================================

#[tokio::test]
async fn test_text_query() {
    let (graph, a) = sample_graph().await;
    assert_eq!(ids(graph.query_text("vertex", &a).vertices().await.unwrap()), vec!["v1"]);
    assert_eq!(ids(graph.query_text("dog", &a).vertices().await.unwrap()), vec!["v2"]);
    assert_eq!(ids(graph.query_text("hello", &a).vertices().await.unwrap()), vec!["v1", "v2"]);
    let combined = graph.query_text("hello", &a).has("age", Compare::GreaterThan, 26).vertices().await.unwrap();
    assert_eq!(ids(combined), vec!["v2"]);
}

#[tokio::test]
async fn test_text_index_follows_mutations() {
    let (graph, a) = sample_graph().await;
    let v2 = graph.get_vertex("v2", &a).await.unwrap().unwrap();
    v2.prepare_mutation().set_property("name", "Hello cat", &vis("a")).save(&graph, &a).await.unwrap();
    assert!(ids(graph.query_text("dog", &a).vertices().await.unwrap()).is_empty());
    assert_eq!(ids(graph.query_text("cat", &a).vertices().await.unwrap()), vec!["v2"]);

    graph.remove_vertex("v2", &a).await.unwrap();
    assert!(ids(graph.query_text("cat", &a).vertices().await.unwrap()).is_empty());
}

// ============================================================================
// 3. Pagination
// ============================================================================

#[tokio::test]
async fn test_skip_and_limit() {
    let (graph, a) = sample_graph().await;
    assert_eq!(graph.query(&a).vertices().await.unwrap().count(), 3);
    assert_eq!(graph.query(&a).limit(2).vertices().await.unwrap().count(), 2);
    assert_eq!(graph.query(&a).skip(1).limit(5).vertices().await.unwrap().count(), 2);
    assert_eq!(graph.query(&a).skip(3).vertices().await.unwrap().count(), 0);
    assert_eq!(graph.query(&a).skip(100).limit(0).vertices().await.unwrap().count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_pages_partition_the_result(n in 0usize..12, skip in 0usize..15, limit in 1usize..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let graph = Graph::open_memory().await.unwrap();
            let auths = Authorizations::new(["a"]);
            for i in 0..n {
                graph.add_vertex(Some(format!("v{i:02}").as_str()), &vis("a"), &auths).await.unwrap();
            }
            graph.add_vertex(Some("hidden"), &vis("b"), &Authorizations::new(["b"])).await.unwrap();

            let page = graph.query(&auths).skip(skip).limit(limit).vertices().await.unwrap().count();
            prop_assert_eq!(page, limit.min(n.saturating_sub(skip)));

            let mut seen = Vec::new();
            let mut offset = 0;
            loop {
                let page = ids(graph.query(&auths).skip(offset).limit(limit).vertices().await.unwrap());
                if page.is_empty() {
                    break;
                }
                offset += page.len();
                seen.extend(page);
            }
            let all = ids(graph.query(&auths).vertices().await.unwrap());
            prop_assert_eq!(seen, all);
            Ok(())
        })?;
    }
}
