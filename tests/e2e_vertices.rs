//! End-to-end tests for vertex lifecycle and visibility-filtered reads.

use securegraph::{
    Authorizations, Element, ElementMutation, ElementType, Error, Graph, GraphElement, Metadata, Value, Visibility,
};

fn vis(s: &str) -> Visibility {
    Visibility::new(s).unwrap()
}

// ============================================================================
// 1. Visibility of whole elements
// ============================================================================

#[tokio::test]
async fn test_vertex_visible_only_to_satisfying_authorizations() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).await.unwrap();

    let b = Authorizations::new(["b"]);
    assert_eq!(graph.get_vertices(&b).await.unwrap().count(), 0);
    assert!(graph.get_vertex("v1", &b).await.unwrap().is_none());

    let seen: Vec<_> = graph.get_vertices(&a).await.unwrap().map(|v| v.unwrap()).collect();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id(), "v1");
}

#[tokio::test]
async fn test_get_element_by_type() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).await.unwrap();

    let element = graph.get_element(ElementType::Vertex, "v1", &a).await.unwrap().unwrap();
    assert!(matches!(element, Element::Vertex(_)));
    assert_eq!(element.id(), "v1");
    assert!(graph.get_element(ElementType::Edge, "v1", &a).await.unwrap().is_none());
}

#[tokio::test]
async fn test_builder_is_inert_until_saved() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    let builder = graph.prepare_vertex(Some("v1"), &vis("a")).set_property("name", "joe", &vis("a"));
    assert!(graph.get_vertex("v1", &a).await.unwrap().is_none());
    drop(builder);
    assert_eq!(graph.get_vertices(&a).await.unwrap().count(), 0);
}

#[tokio::test]
async fn test_scans_are_restartable() {
    let graph = Graph::open_memory().await.unwrap();
    let auths = Authorizations::empty();
    for id in ["v1", "v2", "v3"] {
        graph.add_vertex(Some(id), &Visibility::empty(), &auths).await.unwrap();
    }
    let mut first = graph.get_vertices(&auths).await.unwrap();
    assert!(first.next().is_some());
    drop(first);
    assert_eq!(graph.get_vertices(&auths).await.unwrap().count(), 3);
    assert_eq!(graph.get_vertices(&auths).await.unwrap().count(), 3);
}

// ============================================================================
// 2. Properties
// ============================================================================

#[tokio::test]
async fn test_multivalued_properties() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    let v = graph
        .prepare_vertex(Some("v1"), &vis("a"))
        .add_property_value("k1", "name", "value1", &vis("a"))
        .add_property_value("k2", "name", "value2", &vis("a"))
        .add_property_value("k1", "age", 25, &vis("a"))
        .save(&graph, &a)
        .await
        .unwrap();
    assert_eq!(v.properties().len(), 3);

    // same triple replaces, new key adds
    let v = v
        .prepare_mutation()
        .add_property_value("k1", "name", "value1b", &vis("a"))
        .add_property_value("k3", "name", "value3", &vis("a"))
        .save(&graph, &a)
        .await
        .unwrap();
    assert_eq!(v.properties().len(), 4);

    let v = graph.get_vertex("v1", &a).await.unwrap().unwrap();
    let mut names: Vec<_> = v.get_property_values("name").filter_map(Value::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["value1b", "value2", "value3"]);
}

#[tokio::test]
async fn test_property_filtered_per_reader() {
    let graph = Graph::open_memory().await.unwrap();
    let ab = Authorizations::new(["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), &vis("a"))
        .set_property("name", "public", &vis("a"))
        .set_property_with_metadata(
            "secret",
            "x",
            Metadata::new().with("source", "wire", &vis("b")).with("confidence", 5, &vis("a")),
            &vis("a"),
        )
        .set_property("clearance", "top", &vis("a&b"))
        .save(&graph, &ab)
        .await
        .unwrap();

    let a_view = graph.get_vertex("v1", &Authorizations::new(["a"])).await.unwrap().unwrap();
    assert_eq!(a_view.properties().len(), 2);
    assert!(a_view.get_property_value("clearance").is_none());
    let secret = a_view.get_property("", "secret").unwrap();
    assert_eq!(secret.metadata().len(), 1);
    assert_eq!(secret.metadata().value("confidence"), Some(&Value::Int(5)));

    let ab_view = graph.get_vertex("v1", &ab).await.unwrap().unwrap();
    assert_eq!(ab_view.properties().len(), 3);
    assert_eq!(ab_view.get_property("", "secret").unwrap().metadata().len(), 2);
}

#[tokio::test]
async fn test_failed_save_leaves_state_unchanged() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    let v = graph
        .prepare_vertex(Some("v1"), &vis("a"))
        .set_property("name", "joe", &vis("a"))
        .save(&graph, &a)
        .await
        .unwrap();

    let result = v
        .prepare_mutation()
        .set_property("name", "bob", &vis("a"))
        .set_property("age", 30, &vis("a"))
        .remove_property_version("", "missing", &vis("a"))
        .save(&graph, &a)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let after = graph.get_vertex("v1", &a).await.unwrap().unwrap();
    assert_eq!(after.properties().len(), 1);
    assert_eq!(after.get_property_value("name"), Some(&Value::from("joe")));
}

// ============================================================================
// 3. Removal
// ============================================================================

#[tokio::test]
async fn test_remove_vertex_requires_authorization() {
    let graph = Graph::open_memory().await.unwrap();
    let a = Authorizations::new(["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).await.unwrap();

    let denied = graph.remove_vertex("v1", &Authorizations::new(["b"])).await;
    assert!(matches!(denied, Err(Error::AuthorizationError(_))));
    assert!(graph.get_vertex("v1", &a).await.unwrap().is_some());

    graph.remove_vertex("v1", &a).await.unwrap();
    assert!(graph.get_vertex("v1", &a).await.unwrap().is_none());
    assert!(matches!(graph.remove_vertex("v1", &a).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_hidden_vertex_is_absent_for_hiding_readers() {
    let graph = Graph::open_memory().await.unwrap();
    let ab = Authorizations::new(["a", "b"]);
    graph.add_vertex(Some("v1"), &vis("a"), &ab).await.unwrap();
    graph.mark_vertex_hidden("v1", &vis("b"), &ab).await.unwrap();

    assert!(graph.get_vertex("v1", &ab).await.unwrap().is_none());
    assert_eq!(graph.get_vertices(&ab).await.unwrap().count(), 0);
    assert_eq!(graph.get_vertices(&Authorizations::new(["a"])).await.unwrap().count(), 1);
}
