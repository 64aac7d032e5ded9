//! Adapter operations over a provisioned mock connection.

use std::sync::Arc;

use serde_json::{json, Value};

use arangolite_adapter::testing::MockDriver;
use arangolite_adapter::{Connection, ConnectionConfig, Document};
use arangolite_query::{AttributeDecl, CollectionDecl, Criteria, JoinDescriptor, Schema};

fn schema() -> Schema {
    Schema::new()
        .collection(
            "users",
            CollectionDecl::new("users")
                .attribute(
                    "posts",
                    AttributeDecl {
                        collection: Some("posts".to_string()),
                        edge: Some("wrote".to_string()),
                    },
                )
                .attribute(
                    "profile",
                    AttributeDecl {
                        collection: Some("profiles".to_string()),
                        edge: None,
                    },
                ),
        )
        .collection("posts", CollectionDecl::new("posts"))
        .collection("profiles", CollectionDecl::new("profiles"))
}

async fn connect(driver: &MockDriver) -> Connection {
    Connection::open(
        Arc::new(driver.clone()),
        schema(),
        ConnectionConfig {
            database: "app".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn last_query(driver: &MockDriver) -> String {
    driver.state().queries.last().unwrap().clone()
}

#[tokio::test]
async fn test_find_unwraps_rows_and_projects() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(
        json!({"d": {"_key": "1", "name": "Alice", "age": 30}}),
    )]);

    let criteria = Criteria::new()
        .filter(json!({"name": "Alice"}))
        .select(["name"]);
    let found = connection.find("users", &criteria).await.unwrap();

    let query = last_query(&driver);
    assert_eq!(
        query,
        "FOR d IN users FILTER ((LOWER(d.name) == LOWER(\"Alice\"))) \
         SORT d._key ASC RETURN {\"d\": d}"
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&json!("Alice")));
    assert_eq!(found[0].get("_key"), Some(&json!("1")));
    assert!(!found[0].contains_key("age"));
}

#[tokio::test]
async fn test_update_merges_partially() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(json!({"_key": "1", "age": 31}))]);

    let criteria = Criteria::new().filter(json!({"_key": "1"}));
    let modified = connection
        .update("users", &criteria, doc(json!({"age": 31})))
        .await
        .unwrap();

    let query = last_query(&driver);
    assert!(query.contains("UPDATE d WITH {\"age\":31} IN users"));
    assert!(query.ends_with("LET modified = NEW RETURN modified"));
    assert!(!query.contains("createdAt"));
    assert_eq!(modified[0].get("age"), Some(&json!(31)));
}

#[tokio::test]
async fn test_replace_stamps_creation_time() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![]);

    let criteria = Criteria::new().filter(json!({"_key": "1", "$replace": true}));
    connection
        .update("users", &criteria, doc(json!({"name": "Bob"})))
        .await
        .unwrap();

    let query = last_query(&driver);
    assert!(query.contains("REPLACE d WITH"));
    assert!(query.contains("\"createdAt\""));
    // The marker never reaches the filter.
    assert!(!query.contains("$replace"));
    assert!(query.contains("FILTER ((d._key) == (\"1\"))"));
}

#[tokio::test]
async fn test_destroy_returns_removed_documents() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(json!({"_key": "1", "name": "Alice"}))]);

    let criteria = Criteria::new().filter(json!({"_key": "1"}));
    let removed = connection.destroy("users", &criteria).await.unwrap();

    let query = last_query(&driver);
    assert!(query.ends_with("REMOVE d IN users LET removed = OLD RETURN removed"));
    assert_eq!(removed[0].get("name"), Some(&json!("Alice")));
}

#[tokio::test]
async fn test_relational_join_merges_rows() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(
        json!({"d": {"_key": "1", "name": "Alice", "profile_id": {"bio": "hi"}}}),
    )]);

    let criteria = Criteria::new().join(JoinDescriptor {
        alias: "profile".to_string(),
        parent: "users".to_string(),
        parent_key: "profile_id".to_string(),
        child: "profiles".to_string(),
        child_key: "_key".to_string(),
    });
    let rows = connection.join("users", &criteria).await.unwrap();

    let query = last_query(&driver);
    assert!(query.starts_with("FOR d IN (FOR users IN users"));
    assert!(query.contains("FILTER profile_id._key == users.profile_id"));
    assert_eq!(rows[0]["profile_id"], json!({"bio": "hi"}));
}

#[tokio::test]
async fn test_graph_join_attaches_traversal_results() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(json!({
        "d": {"_key": "1", "name": "Alice"},
        "posts": [{"_key": "p1", "title": "hello"}],
    }))]);

    let edge_side = JoinDescriptor {
        alias: "posts".to_string(),
        parent: "users".to_string(),
        parent_key: "posts".to_string(),
        child: "wrote".to_string(),
        child_key: "_key".to_string(),
    };
    let vertex_side = JoinDescriptor {
        alias: "posts_vertices".to_string(),
        parent: "wrote".to_string(),
        parent_key: "_key".to_string(),
        child: "posts".to_string(),
        child_key: "_key".to_string(),
    };
    let criteria = Criteria::new()
        .filter(json!({"_id": "users/1"}))
        .join(edge_side)
        .join(vertex_side);
    let rows = connection.join("users", &criteria).await.unwrap();

    let query = last_query(&driver);
    assert!(query.contains("FOR posts IN ANY \"users/1\" wrote"));
    assert!(query.contains("OPTIONS {bfs: true, uniqueVertices: true}"));
    assert!(query.contains("FILTER IS_SAME_COLLECTION(\"posts\", posts)"));

    assert_eq!(rows[0].get("name"), Some(&json!("Alice")));
    assert_eq!(rows[0]["posts"], json!([{"_key": "p1", "title": "hello"}]));
}

#[tokio::test]
async fn test_graph_join_aliases_survive_projection() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(json!({
        "d": {"_key": "1", "name": "Alice", "age": 30},
        "posts": [{"_key": "p1", "title": "hello"}],
    }))]);

    let edge_side = JoinDescriptor {
        alias: "posts".to_string(),
        parent: "users".to_string(),
        parent_key: "posts".to_string(),
        child: "wrote".to_string(),
        child_key: "_key".to_string(),
    };
    let vertex_side = JoinDescriptor {
        alias: "posts_vertices".to_string(),
        parent: "wrote".to_string(),
        parent_key: "_key".to_string(),
        child: "posts".to_string(),
        child_key: "_key".to_string(),
    };
    let criteria = Criteria::new()
        .filter(json!({"_id": "users/1"}))
        .select(["name"])
        .join(edge_side)
        .join(vertex_side);
    let rows = connection.join("users", &criteria).await.unwrap();

    // The traversal result is kept even though `select` does not name it.
    assert_eq!(rows[0]["posts"], json!([{"_key": "p1", "title": "hello"}]));
    assert_eq!(rows[0].get("name"), Some(&json!("Alice")));
    assert!(!rows[0].contains_key("age"));
}

#[tokio::test]
async fn test_relational_join_fields_survive_projection() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    driver.push_response(vec![doc(json!({
        "d": {"_key": "1", "name": "Alice", "age": 30, "profile_id": {"bio": "hi"}},
    }))]);

    let criteria = Criteria::new()
        .select(["name"])
        .join(JoinDescriptor {
            alias: "profile".to_string(),
            parent: "users".to_string(),
            parent_key: "profile_id".to_string(),
            child: "profiles".to_string(),
            child_key: "_key".to_string(),
        });
    let rows = connection.join("users", &criteria).await.unwrap();

    assert_eq!(rows[0]["profile_id"], json!({"bio": "hi"}));
    assert_eq!(rows[0].get("name"), Some(&json!("Alice")));
    assert!(!rows[0].contains_key("age"));
}

#[tokio::test]
async fn test_create_edge_resolves_edge_collection() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;

    let edge = connection
        .create_edge("users/1", "posts/9", Some(doc(json!({"at": "today"}))))
        .await
        .unwrap();

    assert_eq!(edge.get("_from"), Some(&json!("users/1")));
    assert_eq!(edge.get("_to"), Some(&json!("posts/9")));
    assert_eq!(
        driver.state().saved_edges,
        vec![(
            "wrote".to_string(),
            "users/1".to_string(),
            "posts/9".to_string()
        )]
    );
}

#[tokio::test]
async fn test_create_edge_rejects_malformed_reference() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;

    assert!(connection.create_edge("users1", "posts/9", None).await.is_err());
}

#[tokio::test]
async fn test_delete_edges_removes_all() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    for _ in 0..3 {
        connection.create_edge("users/1", "posts/9", None).await.unwrap();
    }

    let removed = connection.delete_edges("users/1", "posts/9").await.unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(driver.state().removed_edges.len(), 3);
}

#[tokio::test]
async fn test_delete_edges_continues_past_failures() {
    let driver = MockDriver::new("app");
    let connection = connect(&driver).await;
    for _ in 0..3 {
        connection.create_edge("users/1", "posts/9", None).await.unwrap();
    }
    // Edge keys are e1..e3; fail the middle one.
    driver.state().failing_edge_keys.insert("e2".to_string());

    let result = connection.delete_edges("users/1", "posts/9").await;

    assert!(result.is_err());
    // The two healthy edges were still removed.
    let state = driver.state();
    assert_eq!(state.removed_edges.len(), 2);
    assert!(!state
        .removed_edges
        .iter()
        .any(|(_, key)| key == "e2"));
}
