//! Connection registry lifecycle and collection/graph management calls.

use std::sync::Arc;

use serde_json::json;

use arangolite_adapter::testing::MockDriver;
use arangolite_adapter::{ConnectionConfig, ConnectionRegistry, EdgeDefinitionSpec};
use arangolite_query::{CollectionDecl, Schema};

fn schema() -> Schema {
    Schema::new().collection("users", CollectionDecl::new("users"))
}

fn config() -> ConnectionConfig {
    ConnectionConfig {
        database: "app".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_open_is_deduplicated_by_identity() {
    let registry = ConnectionRegistry::new();
    let driver = MockDriver::new("app");

    let first = registry
        .open("app", Arc::new(driver.clone()), schema(), config())
        .await
        .unwrap();
    let second = registry
        .open("app", Arc::new(driver.clone()), schema(), config())
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // Reconciliation ran once.
    assert_eq!(driver.state().created_databases.len(), 1);
}

#[tokio::test]
async fn test_close_removes_the_handle() {
    let registry = ConnectionRegistry::new();
    let driver = MockDriver::new("app");

    registry
        .open("app", Arc::new(driver.clone()), schema(), config())
        .await
        .unwrap();
    assert!(registry.get("app").await.is_some());

    registry.close("app").await;
    assert!(registry.get("app").await.is_none());
}

#[tokio::test]
async fn test_collection_and_graph_management() {
    let registry = ConnectionRegistry::new();
    let driver = MockDriver::new("app");
    let connection = registry
        .open("app", Arc::new(driver.clone()), schema(), config())
        .await
        .unwrap();

    connection
        .create_graph(
            "social",
            vec![EdgeDefinitionSpec {
                collection: "follows".to_string(),
                from: vec!["users".to_string()],
                to: vec!["users".to_string()],
            }],
        )
        .await
        .unwrap();
    connection.delete_graph("social", true).await.unwrap();
    connection.drop_collection("users").await.unwrap();

    let state = driver.state();
    assert_eq!(state.created_graphs[0].0, "social");
    assert_eq!(state.dropped_graphs, vec![("social".to_string(), true)]);
    assert_eq!(state.dropped_collections, vec!["users".to_string()]);
}

#[tokio::test]
async fn test_quote_renders_safe_literals() {
    let registry = ConnectionRegistry::new();
    let driver = MockDriver::new("app");
    let connection = registry
        .open("app", Arc::new(driver), schema(), config())
        .await
        .unwrap();

    assert_eq!(connection.quote(&json!("a \"b\"")), "\"a \\\"b\\\"\"");
    assert_eq!(connection.quote(&json!([1, 2])), "[1,2]");
}
