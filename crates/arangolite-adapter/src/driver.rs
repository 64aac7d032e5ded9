//! Driver abstraction over the database server.
//!
//! The adapter talks to the server exclusively through [`Driver`] and
//! [`GraphHandle`]. Production code plugs in an HTTP client; tests plug in
//! the in-memory mock from [`crate::testing`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;
use arangolite_query::SchemaError;

/// A raw document as returned by the server.
pub type Document = serde_json::Map<String, Value>;

/// Whether a collection stores documents or edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Document,
    Edge,
}

/// One collection as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub kind: CollectionKind,
}

/// One named graph as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInfo {
    pub name: String,
}

/// A parsed `collection/key` document reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub collection: String,
    pub key: String,
}

impl DocumentRef {
    /// Parses a `collection/key` identifier.
    pub fn parse(reference: &str) -> Result<Self, SchemaError> {
        match reference.split_once('/') {
            Some((collection, key)) if !collection.is_empty() && !key.is_empty() => Ok(Self {
                collection: collection.to_string(),
                key: key.to_string(),
            }),
            _ => Err(SchemaError::InvalidReference(reference.to_string())),
        }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.collection, self.key)
    }
}

/// Server operations the adapter needs.
///
/// Implementations must be cheap to share; the connection layer holds one
/// behind an `Arc`.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name of the database this driver is bound to.
    fn database_name(&self) -> &str;

    async fn list_databases(&self) -> Result<Vec<String>, DriverError>;

    async fn create_database(&self, name: &str) -> Result<(), DriverError>;

    async fn collections(&self) -> Result<Vec<CollectionInfo>, DriverError>;

    async fn list_graphs(&self) -> Result<Vec<GraphInfo>, DriverError>;

    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<(), DriverError>;

    async fn drop_collection(&self, name: &str) -> Result<(), DriverError>;

    /// Runs an AQL query and returns the full result set.
    async fn query(&self, aql: &str) -> Result<Vec<Document>, DriverError>;

    /// Handle on a named graph, whether or not it exists yet.
    fn graph(&self, name: &str) -> Box<dyn GraphHandle>;

    /// Inserts an edge document into an edge collection.
    async fn save_edge(
        &self,
        edge_collection: &str,
        from: &str,
        to: &str,
        data: Option<Document>,
    ) -> Result<Document, DriverError>;

    /// Lists edges of `edge_collection` incident to the vertex `vertex_id`.
    async fn edges_of(
        &self,
        edge_collection: &str,
        vertex_id: &str,
    ) -> Result<Vec<Document>, DriverError>;

    async fn remove_edge(
        &self,
        edge_collection: &str,
        edge_key: &str,
    ) -> Result<(), DriverError>;
}

/// One edge definition in a named graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDefinitionSpec {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// Operations on a single named graph.
#[async_trait]
pub trait GraphHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, edge_definitions: Vec<EdgeDefinitionSpec>) -> Result<(), DriverError>;

    /// Deletes the graph; `drop_collections` also removes its collections.
    /// Named `delete` so the receiver-style call does not collide with the
    /// `Drop` destructor on boxed handles.
    async fn delete(&self, drop_collections: bool) -> Result<(), DriverError>;

    async fn add_vertex_collection(&self, name: &str) -> Result<(), DriverError>;

    async fn add_edge_definition(
        &self,
        definition: EdgeDefinitionSpec,
    ) -> Result<(), DriverError>;
}
