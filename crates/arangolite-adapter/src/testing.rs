//! In-memory driver mock for tests.
//!
//! Records every call the adapter makes and serves canned query responses,
//! so reconciliation order and rendered query text can be asserted without
//! a running server.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::{
    CollectionInfo, CollectionKind, Document, Driver, EdgeDefinitionSpec, GraphHandle, GraphInfo,
};
use crate::error::DriverError;

/// Shared recorded state behind the mock.
#[derive(Debug, Default)]
pub struct MockState {
    pub databases: Vec<String>,
    pub collections: Vec<CollectionInfo>,
    pub graphs: Vec<String>,

    pub created_databases: Vec<String>,
    pub created_collections: Vec<(String, CollectionKind)>,
    pub created_graphs: Vec<(String, Vec<EdgeDefinitionSpec>)>,
    pub dropped_collections: Vec<String>,
    pub dropped_graphs: Vec<(String, bool)>,
    pub vertex_registrations: Vec<(String, String)>,
    pub edge_definitions: Vec<(String, EdgeDefinitionSpec)>,

    /// Query texts in submission order.
    pub queries: Vec<String>,
    /// Result sets served to `query`, front first; empty deque serves `[]`.
    pub responses: VecDeque<Vec<Document>>,

    /// Edges keyed by `(edge_collection, vertex_id)`.
    pub edges: HashMap<(String, String), Vec<Document>>,
    pub saved_edges: Vec<(String, String, String)>,
    /// Edge keys whose removal should fail.
    pub failing_edge_keys: HashSet<String>,
    pub removed_edges: Vec<(String, String)>,
}

/// A driver whose every call mutates shared [`MockState`].
#[derive(Clone, Default)]
pub struct MockDriver {
    database: String,
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queues the next result set served by `query`.
    pub fn push_response(&self, rows: Vec<Document>) {
        self.state().responses.push_back(rows);
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_databases(&self) -> Result<Vec<String>, DriverError> {
        Ok(self.state().databases.clone())
    }

    async fn create_database(&self, name: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.created_databases.push(name.to_string());
        state.databases.push(name.to_string());
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<CollectionInfo>, DriverError> {
        Ok(self.state().collections.clone())
    }

    async fn list_graphs(&self) -> Result<Vec<GraphInfo>, DriverError> {
        Ok(self
            .state()
            .graphs
            .iter()
            .map(|name| GraphInfo { name: name.clone() })
            .collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<(), DriverError> {
        let mut state = self.state();
        state.created_collections.push((name.to_string(), kind));
        state.collections.push(CollectionInfo {
            name: name.to_string(),
            kind,
        });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.dropped_collections.push(name.to_string());
        state.collections.retain(|info| info.name != name);
        Ok(())
    }

    async fn query(&self, aql: &str) -> Result<Vec<Document>, DriverError> {
        let mut state = self.state();
        state.queries.push(aql.to_string());
        Ok(state.responses.pop_front().unwrap_or_default())
    }

    fn graph(&self, name: &str) -> Box<dyn GraphHandle> {
        Box::new(MockGraphHandle {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    async fn save_edge(
        &self,
        edge_collection: &str,
        from: &str,
        to: &str,
        data: Option<Document>,
    ) -> Result<Document, DriverError> {
        let mut state = self.state();
        state
            .saved_edges
            .push((edge_collection.to_string(), from.to_string(), to.to_string()));

        let mut edge = data.unwrap_or_default();
        edge.insert(
            "_key".to_string(),
            serde_json::Value::String(format!("e{}", state.saved_edges.len())),
        );
        edge.insert("_from".to_string(), serde_json::Value::String(from.to_string()));
        edge.insert("_to".to_string(), serde_json::Value::String(to.to_string()));
        state
            .edges
            .entry((edge_collection.to_string(), from.to_string()))
            .or_default()
            .push(edge.clone());
        Ok(edge)
    }

    async fn edges_of(
        &self,
        edge_collection: &str,
        vertex_id: &str,
    ) -> Result<Vec<Document>, DriverError> {
        Ok(self
            .state()
            .edges
            .get(&(edge_collection.to_string(), vertex_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_edge(
        &self,
        edge_collection: &str,
        edge_key: &str,
    ) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.failing_edge_keys.contains(edge_key) {
            return Err(DriverError::Request(format!(
                "cannot remove edge {edge_key}"
            )));
        }
        state
            .removed_edges
            .push((edge_collection.to_string(), edge_key.to_string()));
        for edges in state.edges.values_mut() {
            edges.retain(|edge| {
                edge.get("_key").and_then(serde_json::Value::as_str) != Some(edge_key)
            });
        }
        Ok(())
    }
}

struct MockGraphHandle {
    name: String,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl GraphHandle for MockGraphHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, edge_definitions: Vec<EdgeDefinitionSpec>) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state
            .created_graphs
            .push((self.name.clone(), edge_definitions));
        state.graphs.push(self.name.clone());
        Ok(())
    }

    async fn delete(&self, drop_collections: bool) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.dropped_graphs.push((self.name.clone(), drop_collections));
        state.graphs.retain(|name| name != &self.name);
        Ok(())
    }

    async fn add_vertex_collection(&self, name: &str) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .vertex_registrations
            .push((self.name.clone(), name.to_string()));
        Ok(())
    }

    async fn add_edge_definition(
        &self,
        definition: EdgeDefinitionSpec,
    ) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .edge_definitions
            .push((self.name.clone(), definition));
        Ok(())
    }
}
