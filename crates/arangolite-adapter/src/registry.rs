//! Connection registry.
//!
//! Owns the open connections keyed by identity, with an explicit
//! open/get/close lifecycle. Callers share one registry; there is no
//! process-global state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::driver::Driver;
use crate::error::AdapterError;
use crate::executor::Connection;
use arangolite_query::Schema;

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (and reconciles) a connection under `identity`, or returns the
    /// already-open one.
    pub async fn open(
        &self,
        identity: &str,
        driver: Arc<dyn Driver>,
        schema: Schema,
        config: ConnectionConfig,
    ) -> Result<Arc<Connection>, AdapterError> {
        let mut connections = self.connections.lock().await;
        if let Some(existing) = connections.get(identity) {
            return Ok(Arc::clone(existing));
        }

        info!(identity = %identity, database = %config.database, "opening connection");
        let connection = Arc::new(Connection::open(driver, schema, config).await?);
        connections.insert(identity.to_string(), Arc::clone(&connection));
        Ok(connection)
    }

    pub async fn get(&self, identity: &str) -> Option<Arc<Connection>> {
        self.connections.lock().await.get(identity).cloned()
    }

    /// Drops the registry's handle; in-flight operations on clones of the
    /// returned `Arc` complete normally.
    pub async fn close(&self, identity: &str) -> Option<Arc<Connection>> {
        self.connections.lock().await.remove(identity)
    }
}
