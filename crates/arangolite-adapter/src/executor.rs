//! Query execution over a reconciled connection.
//!
//! [`Connection`] owns the driver and graph handles plus the declared schema,
//! and turns criteria into rendered queries before handing them to the
//! driver. Every operation is a single request/response round trip; the
//! connection stays usable after a per-operation failure.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::driver::{Document, DocumentRef, Driver, EdgeDefinitionSpec};
use crate::error::{AdapterError, DriverError, QueryError};
use crate::reconcile::Reconciler;
use arangolite_query::{aql, resolve_joins, Criteria, QueryPlan, Schema};

/// A reconciled connection to one database.
pub struct Connection {
    driver: Arc<dyn Driver>,
    schema: Schema,
    config: ConnectionConfig,
}

impl Connection {
    /// Reconciles the schema against the database and returns a usable
    /// handle. Any reconciliation failure aborts setup; no partially
    /// provisioned handle is ever returned.
    pub async fn open(
        driver: Arc<dyn Driver>,
        schema: Schema,
        config: ConnectionConfig,
    ) -> Result<Self, AdapterError> {
        let graph = driver.graph(&config.graph);
        Reconciler::new(driver.as_ref(), graph.as_ref(), &schema, &config)
            .run()
            .await?;
        Ok(Self {
            driver,
            schema,
            config,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs raw query text and returns the full result set.
    pub async fn query(&self, text: &str) -> Result<Vec<Document>, AdapterError> {
        debug!(query = %text, "submitting query");
        let rows = self
            .driver
            .query(text)
            .await
            .map_err(|err| AdapterError::Query(QueryError(err)))?;
        Ok(rows)
    }

    /// Finds documents matching the criteria.
    pub async fn find(
        &self,
        collection: &str,
        criteria: &Criteria,
    ) -> Result<Vec<Document>, AdapterError> {
        let plan = QueryPlan::assemble(collection, criteria, self.config.case_sensitive)?;
        let rows = self.query(&plan.render()).await?;
        Ok(rows
            .into_iter()
            .filter_map(unwrap_row)
            .map(|mut doc| {
                filter_selected(&mut doc, &criteria.select);
                doc
            })
            .collect())
    }

    /// Updates matching documents with a partial merge, or replaces them
    /// wholesale when the criteria carry a `$replace` marker. Replacement
    /// stamps a fresh `createdAt` on the new document. Returns the modified
    /// documents.
    pub async fn update(
        &self,
        collection: &str,
        criteria: &Criteria,
        mut values: Document,
    ) -> Result<Vec<Document>, AdapterError> {
        let mut criteria = criteria.clone();
        let replace = take_replace_marker(&mut criteria);
        if replace {
            values.insert(
                "createdAt".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        let verb = if replace { "REPLACE" } else { "UPDATE" };

        let plan = QueryPlan::assemble(collection, &criteria, self.config.case_sensitive)?;
        let text = format!(
            "{} {verb} d WITH {} IN {collection} LET modified = NEW RETURN modified",
            plan.render_base(),
            aql::literal(&Value::Object(values)),
        );
        self.query(&text).await
    }

    /// Removes matching documents and returns them.
    pub async fn destroy(
        &self,
        collection: &str,
        criteria: &Criteria,
    ) -> Result<Vec<Document>, AdapterError> {
        let plan = QueryPlan::assemble(collection, criteria, self.config.case_sensitive)?;
        let text = format!(
            "{} REMOVE d IN {collection} LET removed = OLD RETURN removed",
            plan.render_base(),
        );
        self.query(&text).await
    }

    /// Finds documents with the criteria's joins resolved, merging joined
    /// results into each returned document.
    pub async fn join(
        &self,
        collection: &str,
        criteria: &Criteria,
    ) -> Result<Vec<Document>, AdapterError> {
        let text = resolve_joins(
            collection,
            criteria,
            &self.schema,
            self.config.case_sensitive,
        )?;
        let rows = self.query(&text).await?;

        let mut documents = Vec::with_capacity(rows.len());
        for mut row in rows {
            let mut doc = match row.remove("d") {
                Some(Value::Object(doc)) => doc,
                _ => continue,
            };
            // Graph joins return traversal results beside the root document,
            // one key per join alias.
            for (alias, vertices) in row {
                doc.insert(alias, vertices);
            }
            project_joined(&mut doc, criteria);
            documents.push(doc);
        }
        Ok(documents)
    }

    /// Creates an edge between two documents, resolving the edge collection
    /// from the declared schema.
    pub async fn create_edge(
        &self,
        from: &str,
        to: &str,
        data: Option<Document>,
    ) -> Result<Document, AdapterError> {
        let from = DocumentRef::parse(from)?;
        let to = DocumentRef::parse(to)?;
        let edge = self.schema.edge_between(&from.collection, &to.collection)?;
        let saved = self
            .driver
            .save_edge(&edge, &from.id(), &to.id(), data)
            .await
            .map_err(AdapterError::from)?;
        Ok(saved)
    }

    /// Deletes every edge of the resolved edge collection incident to
    /// `from`, best-effort: a failed removal is recorded and the remaining
    /// edges are still attempted, with the last failure surfaced at the end.
    pub async fn delete_edges(&self, from: &str, to: &str) -> Result<Vec<Document>, AdapterError> {
        let from = DocumentRef::parse(from)?;
        let to = DocumentRef::parse(to)?;
        let edge = self.schema.edge_between(&from.collection, &to.collection)?;

        let edges = self
            .driver
            .edges_of(&edge, &from.id())
            .await
            .map_err(AdapterError::from)?;

        let mut last_error: Option<DriverError> = None;
        for document in &edges {
            let key = match document.get("_key").and_then(Value::as_str) {
                Some(key) => key,
                None => continue,
            };
            if let Err(err) = self.driver.remove_edge(&edge, key).await {
                warn!(edge = %edge, key = %key, error = %err, "edge removal failed");
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err.into()),
            None => Ok(edges),
        }
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<(), AdapterError> {
        self.driver
            .drop_collection(collection)
            .await
            .map_err(AdapterError::from)
    }

    pub async fn create_graph(
        &self,
        name: &str,
        edge_definitions: Vec<EdgeDefinitionSpec>,
    ) -> Result<(), AdapterError> {
        self.driver
            .graph(name)
            .create(edge_definitions)
            .await
            .map_err(AdapterError::from)
    }

    pub async fn delete_graph(
        &self,
        name: &str,
        drop_collections: bool,
    ) -> Result<(), AdapterError> {
        self.driver
            .graph(name)
            .delete(drop_collections)
            .await
            .map_err(AdapterError::from)
    }

    /// Renders a value as a safe query-text literal.
    pub fn quote(&self, value: &Value) -> String {
        aql::literal(value)
    }
}

/// Result rows wrap the document under a `d` key.
fn unwrap_row(mut row: Document) -> Option<Document> {
    match row.remove("d") {
        Some(Value::Object(doc)) => Some(doc),
        _ => None,
    }
}

/// Applies the criteria's projection, always keeping system fields.
fn filter_selected(doc: &mut Document, select: &[String]) {
    if select.is_empty() {
        return;
    }
    doc.retain(|key, _| {
        matches!(key.as_str(), "_id" | "_key" | "_rev") || select.iter().any(|s| s == key)
    });
}

/// Projection for joined rows: join fields survive regardless of `select`,
/// alongside the system fields. Relational merges attach under the parent
/// key, graph traversals under the alias.
fn project_joined(doc: &mut Document, criteria: &Criteria) {
    if criteria.select.is_empty() {
        return;
    }
    doc.retain(|key, _| {
        matches!(key.as_str(), "_id" | "_key" | "_rev")
            || criteria.select.iter().any(|s| s == key)
            || criteria
                .joins
                .iter()
                .any(|j| j.alias == *key || j.parent_key == *key)
    });
}

/// Consumes the `$replace` marker from the criteria's filter, returning
/// whether it was set.
fn take_replace_marker(criteria: &mut Criteria) -> bool {
    match criteria.where_.as_mut() {
        Some(map) => map
            .remove("$replace")
            .map(|value| value.as_bool().unwrap_or(false))
            .unwrap_or(false),
        None => false,
    }
}
