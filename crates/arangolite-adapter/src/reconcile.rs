//! Schema reconciliation.
//!
//! A fixed DAG of named provisioning steps brings the database in line with
//! the declared schema before a connection handle is returned. The scheduler
//! runs a step only once all of its declared prerequisites have completed;
//! any step failure aborts the whole run.
//!
//! Creation steps process their items strictly in sequence so creation order
//! stays deterministic. Named-graph creation is the exception: distinct
//! graphs are independent, so step 7 fans out concurrently.

use std::collections::HashSet;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::driver::{CollectionKind, Driver, EdgeDefinitionSpec, GraphHandle};
use crate::error::ProvisionError;
use arangolite_query::{EdgeRelation, Schema};

/// One named reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsureDatabase,
    ListCollections,
    ListNamedGraphs,
    DeriveEdgeRelations,
    CreateMissingCollections,
    CreateMissingEdgeCollections,
    CreateMissingNamedGraphs,
    RegisterVertexCollections,
    RegisterEdgeDefinitions,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::EnsureDatabase,
        Step::ListCollections,
        Step::ListNamedGraphs,
        Step::DeriveEdgeRelations,
        Step::CreateMissingCollections,
        Step::CreateMissingEdgeCollections,
        Step::CreateMissingNamedGraphs,
        Step::RegisterVertexCollections,
        Step::RegisterEdgeDefinitions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::EnsureDatabase => "ensure_database",
            Step::ListCollections => "list_collections",
            Step::ListNamedGraphs => "list_named_graphs",
            Step::DeriveEdgeRelations => "derive_edge_relations",
            Step::CreateMissingCollections => "create_missing_collections",
            Step::CreateMissingEdgeCollections => "create_missing_edge_collections",
            Step::CreateMissingNamedGraphs => "create_missing_named_graphs",
            Step::RegisterVertexCollections => "register_vertex_collections",
            Step::RegisterEdgeDefinitions => "register_edge_definitions",
        }
    }

    /// Prerequisite steps that must complete before this one starts.
    pub fn deps(self) -> &'static [Step] {
        match self {
            Step::EnsureDatabase => &[],
            Step::ListCollections => &[Step::EnsureDatabase],
            Step::ListNamedGraphs => &[Step::EnsureDatabase],
            Step::DeriveEdgeRelations => &[],
            Step::CreateMissingCollections => &[Step::ListCollections],
            Step::CreateMissingEdgeCollections => {
                &[Step::ListCollections, Step::DeriveEdgeRelations]
            }
            Step::CreateMissingNamedGraphs => {
                &[Step::ListNamedGraphs, Step::CreateMissingCollections]
            }
            Step::RegisterVertexCollections => &[Step::CreateMissingCollections],
            Step::RegisterEdgeDefinitions => {
                &[Step::CreateMissingEdgeCollections, Step::RegisterVertexCollections]
            }
        }
    }
}

/// Accumulated results of completed steps.
#[derive(Debug, Default)]
struct ReconcileState {
    existing_documents: HashSet<String>,
    existing_edges: HashSet<String>,
    existing_graphs: HashSet<String>,
    relations: Vec<EdgeRelation>,
    /// Document collections created this run, in creation order.
    created_collections: Vec<String>,
}

/// Reconciles the declared schema against the database.
pub struct Reconciler<'a> {
    driver: &'a dyn Driver,
    graph: &'a dyn GraphHandle,
    schema: &'a Schema,
    config: &'a ConnectionConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        driver: &'a dyn Driver,
        graph: &'a dyn GraphHandle,
        schema: &'a Schema,
        config: &'a ConnectionConfig,
    ) -> Self {
        Self {
            driver,
            graph,
            schema,
            config,
        }
    }

    /// Runs every step in dependency order. Fails on the first step error.
    pub async fn run(&self) -> Result<(), ProvisionError> {
        let mut state = ReconcileState::default();
        let mut done: Vec<Step> = Vec::with_capacity(Step::ALL.len());

        while done.len() < Step::ALL.len() {
            // The DAG is acyclic by construction, so at least one pending
            // step is always ready.
            let ready: Vec<Step> = Step::ALL
                .iter()
                .copied()
                .filter(|step| !done.contains(step))
                .filter(|step| step.deps().iter().all(|dep| done.contains(dep)))
                .collect();

            for step in ready {
                debug!(step = step.name(), "running reconciliation step");
                self.run_step(step, &mut state).await?;
                done.push(step);
            }
        }

        info!(
            database = %self.config.database,
            created = state.created_collections.len(),
            "schema reconciliation complete"
        );
        Ok(())
    }

    async fn run_step(&self, step: Step, state: &mut ReconcileState) -> Result<(), ProvisionError> {
        let fail = |source| ProvisionError::Step {
            step: step.name(),
            source,
        };

        match step {
            Step::EnsureDatabase => {
                let databases = self.driver.list_databases().await.map_err(fail)?;
                if !databases.iter().any(|name| name == &self.config.database) {
                    info!(database = %self.config.database, "creating database");
                    self.driver
                        .create_database(&self.config.database)
                        .await
                        .map_err(fail)?;
                }
            }

            Step::ListCollections => {
                for info in self.driver.collections().await.map_err(fail)? {
                    match info.kind {
                        CollectionKind::Document => state.existing_documents.insert(info.name),
                        CollectionKind::Edge => state.existing_edges.insert(info.name),
                    };
                }
            }

            Step::ListNamedGraphs => {
                for graph in self.driver.list_graphs().await.map_err(fail)? {
                    state.existing_graphs.insert(graph.name);
                }
            }

            Step::DeriveEdgeRelations => {
                state.relations =
                    self.schema
                        .edge_relations()
                        .map_err(|source| ProvisionError::Schema {
                            step: step.name(),
                            source,
                        })?;
            }

            Step::CreateMissingCollections => {
                for decl in self.schema.collections.values() {
                    if decl.is_named_graph() {
                        continue;
                    }
                    if state.existing_documents.contains(&decl.collection) {
                        continue;
                    }
                    info!(collection = %decl.collection, "creating collection");
                    self.driver
                        .create_collection(&decl.collection, CollectionKind::Document)
                        .await
                        .map_err(fail)?;
                    state.created_collections.push(decl.collection.clone());
                }
            }

            Step::CreateMissingEdgeCollections => {
                let mut created = HashSet::new();
                for relation in &state.relations {
                    if state.existing_edges.contains(&relation.edge)
                        || !created.insert(relation.edge.clone())
                    {
                        continue;
                    }
                    info!(collection = %relation.edge, "creating edge collection");
                    self.driver
                        .create_collection(&relation.edge, CollectionKind::Edge)
                        .await
                        .map_err(fail)?;
                }
            }

            Step::CreateMissingNamedGraphs => {
                let pending: Vec<_> = self
                    .schema
                    .collections
                    .values()
                    .filter(|decl| decl.is_named_graph())
                    .filter(|decl| !state.existing_graphs.contains(&decl.collection))
                    .collect();

                let creates = pending.into_iter().map(|decl| {
                    let handle = self.driver.graph(&decl.collection);
                    let definitions: Vec<EdgeDefinitionSpec> = decl
                        .edge_definitions
                        .iter()
                        .flatten()
                        .map(|def| EdgeDefinitionSpec {
                            collection: def.collection.clone(),
                            from: def.from.clone(),
                            to: def.to.clone(),
                        })
                        .collect();
                    async move {
                        info!(graph = %handle.name(), "creating named graph");
                        handle.create(definitions).await
                    }
                });
                try_join_all(creates).await.map_err(fail)?;
            }

            Step::RegisterVertexCollections => {
                for collection in &state.created_collections {
                    self.graph
                        .add_vertex_collection(collection)
                        .await
                        .map_err(fail)?;
                }
            }

            Step::RegisterEdgeDefinitions => {
                for relation in &state.relations {
                    let from_collection = self
                        .schema
                        .collections
                        .get(&relation.from)
                        .map(|decl| decl.collection.clone())
                        .unwrap_or_else(|| relation.from.clone());
                    self.graph
                        .add_edge_definition(EdgeDefinitionSpec {
                            collection: relation.edge.clone(),
                            from: vec![from_collection],
                            to: vec![relation.to.clone()],
                        })
                        .await
                        .map_err(fail)?;
                }
            }
        }

        Ok(())
    }
}
