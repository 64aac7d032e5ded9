//! Async adapter binding the query compiler to a database driver.
//!
//! A [`Connection`] is opened through the [`ConnectionRegistry`] with a
//! [`Driver`] implementation, a declared [`Schema`](arangolite_query::Schema)
//! and a [`ConnectionConfig`]. Opening a connection first runs the schema
//! reconciler, which provisions the database, collections, edge collections
//! and named graphs the declaration requires. The resulting handle exposes
//! the operation surface: `find`, `update`, `destroy`, `join`,
//! `create_edge`, `delete_edges` and the collection/graph management calls.
//!
//! The `test-utils` feature ships an in-memory [`testing::MockDriver`] that
//! records provisioning calls and serves canned query results.

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod reconcile;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::ConnectionConfig;
pub use driver::{
    CollectionInfo, CollectionKind, Document, DocumentRef, Driver, EdgeDefinitionSpec,
    GraphHandle, GraphInfo,
};
pub use error::{AdapterError, DriverError, ProvisionError, QueryError};
pub use executor::Connection;
pub use reconcile::{Reconciler, Step};
pub use registry::ConnectionRegistry;
