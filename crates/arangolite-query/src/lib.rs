//! # arangolite-query
//!
//! Criteria-to-AQL compilation pipeline: a declarative query description
//! (filters, sort, pagination, grouping/aggregation, joins) is lowered into
//! AQL query text in three stages:
//!
//! - **Predicate compiler** ([`predicate`]): walks the tagged filter tree
//!   and emits one boolean expression, with case folding, pattern escaping
//!   and identifier mapping.
//! - **Clause assembler** ([`plan`]): combines the predicate with sort,
//!   pagination and aggregation clauses into a [`QueryPlan`].
//! - **Join resolver** ([`join`]): extends a plan with relational nested
//!   lookups or graph-edge traversals, selected by the schema declaration.
//!
//! This crate is pure: no I/O, no async. Execution lives in
//! `arangolite-adapter`.
//!
//! ```
//! use arangolite_query::{Criteria, QueryPlan, SortDirection};
//! use serde_json::json;
//!
//! let criteria = Criteria::new()
//!     .filter(json!({"age": {"greaterThan": 21}}))
//!     .sort("name", SortDirection::Asc)
//!     .limit(10);
//! let plan = QueryPlan::assemble("users", &criteria, false).unwrap();
//! assert!(plan.render().starts_with("FOR d IN users"));
//! ```

pub mod aql;
pub mod criteria;
pub mod error;
pub mod join;
pub mod plan;
pub mod predicate;
pub mod schema;

pub use criteria::{Aggregate, Criteria, JoinDescriptor, SortDirection};
pub use error::{CompileError, JoinError};
pub use join::{resolve_joins, EdgeJoin, GraphJoinPair, VertexJoin};
pub use plan::QueryPlan;
pub use predicate::{Operator, Predicate};
pub use schema::{
    AttributeDecl, CollectionDecl, EdgeDefinition, EdgeRelation, Schema, SchemaError,
};
