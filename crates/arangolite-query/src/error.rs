//! Error types for criteria parsing and query compilation.

use thiserror::Error;

/// Errors raised while parsing criteria or compiling a predicate tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An `or` key was present but its value was not an array of predicates.
    #[error("`or` expects an array of predicates, got {0}")]
    OrNotArray(String),

    /// A predicate value shape that cannot be compiled (e.g. a bare null
    /// under an operator that requires a scalar).
    #[error("unsupported predicate shape for field `{field}`: {message}")]
    UnsupportedShape { field: String, message: String },

    /// A criteria key that should hold a field list did not.
    #[error("aggregation directive `{0}` expects an array of field names")]
    BadAggregate(String),
}

/// Errors raised while resolving joins against the schema declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinError {
    /// A join alias has no matching attribute on the root collection.
    #[error("join alias `{alias}` has no matching attribute on collection `{collection}`")]
    UnknownAlias { collection: String, alias: String },

    /// A graph join requires the root document id in the criteria
    /// (`where._id` or `where._key`), and none was found.
    #[error("graph join requires a root document id in `where._id` or `where._key`")]
    MissingRootId,

    /// Graph join descriptors must come as edge/vertex pairs; an edge
    /// descriptor was left without its far-side partner.
    #[error("graph join `{0}` is missing its far-side vertex descriptor")]
    UnpairedEdgeJoin(String),

    /// The alias attribute selected for a graph join carries no edge marker.
    #[error("attribute `{alias}` on collection `{collection}` is not an edge relation")]
    NotAnEdge { collection: String, alias: String },

    /// The criteria's predicate failed to compile while assembling the
    /// joined plan.
    #[error(transparent)]
    Compile(#[from] CompileError),
}
