//! Declared logical schema: collections, edge relations, named graphs.
//!
//! Schema declarations are supplied once at connection setup and read-only
//! thereafter. The join resolver uses them to pick a join strategy; the
//! reconciler uses them to decide what must exist in the database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors resolving schema declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// No edge relation attribute links the two collections.
    #[error("no edge relation from `{from}` to `{to}` in the schema declaration")]
    UnresolvedEdgeRelation { from: String, to: String },

    /// More than one edge relation attribute matched; the declaration is
    /// ambiguous and must be fixed by the caller.
    #[error("ambiguous edge relation from `{from}` to `{to}`: matches {matches:?}")]
    AmbiguousEdgeRelation {
        from: String,
        to: String,
        matches: Vec<String>,
    },

    /// An attribute carries an edge marker but no target collection.
    #[error("edge attribute `{attribute}` on `{collection}` declares no target collection")]
    MissingEdgeTarget {
        collection: String,
        attribute: String,
    },

    /// A document reference did not look like `collection/key`.
    #[error("invalid document reference `{0}`, expected `collection/key`")]
    InvalidReference(String),
}

/// One edge definition of a named graph: an edge collection connecting
/// source and target vertex collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// One declared attribute. `edge` marks the attribute as a graph edge
/// relation through the named edge collection; `collection` names the
/// relation's target collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
}

/// One declared collection. A declaration carrying `edge_definitions`
/// denotes a named graph rather than a plain collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDecl {
    pub table_name: String,
    /// Physical collection name in the database.
    pub collection: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_definitions: Option<Vec<EdgeDefinition>>,
}

impl CollectionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table_name: name.clone(),
            collection: name,
            attributes: BTreeMap::new(),
            edge_definitions: None,
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attr: AttributeDecl) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Mark this declaration as a named graph with the given edge
    /// definitions.
    pub fn named_graph(mut self, edge_definitions: Vec<EdgeDefinition>) -> Self {
        self.edge_definitions = Some(edge_definitions);
        self
    }

    pub fn is_named_graph(&self) -> bool {
        self.edge_definitions.is_some()
    }
}

/// A derived edge relation: source collection, edge collection, target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRelation {
    pub from: String,
    pub edge: String,
    pub to: String,
}

/// The full schema declaration, keyed by logical collection name.
///
/// A BTreeMap keeps iteration (and therefore provisioning) order
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub collections: BTreeMap<String, CollectionDecl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, name: impl Into<String>, decl: CollectionDecl) -> Self {
        self.collections.insert(name.into(), decl);
        self
    }

    /// Look up a declared attribute by collection and attribute name.
    pub fn attribute(&self, collection: &str, name: &str) -> Option<&AttributeDecl> {
        self.collections
            .get(collection)?
            .attributes
            .get(name)
    }

    /// Derive every declared edge relation, with its source collection
    /// attached. An edge attribute without a target collection is a
    /// declaration error.
    pub fn edge_relations(&self) -> Result<Vec<EdgeRelation>, SchemaError> {
        let mut relations = Vec::new();
        for (name, decl) in &self.collections {
            for (attr_name, attr) in &decl.attributes {
                if let Some(edge) = &attr.edge {
                    let to = attr.collection.as_ref().ok_or_else(|| {
                        SchemaError::MissingEdgeTarget {
                            collection: name.clone(),
                            attribute: attr_name.clone(),
                        }
                    })?;
                    relations.push(EdgeRelation {
                        from: decl.table_name.clone(),
                        edge: edge.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
        Ok(relations)
    }

    /// Resolve the edge collection linking `from` to `to`.
    ///
    /// Exactly one attribute on `from` must declare `to` as its target;
    /// none or several is a schema error.
    pub fn edge_between(&self, from: &str, to: &str) -> Result<String, SchemaError> {
        let decl = self
            .collections
            .get(from)
            .ok_or_else(|| SchemaError::UnresolvedEdgeRelation {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        let matches: Vec<&String> = decl
            .attributes
            .values()
            .filter(|attr| attr.collection.as_deref() == Some(to))
            .filter_map(|attr| attr.edge.as_ref())
            .collect();

        match matches.as_slice() {
            [edge] => Ok((*edge).clone()),
            [] => Err(SchemaError::UnresolvedEdgeRelation {
                from: from.to_string(),
                to: to.to_string(),
            }),
            several => Err(SchemaError::AmbiguousEdgeRelation {
                from: from.to_string(),
                to: to.to_string(),
                matches: several.iter().map(|e| (*e).clone()).collect(),
            }),
        }
    }
}
