//! Join resolution: relational nested lookups and graph-edge traversals.
//!
//! The strategy is selected from the schema: when the first join's alias
//! names an attribute with an edge marker the join is a graph traversal,
//! otherwise it is a relational merge. Graph joins arrive as consecutive
//! descriptor pairs (an implicit junction-table convention); [`pair_up`]
//! converts them into explicit [`EdgeJoin`]/[`VertexJoin`] pairs before any
//! query text is built.

use crate::aql;
use crate::criteria::{Criteria, JoinDescriptor};
use crate::error::JoinError;
use crate::plan::QueryPlan;
use crate::schema::Schema;

/// The edge half of a graph join pair: names the edge collection to
/// traverse and the alias the traversed vertices attach under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeJoin {
    pub alias: String,
    pub edge_collection: String,
}

/// The vertex half of a graph join pair: the far-side collection the
/// traversal is filtered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexJoin {
    pub collection: String,
}

/// One matched edge/vertex pair of a graph join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphJoinPair {
    pub edge: EdgeJoin,
    pub vertex: VertexJoin,
}

/// Convert the raw descriptor sequence into explicit graph join pairs.
///
/// Descriptors alternate: even indices identify the edge collection (via
/// the alias attribute's edge marker in the schema), odd indices identify
/// the far-side vertex collection. An edge descriptor with no following
/// vertex descriptor is an error.
pub fn pair_up(
    collection: &str,
    joins: &[JoinDescriptor],
    schema: &Schema,
) -> Result<Vec<GraphJoinPair>, JoinError> {
    let mut pairs = Vec::with_capacity(joins.len() / 2);
    let mut chunks = joins.chunks_exact(2);
    for chunk in &mut chunks {
        let (edge_side, vertex_side) = (&chunk[0], &chunk[1]);
        let attr = schema
            .attribute(collection, &edge_side.alias)
            .ok_or_else(|| JoinError::UnknownAlias {
                collection: collection.to_string(),
                alias: edge_side.alias.clone(),
            })?;
        let edge_collection = attr.edge.clone().ok_or_else(|| JoinError::NotAnEdge {
            collection: collection.to_string(),
            alias: edge_side.alias.clone(),
        })?;
        pairs.push(GraphJoinPair {
            edge: EdgeJoin {
                alias: edge_side.alias.clone(),
                edge_collection,
            },
            vertex: VertexJoin {
                collection: vertex_side.child.clone(),
            },
        });
    }
    if let [unpaired] = chunks.remainder() {
        return Err(JoinError::UnpairedEdgeJoin(unpaired.alias.clone()));
    }
    Ok(pairs)
}

/// Extend the assembled plan for `collection` with the criteria's joins and
/// render the final query text.
pub fn resolve_joins(
    collection: &str,
    criteria: &Criteria,
    schema: &Schema,
    case_sensitive_default: bool,
) -> Result<String, JoinError> {
    let first = match criteria.joins.first() {
        Some(first) => first,
        None => {
            let plan = QueryPlan::assemble(collection, criteria, case_sensitive_default)?;
            return Ok(plan.render());
        }
    };

    let attr =
        schema
            .attribute(collection, &first.alias)
            .ok_or_else(|| JoinError::UnknownAlias {
                collection: collection.to_string(),
                alias: first.alias.clone(),
            })?;

    if attr.edge.is_some() {
        resolve_graph(collection, criteria, schema, case_sensitive_default)
    } else {
        resolve_relational(collection, criteria, schema, case_sensitive_default)
    }
}

/// Relational join: nested iteration over each child collection, merging
/// the matched child under the parent key, with the base clauses applied
/// over the merged rows.
fn resolve_relational(
    collection: &str,
    criteria: &Criteria,
    schema: &Schema,
    case_sensitive_default: bool,
) -> Result<String, JoinError> {
    let mut subquery = format!("FOR {collection} IN {collection}");
    let mut merges = Vec::with_capacity(criteria.joins.len());

    for join in &criteria.joins {
        if schema.attribute(collection, &join.alias).is_none() {
            return Err(JoinError::UnknownAlias {
                collection: collection.to_string(),
                alias: join.alias.clone(),
            });
        }
        subquery.push_str(&format!(
            " FOR {pk} IN {child} FILTER {pk}.{ck} == {collection}.{pk}",
            pk = join.parent_key,
            child = join.child,
            ck = join.child_key,
        ));
        merges.push(format!("\"{pk}\": {pk}", pk = join.parent_key));
    }
    subquery.push_str(&format!(
        " RETURN MERGE({collection}, {{{}}})",
        merges.join(", ")
    ));

    let plan = QueryPlan::over_subquery(&subquery, criteria, case_sensitive_default)?;
    Ok(plan.render())
}

/// Graph join: breadth-first unique-vertex traversal from the root
/// document, one subquery per edge/vertex pair, filtered to the far-side
/// collection.
fn resolve_graph(
    collection: &str,
    criteria: &Criteria,
    schema: &Schema,
    case_sensitive_default: bool,
) -> Result<String, JoinError> {
    let root_id = root_document_id(criteria).ok_or(JoinError::MissingRootId)?;
    let pairs = pair_up(collection, &criteria.joins, schema)?;

    let base = QueryPlan::assemble(collection, criteria, case_sensitive_default)?.render_base();

    let mut fields = vec!["\"d\": d".to_string()];
    for pair in &pairs {
        fields.push(format!(
            "\"{alias}\": (FOR {alias} IN ANY {root} {edge} \
             OPTIONS {{bfs: true, uniqueVertices: true}} \
             FILTER IS_SAME_COLLECTION({vertex}, {alias}) RETURN {alias})",
            alias = pair.edge.alias,
            root = aql::str_literal(&root_id),
            edge = pair.edge.edge_collection,
            vertex = aql::str_literal(&pair.vertex.collection),
        ));
    }

    Ok(format!("{base} RETURN {{{}}}", fields.join(", ")))
}

/// The traversal root: `where._id`, falling back to `where._key`.
fn root_document_id(criteria: &Criteria) -> Option<String> {
    let where_ = criteria.where_.as_ref()?;
    where_
        .get("_id")
        .or_else(|| where_.get("_key"))
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDecl, CollectionDecl};
    use serde_json::json;

    fn descriptor(alias: &str, parent_key: &str, child: &str, child_key: &str) -> JoinDescriptor {
        JoinDescriptor {
            alias: alias.to_string(),
            parent: "users".to_string(),
            parent_key: parent_key.to_string(),
            child: child.to_string(),
            child_key: child_key.to_string(),
        }
    }

    fn relational_schema() -> Schema {
        Schema::new()
            .collection(
                "users",
                CollectionDecl::new("users").attribute(
                    "profile",
                    AttributeDecl {
                        collection: Some("profiles".to_string()),
                        edge: None,
                    },
                ),
            )
            .collection("profiles", CollectionDecl::new("profiles"))
    }

    fn graph_schema() -> Schema {
        Schema::new()
            .collection(
                "users",
                CollectionDecl::new("users").attribute(
                    "friends",
                    AttributeDecl {
                        collection: Some("users".to_string()),
                        edge: Some("friend_of".to_string()),
                    },
                ),
            )
            .collection("posts", CollectionDecl::new("posts"))
    }

    #[test]
    fn test_relational_join_merges_child_key() {
        let criteria =
            Criteria::new().join(descriptor("profile", "profile_id", "profiles", "id"));
        let aql = resolve_joins("users", &criteria, &relational_schema(), true).unwrap();

        assert!(aql.contains("FOR users IN users"));
        assert!(aql.contains("FOR profile_id IN profiles"));
        assert!(aql.contains("FILTER profile_id.id == users.profile_id"));
        assert!(aql.contains("RETURN MERGE(users, {\"profile_id\": profile_id})"));
        // Base clauses wrap the merged rows.
        assert!(aql.starts_with("FOR d IN (FOR users IN users"));
        assert!(aql.ends_with("RETURN {\"d\": d}"));
    }

    #[test]
    fn test_relational_join_unknown_alias() {
        let criteria = Criteria::new().join(descriptor("missing", "x", "profiles", "id"));
        let err = resolve_joins("users", &criteria, &relational_schema(), true).unwrap_err();
        assert!(matches!(err, JoinError::UnknownAlias { .. }));
    }

    // Graph joins arrive as consecutive descriptor pairs: the even-indexed
    // descriptor names the edge relation (its alias resolves to the edge
    // collection through the schema), the odd-indexed descriptor names the
    // far-side vertex collection. This pairing is a structural convention
    // inherited from junction-table join shapes, not self-describing data.
    #[test]
    fn test_graph_join_pairing_convention() {
        let joins = vec![
            descriptor("friends", "users_friends", "friend_of", "users_id"),
            descriptor("friends", "id", "users", "friend_id"),
        ];
        let pairs = pair_up("users", &joins, &graph_schema()).unwrap();

        assert_eq!(
            pairs,
            vec![GraphJoinPair {
                edge: EdgeJoin {
                    alias: "friends".to_string(),
                    edge_collection: "friend_of".to_string(),
                },
                vertex: VertexJoin {
                    collection: "users".to_string(),
                },
            }]
        );
    }

    #[test]
    fn test_unpaired_edge_join_is_an_error() {
        let joins = vec![descriptor("friends", "users_friends", "friend_of", "users_id")];
        let err = pair_up("users", &joins, &graph_schema()).unwrap_err();
        assert_eq!(err, JoinError::UnpairedEdgeJoin("friends".to_string()));
    }

    #[test]
    fn test_graph_join_traversal_clause() {
        let criteria = Criteria::new()
            .filter(json!({"_id": "users/123"}))
            .join(descriptor("friends", "users_friends", "friend_of", "users_id"))
            .join(descriptor("friends", "id", "users", "friend_id"));
        let aql = resolve_joins("users", &criteria, &graph_schema(), true).unwrap();

        assert!(aql.contains("FOR friends IN ANY \"users/123\" friend_of"));
        assert!(aql.contains("OPTIONS {bfs: true, uniqueVertices: true}"));
        assert!(aql.contains("FILTER IS_SAME_COLLECTION(\"users\", friends)"));
        assert!(aql.contains("RETURN {\"d\": d, \"friends\": (FOR friends"));
    }

    #[test]
    fn test_graph_join_root_falls_back_to_key() {
        let criteria = Criteria::new()
            .filter(json!({"_key": "123"}))
            .join(descriptor("friends", "users_friends", "friend_of", "users_id"))
            .join(descriptor("friends", "id", "users", "friend_id"));
        let aql = resolve_joins("users", &criteria, &graph_schema(), true).unwrap();
        assert!(aql.contains("IN ANY \"123\" friend_of"));
    }

    #[test]
    fn test_graph_join_without_root_id_fails() {
        let criteria = Criteria::new()
            .filter(json!({"name": "alice"}))
            .join(descriptor("friends", "users_friends", "friend_of", "users_id"))
            .join(descriptor("friends", "id", "users", "friend_id"));
        let err = resolve_joins("users", &criteria, &graph_schema(), true).unwrap_err();
        assert_eq!(err, JoinError::MissingRootId);
    }

    #[test]
    fn test_no_joins_falls_back_to_plain_plan() {
        let aql = resolve_joins("users", &Criteria::new(), &relational_schema(), true).unwrap();
        assert_eq!(aql, "FOR d IN users SORT d._key ASC RETURN {\"d\": d}");
    }
}
