//! Typed criteria model and the parser for the loose criteria shape.
//!
//! Criteria arrive from callers either as this typed struct (built with the
//! fluent methods) or as the classic JSON shape, where the reserved keys are
//! `where`, `sort`, `limit`, `skip`, `select`, `joins`, `groupBy` and every
//! other top-level key is an aggregation function name mapped to a field
//! list. [`Criteria::from_value`] confines that key-sniffing to one place;
//! the rest of the pipeline only ever sees the typed model.

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_aql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One relational join descriptor.
///
/// Graph joins are supplied as consecutive descriptor pairs and converted to
/// explicit edge/vertex pairs by the join resolver; see `join::GraphJoinPair`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDescriptor {
    /// Field name under which matched rows attach to the result document.
    pub alias: String,
    /// Parent (root) collection name.
    pub parent: String,
    /// Key on the parent side of the equi-join.
    pub parent_key: String,
    /// Child (joined) collection name.
    pub child: String,
    /// Key on the child side of the equi-join.
    pub child_key: String,
}

/// One aggregation directive: a function applied to a list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Aggregation function name (`sum`, `average`, `count`, ...), emitted
    /// uppercased as the AQL function.
    pub func: String,
    /// Fields the function is applied to, one output field per entry.
    pub fields: Vec<String>,
}

/// Declarative query input: filter, sort, pagination, projection, joins,
/// and aggregation. Constructed fresh per call and immutable once compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Predicate tree in its JSON shape; parsed by `predicate::parse`.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Map<String, Value>>,

    /// Ordered sort keys. A `d._key ASC` tiebreaker is always appended at
    /// compile time, whether or not the caller sorts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<(String, SortDirection)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,

    /// Fields to keep after fetch; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDescriptor>,

    /// Group-by fields (the reserved `groupBy` key).
    #[serde(default, rename = "groupBy", skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,

    /// Aggregation directives gathered from non-reserved keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<Aggregate>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the predicate tree from a JSON object value.
    pub fn filter(mut self, where_: Value) -> Self {
        if let Value::Object(map) = where_ {
            self.where_ = Some(map);
        }
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn join(mut self, descriptor: JoinDescriptor) -> Self {
        self.joins.push(descriptor);
        self
    }

    pub fn group_by(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn aggregate(
        mut self,
        func: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.aggregates.push(Aggregate {
            func: func.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// True when any aggregation directive or group-by is present.
    pub fn has_aggregation(&self) -> bool {
        !self.aggregates.is_empty() || !self.group_by.is_empty()
    }

    /// Parse the loose JSON criteria shape.
    ///
    /// Reserved keys map to their typed fields; any other key is treated as
    /// an aggregation function name whose value must be a field list.
    pub fn from_value(value: &Value) -> Result<Self, CompileError> {
        let map = match value {
            Value::Object(map) => map,
            _ => return Ok(Self::default()),
        };

        let mut criteria = Self::default();
        for (key, val) in map {
            match key.as_str() {
                "where" => {
                    if let Value::Object(w) = val {
                        criteria.where_ = Some(w.clone());
                    }
                }
                "sort" => criteria.sort = parse_sort(val),
                "limit" => criteria.limit = val.as_u64(),
                "skip" => criteria.skip = val.as_u64(),
                "select" => criteria.select = string_list(val),
                "joins" => {
                    if let Value::Array(items) = val {
                        for item in items {
                            if let Ok(j) = serde_json::from_value(item.clone()) {
                                criteria.joins.push(j);
                            }
                        }
                    }
                }
                "groupBy" => criteria.group_by = string_list(val),
                func => {
                    let fields = match val {
                        Value::Array(_) => string_list(val),
                        _ => return Err(CompileError::BadAggregate(func.to_string())),
                    };
                    criteria.aggregates.push(Aggregate {
                        func: func.to_string(),
                        fields,
                    });
                }
            }
        }
        Ok(criteria)
    }
}

/// Sort arrives as `{field: -1 | 1}`; negative means descending.
fn parse_sort(value: &Value) -> Vec<(String, SortDirection)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        for (field, dir) in map {
            let direction = match dir.as_i64() {
                Some(n) if n < 0 => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            out.push((field.clone(), direction));
        }
    }
    out
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}
