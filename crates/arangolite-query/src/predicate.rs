//! Predicate tree: parsing from the JSON filter shape and compilation to an
//! AQL boolean expression.
//!
//! The JSON shape combines field comparisons with implicit AND at each level
//! and explicit OR via the `or` key. Parsing lowers it into the tagged
//! [`Predicate`] tree; compilation walks that tree depth-first and emits one
//! boolean expression with every literal rendered through [`crate::aql`].

use crate::aql;
use crate::error::CompileError;
use serde_json::{Map, Value};

/// Comparison operator on one predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    Like,
    StartsWith,
    EndsWith,
    In,
    NotIn,
}

impl Operator {
    /// The emitted AQL comparison operator.
    pub fn as_aql(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Contains | Operator::Like | Operator::StartsWith | Operator::EndsWith => {
                "LIKE"
            }
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Membership operators compare against arrays and bypass case folding.
    fn is_membership(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Relational literal comparisons carry an existence guard so documents
    /// lacking the field neither match nor error.
    fn needs_existence_guard(self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte
        )
    }
}

/// A parsed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf {
        field: String,
        op: Operator,
        value: Value,
        /// Per-leaf case sensitivity override; `None` falls back to the
        /// connection default.
        case_sensitive: Option<bool>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Parse the JSON filter shape into a predicate tree.
///
/// Sibling keys become an [`Predicate::And`] group. The `or` key expects an
/// array of filter objects, each of which parses to an AND group of its own.
pub fn parse(filter: &Map<String, Value>) -> Result<Predicate, CompileError> {
    let mut siblings = Vec::new();
    for (key, value) in filter {
        parse_entry(key, value, None, &mut siblings)?;
    }
    Ok(Predicate::And(siblings))
}

fn parse_entry(
    key: &str,
    value: &Value,
    case_sensitive: Option<bool>,
    out: &mut Vec<Predicate>,
) -> Result<(), CompileError> {
    if key == "or" {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(CompileError::OrNotArray(type_name(other).to_string())),
        };
        let mut branches = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(map) => branches.push(parse(map)?),
                other => {
                    return Err(CompileError::UnsupportedShape {
                        field: "or".to_string(),
                        message: format!("expected a filter object, got {}", type_name(other)),
                    })
                }
            }
        }
        out.push(Predicate::Or(branches));
        return Ok(());
    }

    // `like` as a top-level keyword: {like: {field: pattern}}.
    if key == "like" {
        if let Value::Object(map) = value {
            for (field, pattern) in map {
                out.push(Predicate::Leaf {
                    field: field.clone(),
                    op: Operator::Like,
                    value: pattern.clone(),
                    case_sensitive,
                });
            }
            return Ok(());
        }
    }

    match value {
        Value::Array(_) => out.push(Predicate::Leaf {
            field: key.to_string(),
            op: Operator::In,
            value: value.clone(),
            case_sensitive,
        }),
        Value::Object(map) => parse_spec(key, map, case_sensitive, out)?,
        scalar => out.push(Predicate::Leaf {
            field: key.to_string(),
            op: Operator::Eq,
            value: scalar.clone(),
            case_sensitive,
        }),
    }
    Ok(())
}

/// Parse an operator spec object `{operator: value, caseSensitive?: bool}`.
/// Keys that are not recognized operators are dotted sub-field paths and
/// recurse one level deeper.
fn parse_spec(
    field: &str,
    spec: &Map<String, Value>,
    inherited_cs: Option<bool>,
    out: &mut Vec<Predicate>,
) -> Result<(), CompileError> {
    let case_sensitive = spec
        .get("caseSensitive")
        .and_then(Value::as_bool)
        .or(inherited_cs);

    for (key, value) in spec {
        let op = match key.as_str() {
            "caseSensitive" => continue,
            "contains" => Operator::Contains,
            "like" => Operator::Like,
            "startsWith" => Operator::StartsWith,
            "endsWith" => Operator::EndsWith,
            "lessThan" | "<" => Operator::Lt,
            "lessThanOrEqual" | "<=" => Operator::Lte,
            "greaterThan" | ">" => Operator::Gt,
            "greaterThanOrEqual" | ">=" => Operator::Gte,
            "not" | "!" => {
                if value.is_array() {
                    Operator::NotIn
                } else {
                    Operator::Ne
                }
            }
            "nin" => Operator::NotIn,
            sub_key => {
                // Dotted sub-field path: {address: {city: "x"}} filters on
                // d.address.city.
                let path = format!("{field}.{sub_key}");
                parse_entry(&path, value, case_sensitive, out)?;
                continue;
            }
        };
        out.push(Predicate::Leaf {
            field: field.to_string(),
            op,
            value: value.clone(),
            case_sensitive,
        });
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Compile a predicate tree into an AQL boolean expression over the
/// iteration variable `d`.
///
/// `case_sensitive_default` is the connection-level default; individual
/// leaves may override it. A group with no compilable children (an empty
/// `or`, or a spec carrying only `caseSensitive`) renders to the empty
/// string; the clause assembler omits the FILTER clause entirely rather
/// than emit an empty boolean expression.
pub fn compile(predicate: &Predicate, case_sensitive_default: bool) -> String {
    match predicate {
        Predicate::And(children) => children
            .iter()
            .map(|c| compile(c, case_sensitive_default))
            .filter(|expr| !expr.is_empty())
            .collect::<Vec<_>>()
            .join(" && "),
        Predicate::Or(children) => {
            let parts: Vec<String> = children
                .iter()
                .map(|c| compile(c, case_sensitive_default))
                .filter(|expr| !expr.is_empty())
                .collect();
            if parts.is_empty() {
                String::new()
            } else {
                format!("({})", parts.join(" || "))
            }
        }
        Predicate::Leaf {
            field,
            op,
            value,
            case_sensitive,
        } => compile_leaf(field, *op, value, case_sensitive.unwrap_or(case_sensitive_default)),
    }
}

fn compile_leaf(field: &str, op: Operator, value: &Value, case_sensitive: bool) -> String {
    let literal = render_literal(op, value);

    // Case folding applies to string comparisons only; membership tests
    // compare against arrays verbatim, and document identity attributes
    // are case-sensitive identifiers.
    let identity = matches!(field, "id" | "_id" | "_key" | "_rev");
    let fold =
        !case_sensitive && !identity && !op.is_membership() && literal_is_string(op, value);
    let wrap = |expr: String| -> String {
        if fold {
            format!("LOWER({expr})")
        } else {
            format!("({expr})")
        }
    };

    // `id` and the internal attributes address the document identity rather
    // than user fields, and never carry the existence guard.
    let aql_op = op.as_aql();
    match field {
        "id" => format!("{} {} {}", wrap("d._key".to_string()), aql_op, wrap(literal)),
        "_id" | "_key" | "_rev" => {
            format!("{} {} {}", wrap(format!("d.{field}")), aql_op, wrap(literal))
        }
        _ => {
            let guard = if op.needs_existence_guard() {
                format!("HAS(d, {}) AND ", aql::str_literal(field))
            } else {
                String::new()
            };
            format!(
                "({guard}{} {} {})",
                wrap(format!("d.{field}")),
                aql_op,
                wrap(literal)
            )
        }
    }
}

/// Render the comparison literal, wrapping pattern operators with wildcards
/// after escaping the pattern-special characters.
fn render_literal(op: Operator, value: &Value) -> String {
    let as_text = |v: &Value| -> String {
        match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    };
    match op {
        Operator::Contains | Operator::Like => {
            aql::str_literal(&format!("%{}%", aql::escape_pattern(&as_text(value))))
        }
        Operator::StartsWith => {
            aql::str_literal(&format!("{}%", aql::escape_pattern(&as_text(value))))
        }
        Operator::EndsWith => {
            aql::str_literal(&format!("%{}", aql::escape_pattern(&as_text(value))))
        }
        _ => aql::literal(value),
    }
}

fn literal_is_string(op: Operator, value: &Value) -> bool {
    match op {
        // Pattern operators always emit a string literal.
        Operator::Contains | Operator::Like | Operator::StartsWith | Operator::EndsWith => true,
        _ => value.is_string(),
    }
}
