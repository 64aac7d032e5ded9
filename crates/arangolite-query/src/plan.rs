//! Clause assembly: criteria to an executable query plan.
//!
//! A [`QueryPlan`] is assembled-but-not-executed. `render_base()` gives the
//! iteration/filter/sort/pagination clauses (what mutations build on);
//! `render()` adds the aggregation and return clauses for reads.

use crate::criteria::{Aggregate, Criteria, SortDirection};
use crate::error::CompileError;
use crate::predicate;

/// Window bound emitted when the caller gave `skip` without `limit`.
const UNBOUNDED: i64 = i64::MAX;

/// Pagination window over the sorted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    offset: u64,
    /// `None` renders as the largest representable integer bound.
    count: Option<u64>,
}

/// An assembled query plan over one collection (or a merged join subquery).
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// The `FOR d IN ...` clause.
    source: String,
    filter: Option<String>,
    sort: Vec<(String, SortDirection)>,
    window: Option<Window>,
    group_by: Vec<String>,
    aggregates: Vec<Aggregate>,
}

impl QueryPlan {
    /// Assemble a plan iterating over `collection`.
    pub fn assemble(
        collection: &str,
        criteria: &Criteria,
        case_sensitive_default: bool,
    ) -> Result<Self, CompileError> {
        Self::build(
            format!("FOR d IN {collection}"),
            criteria,
            case_sensitive_default,
        )
    }

    /// Assemble a plan iterating over a merged join subquery, so filter,
    /// sort and pagination apply to the merged rows.
    pub fn over_subquery(
        subquery: &str,
        criteria: &Criteria,
        case_sensitive_default: bool,
    ) -> Result<Self, CompileError> {
        Self::build(
            format!("FOR d IN ({subquery})"),
            criteria,
            case_sensitive_default,
        )
    }

    fn build(
        source: String,
        criteria: &Criteria,
        case_sensitive_default: bool,
    ) -> Result<Self, CompileError> {
        let filter = match &criteria.where_ {
            Some(map) if !map.is_empty() => {
                let tree = predicate::parse(map)?;
                let expr = predicate::compile(&tree, case_sensitive_default);
                // A filter that constrains nothing (e.g. only a
                // `caseSensitive` marker, or an empty `or`) must not emit
                // an empty FILTER clause.
                (!expr.is_empty()).then_some(expr)
            }
            _ => None,
        };

        let window = match (criteria.skip, criteria.limit) {
            (skip, Some(limit)) => Some(Window {
                offset: skip.unwrap_or(0),
                count: Some(limit),
            }),
            (Some(skip), None) => Some(Window {
                offset: skip,
                count: None,
            }),
            (None, None) => None,
        };

        Ok(Self {
            source,
            filter,
            sort: criteria.sort.clone(),
            window,
            group_by: criteria.group_by.clone(),
            aggregates: criteria.aggregates.clone(),
        })
    }

    /// Render the iteration, filter, sort and pagination clauses.
    pub fn render_base(&self) -> String {
        let mut clauses = vec![self.source.clone()];

        if let Some(filter) = &self.filter {
            clauses.push(format!("FILTER ({filter})"));
        }

        // The primary key tiebreaker is appended unconditionally so result
        // order is deterministic even when the caller sorts (or doesn't).
        let mut sort_keys: Vec<String> = self
            .sort
            .iter()
            .map(|(field, dir)| format!("d.{field} {}", dir.as_aql()))
            .collect();
        sort_keys.push("d._key ASC".to_string());
        clauses.push(format!("SORT {}", sort_keys.join(", ")));

        if let Some(window) = self.window {
            let count = window
                .count
                .map(|c| c.to_string())
                .unwrap_or_else(|| UNBOUNDED.to_string());
            clauses.push(format!("LIMIT {}, {}", window.offset, count));
        }

        clauses.join(" ")
    }

    /// Render the full read query: base clauses plus aggregation and return.
    pub fn render(&self) -> String {
        format!("{} {}", self.render_base(), self.render_return())
    }

    /// Render the COLLECT/RETURN tail.
    ///
    /// Without aggregation directives each row returns the full document
    /// under `d`. `groupBy` fields group the accumulation; aggregation
    /// functions with no `groupBy` aggregate the whole result set as one
    /// implicit group.
    fn render_return(&self) -> String {
        if self.group_by.is_empty() && self.aggregates.is_empty() {
            return "RETURN {\"d\": d}".to_string();
        }

        let collect = if self.group_by.is_empty() {
            "COLLECT Group = \"all\" INTO g".to_string()
        } else {
            let keys = self
                .group_by
                .iter()
                .map(|f| format!("{f} = d.{f}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("COLLECT {keys} INTO g")
        };

        let mut fields: Vec<String> = self
            .group_by
            .iter()
            .map(|f| format!("\"{f}\": {f}"))
            .collect();
        for aggregate in &self.aggregates {
            for field in &aggregate.fields {
                fields.push(format!(
                    "\"{field}\": {}(g[*].d.{field})",
                    aggregate.func.to_uppercase()
                ));
            }
        }

        format!("{collect} RETURN {{\"d\": {{{}}}}}", fields.join(", "))
    }
}
