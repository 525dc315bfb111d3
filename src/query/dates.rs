//! Date-Range Filter Compiler collaborator
//!
//! Converts a temporal sub-query into a comparable filter fragment. The
//! output carries the fragment under an `and` key (with room for an `or`
//! variant); the core compiler consumes only the `and` fragment and
//! discards anything else by design.

use serde::Deserialize;

use super::builder::{BoolBuilder, QueryNode, RangeBound};
use crate::request::de_opt_string;

/// Default column a temporal sub-query constrains
pub const DEFAULT_DATE_COLUMN: &str = "comment_date";

/// A temporal sub-query: open or closed range over one date column.
///
/// Bound values are passed through verbatim; the index parses date math
/// and timestamp formats itself.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DateQuery {
    /// Lower bound ("after this moment")
    #[serde(deserialize_with = "de_opt_string")]
    pub after: Option<String>,
    /// Upper bound ("before this moment")
    #[serde(deserialize_with = "de_opt_string")]
    pub before: Option<String>,
    /// Date column to constrain; defaults to the local-time column
    #[serde(deserialize_with = "de_opt_string")]
    pub column: Option<String>,
    /// Whether the bounds themselves are included
    #[serde(deserialize_with = "de_truthy")]
    pub inclusive: bool,
}

/// Truthiness in the loose caller sense: `true`, non-zero numbers, and
/// non-empty non-"false" strings
fn de_truthy<'de, D: serde::de::Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
        }
        _ => false,
    })
}

impl DateQuery {
    pub fn is_empty(&self) -> bool {
        bound(&self.after).is_none() && bound(&self.before).is_none()
    }
}

/// Collaborator output: filter fragments keyed by combination mode.
/// Only `and` is consumed by the core compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateFilter {
    pub and: Option<QueryNode>,
    pub or: Option<QueryNode>,
}

/// Collaborator interface consumed by the core compiler. Same contract
/// as the meta collaborator: synchronous, side-effect-free,
/// deterministic.
pub trait DateRangeFilterCompiler: Send + Sync {
    fn compile(&self, query: &DateQuery) -> DateFilter;
}

/// Default date-range collaborator: compiles the bounds into one range
/// clause wrapped in an `and` fragment.
#[derive(Debug, Default)]
pub struct DefaultDateRangeCompiler;

impl DateRangeFilterCompiler for DefaultDateRangeCompiler {
    fn compile(&self, query: &DateQuery) -> DateFilter {
        let lower = bound(&query.after).map(|value| RangeBound {
            value: value.into(),
            inclusive: query.inclusive,
        });
        let upper = bound(&query.before).map(|value| RangeBound {
            value: value.into(),
            inclusive: query.inclusive,
        });
        if lower.is_none() && upper.is_none() {
            return DateFilter::default();
        }

        let column = query
            .column
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_DATE_COLUMN)
            .to_string();
        let range = QueryNode::Range {
            field: column,
            lower,
            upper,
        };
        DateFilter {
            and: BoolBuilder::new().must(range).build(),
            or: None,
        }
    }
}

fn bound(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
