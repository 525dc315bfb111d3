// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Meta-Query Compiler collaborator
//!
//! Turns a set of `{key, value, compare}` clauses into boolean filter
//! fragments over the per-key namespaced `meta.<key>.*` fields. The core
//! compiler depends only on the [`MetaQueryCompiler`] trait; the default
//! implementation here covers the standard comparison operators and the
//! allow/deny key policy.
//!
//! # Namespaced meta fields
//!
//! Each meta key is indexed as an object with typed sub-fields:
//!
//! ```text
//! meta.<key>.value   -- analyzed text (searched, not filtered)
//! meta.<key>.raw     -- non-analyzed copy (exact match, sort)
//! meta.<key>.long    -- numeric projection (comparisons, numeric sort)
//! ```

use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::MetaPolicy;

use super::builder::{BoolBuilder, BoolNode, QueryNode, RangeBound, TermValue};

/// Comparison operator of a meta clause. Unrecognized operator literals
/// fall back to equality rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaCompare {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Exists,
    NotExists,
    In,
    NotIn,
}

impl MetaCompare {
    /// Parse the request literal (`"="`, `">="`, `"NOT EXISTS"`, ...),
    /// case-insensitively for the word forms.
    pub fn parse(literal: &str) -> Self {
        match literal.trim() {
            "=" | "" => MetaCompare::Equals,
            "!=" => MetaCompare::NotEquals,
            ">" => MetaCompare::GreaterThan,
            ">=" => MetaCompare::GreaterOrEqual,
            "<" => MetaCompare::LessThan,
            "<=" => MetaCompare::LessOrEqual,
            word => match word.to_ascii_uppercase().as_str() {
                "EXISTS" => MetaCompare::Exists,
                "NOT EXISTS" => MetaCompare::NotExists,
                "IN" => MetaCompare::In,
                "NOT IN" => MetaCompare::NotIn,
                _ => MetaCompare::Equals,
            },
        }
    }
}

impl<'de> Deserialize<'de> for MetaCompare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Ok(MetaCompare::parse(&literal))
    }
}

/// One metadata predicate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetaClause {
    pub key: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub compare: MetaCompare,
}

/// How a multi-clause meta query combines its clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaRelation {
    #[default]
    And,
    Or,
}

impl<'de> Deserialize<'de> for MetaRelation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        match literal.trim().to_ascii_uppercase().as_str() {
            "OR" => Ok(MetaRelation::Or),
            _ => Ok(MetaRelation::And),
        }
    }
}

/// A structured meta sub-request: clauses plus their combining relation.
///
/// Accepts either a bare JSON array of clauses or an object carrying a
/// `relation` key alongside clause objects, mirroring the loose shapes
/// callers send.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaQuery {
    pub relation: MetaRelation,
    pub clauses: Vec<MetaClause>,
}

impl<'de> Deserialize<'de> for MetaQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Array(items) => Ok(MetaQuery {
                relation: MetaRelation::And,
                clauses: clauses_from_items(items),
            }),
            Value::Object(map) => {
                let relation = map
                    .get("relation")
                    .and_then(Value::as_str)
                    .map(|r| {
                        if r.trim().eq_ignore_ascii_case("or") {
                            MetaRelation::Or
                        } else {
                            MetaRelation::And
                        }
                    })
                    .unwrap_or_default();
                let items = map
                    .into_iter()
                    .filter(|(k, _)| k != "relation")
                    .map(|(_, v)| v)
                    .collect();
                Ok(MetaQuery {
                    relation,
                    clauses: clauses_from_items(items),
                })
            }
            // Scalars carry no clauses; treat as "no meta query" rather
            // than rejecting the whole request
            _ => Ok(MetaQuery::default()),
        }
    }
}

/// Clause objects survive, anything malformed is dropped
fn clauses_from_items(items: Vec<Value>) -> Vec<MetaClause> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<MetaClause>(item).ok())
        .filter(|clause| !clause.key.trim().is_empty())
        .collect()
}

/// Collaborator interface consumed by the core compiler.
///
/// Implementations must be synchronous, side-effect-free, and
/// deterministic; the compiler treats an empty result as "dimension not
/// applied", never as a failure.
pub trait MetaQueryCompiler: Send + Sync {
    fn compile(&self, query: &MetaQuery) -> Option<QueryNode>;
}

/// Default meta-query collaborator: standard comparison operators over
/// the namespaced meta fields, gated by the configured key policy.
#[derive(Debug, Default)]
pub struct DefaultMetaQueryCompiler {
    policy: MetaPolicy,
}

impl DefaultMetaQueryCompiler {
    pub fn new(policy: MetaPolicy) -> Self {
        Self { policy }
    }

    fn compile_clause(&self, clause: &MetaClause) -> Option<QueryNode> {
        let key = clause.key.trim();
        match clause.compare {
            MetaCompare::Exists => Some(QueryNode::exists(format!("meta.{key}"))),
            MetaCompare::NotExists => Some(negate(QueryNode::exists(format!("meta.{key}")))),
            MetaCompare::Equals => match &clause.value {
                // Bare key with no value is a presence test
                None | Some(Value::Null) => Some(QueryNode::exists(format!("meta.{key}"))),
                Some(value) => Some(equality_clause(key, value)),
            },
            MetaCompare::NotEquals => {
                let value = clause.value.as_ref().filter(|v| !v.is_null())?;
                Some(negate(equality_clause(key, value)))
            }
            MetaCompare::GreaterThan => range_clause(key, clause.value.as_ref()?, false, true),
            MetaCompare::GreaterOrEqual => range_clause(key, clause.value.as_ref()?, true, true),
            MetaCompare::LessThan => range_clause(key, clause.value.as_ref()?, false, false),
            MetaCompare::LessOrEqual => range_clause(key, clause.value.as_ref()?, true, false),
            MetaCompare::In => {
                let values = list_values(clause.value.as_ref()?);
                QueryNode::term_or_terms(&format!("meta.{key}.raw"), values)
            }
            MetaCompare::NotIn => {
                let values = list_values(clause.value.as_ref()?);
                QueryNode::term_or_terms(&format!("meta.{key}.raw"), values).map(negate)
            }
        }
    }
}

impl MetaQueryCompiler for DefaultMetaQueryCompiler {
    fn compile(&self, query: &MetaQuery) -> Option<QueryNode> {
        let mut nodes = Vec::new();
        for clause in &query.clauses {
            if !self.policy.permits(clause.key.trim()) {
                debug!(key = %clause.key, "meta_key_denied_by_policy");
                continue;
            }
            if let Some(node) = self.compile_clause(clause) {
                nodes.push(node);
            }
        }
        if nodes.is_empty() {
            return None;
        }
        let mut builder = BoolBuilder::new();
        for node in nodes {
            builder = match query.relation {
                MetaRelation::And => builder.must(node),
                MetaRelation::Or => builder.should(node),
            };
        }
        builder.build()
    }
}

/// Numbers compare against the numeric projection, everything else
/// against the raw copy.
fn equality_clause(key: &str, value: &Value) -> QueryNode {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(n) => QueryNode::term(format!("meta.{key}.long"), n),
            None => QueryNode::term(format!("meta.{key}.raw"), n.to_string()),
        },
        Value::Bool(b) => QueryNode::term(format!("meta.{key}.long"), *b as i64),
        other => QueryNode::term(format!("meta.{key}.raw"), scalar_to_string(other)),
    }
}

fn range_clause(key: &str, value: &Value, inclusive: bool, lower: bool) -> Option<QueryNode> {
    // Numeric-looking bounds target the numeric projection; date or
    // string bounds compare lexicographically on the raw copy.
    let (field, bound_value) = match numeric_value(value) {
        Some(n) => (format!("meta.{key}.long"), Value::from(n)),
        None => (
            format!("meta.{key}.raw"),
            Value::String(scalar_to_string(value)),
        ),
    };
    let bound = RangeBound {
        value: bound_value,
        inclusive,
    };
    Some(if lower {
        QueryNode::Range {
            field,
            lower: Some(bound),
            upper: None,
        }
    } else {
        QueryNode::Range {
            field,
            lower: None,
            upper: Some(bound),
        }
    })
}

fn negate(node: QueryNode) -> QueryNode {
    QueryNode::Bool(BoolNode {
        must: Vec::new(),
        should: Vec::new(),
        must_not: vec![node],
    })
}

fn numeric_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn list_values(value: &Value) -> Vec<TermValue> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(TermValue::Str(s.clone())),
                Value::Number(n) => Some(TermValue::Str(n.to_string())),
                Value::Bool(b) => Some(TermValue::Str(b.to_string())),
                _ => None,
            })
            .collect(),
        scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            vec![TermValue::Str(scalar_to_string(scalar))]
        }
        _ => Vec::new(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiler() -> DefaultMetaQueryCompiler {
        DefaultMetaQueryCompiler::default()
    }

    fn single(key: &str, value: Value, compare: MetaCompare) -> MetaQuery {
        MetaQuery {
            relation: MetaRelation::And,
            clauses: vec![MetaClause {
                key: key.to_string(),
                value: Some(value),
                compare,
            }],
        }
    }

    #[test]
    fn test_string_equality_targets_raw() {
        let node = compiler()
            .compile(&single("mood", json!("happy"), MetaCompare::Equals))
            .unwrap();
        match node {
            QueryNode::Bool(b) => {
                assert_eq!(b.must[0], QueryNode::term("meta.mood.raw", "happy"));
            }
            _ => panic!("Expected Bool node"),
        }
    }

    #[test]
    fn test_numeric_equality_targets_long() {
        let node = compiler()
            .compile(&single("rating", json!(5), MetaCompare::Equals))
            .unwrap();
        match node {
            QueryNode::Bool(b) => {
                assert_eq!(b.must[0], QueryNode::term("meta.rating.long", 5));
            }
            _ => panic!("Expected Bool node"),
        }
    }

    #[test]
    fn test_exists_and_not_exists() {
        let node = compiler()
            .compile(&single("rating", Value::Null, MetaCompare::Exists))
            .unwrap();
        match node {
            QueryNode::Bool(b) => assert_eq!(b.must[0], QueryNode::exists("meta.rating")),
            _ => panic!("Expected Bool node"),
        }

        let node = compiler()
            .compile(&single("rating", Value::Null, MetaCompare::NotExists))
            .unwrap();
        match node {
            QueryNode::Bool(outer) => match &outer.must[0] {
                QueryNode::Bool(inner) => {
                    assert_eq!(inner.must_not[0], QueryNode::exists("meta.rating"));
                }
                _ => panic!("Expected nested Bool"),
            },
            _ => panic!("Expected Bool node"),
        }
    }

    #[test]
    fn test_range_comparison() {
        let node = compiler()
            .compile(&single("rating", json!(3), MetaCompare::GreaterOrEqual))
            .unwrap();
        match node {
            QueryNode::Bool(b) => match &b.must[0] {
                QueryNode::Range {
                    field,
                    lower: Some(bound),
                    upper: None,
                } => {
                    assert_eq!(field, "meta.rating.long");
                    assert_eq!(bound.value, json!(3));
                    assert!(bound.inclusive);
                }
                other => panic!("Expected Range node, got {other:?}"),
            },
            _ => panic!("Expected Bool node"),
        }
    }

    #[test]
    fn test_or_relation_uses_should() {
        let query = MetaQuery {
            relation: MetaRelation::Or,
            clauses: vec![
                MetaClause {
                    key: "mood".to_string(),
                    value: Some(json!("happy")),
                    compare: MetaCompare::Equals,
                },
                MetaClause {
                    key: "mood".to_string(),
                    value: Some(json!("calm")),
                    compare: MetaCompare::Equals,
                },
            ],
        };
        match compiler().compile(&query).unwrap() {
            QueryNode::Bool(b) => {
                assert!(b.must.is_empty());
                assert_eq!(b.should.len(), 2);
            }
            _ => panic!("Expected Bool node"),
        }
    }

    #[test]
    fn test_policy_denies_key() {
        let denying = DefaultMetaQueryCompiler::new(MetaPolicy {
            allowed_keys: None,
            excluded_keys: vec!["secret".to_string()],
        });
        assert!(denying
            .compile(&single("secret", json!("x"), MetaCompare::Equals))
            .is_none());
    }

    #[test]
    fn test_empty_query_is_none() {
        assert!(compiler().compile(&MetaQuery::default()).is_none());
    }

    #[test]
    fn test_deserialize_bare_array() {
        let query: MetaQuery =
            serde_json::from_value(json!([{"key": "rating", "value": 5, "compare": ">="}]))
                .unwrap();
        assert_eq!(query.relation, MetaRelation::And);
        assert_eq!(query.clauses.len(), 1);
        assert_eq!(query.clauses[0].compare, MetaCompare::GreaterOrEqual);
    }

    #[test]
    fn test_deserialize_object_with_relation() {
        let query: MetaQuery = serde_json::from_value(json!({
            "relation": "OR",
            "0": {"key": "mood", "value": "happy"},
            "1": {"key": "mood", "value": "calm"},
        }))
        .unwrap();
        assert_eq!(query.relation, MetaRelation::Or);
        assert_eq!(query.clauses.len(), 2);
    }

    #[test]
    fn test_malformed_clauses_dropped() {
        let query: MetaQuery = serde_json::from_value(json!([
            {"key": "rating", "value": 5},
            {"value": "no key here"},
            "not even an object",
        ]))
        .unwrap();
        assert_eq!(query.clauses.len(), 1);
    }

    #[test]
    fn test_compare_literal_parsing() {
        assert_eq!(MetaCompare::parse("="), MetaCompare::Equals);
        assert_eq!(MetaCompare::parse("not exists"), MetaCompare::NotExists);
        assert_eq!(MetaCompare::parse("IN"), MetaCompare::In);
        // Unrecognized literals degrade to equality
        assert_eq!(MetaCompare::parse("REGEXP"), MetaCompare::Equals);
    }
}
