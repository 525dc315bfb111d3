// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder - AST for Elasticsearch filter/scoring queries
//!
//! Provides a type-safe way to build the boolean filter tree and scoring
//! clauses that the translator renders into the Elasticsearch query DSL.
//!
//! # Example
//!
//! ```rust
//! use comment_query::query::{BoolBuilder, QueryNode};
//!
//! // Single exact-match clause
//! let clause = QueryNode::term("user_id", 7);
//!
//! // Accumulate a filter tree
//! let filter = BoolBuilder::new()
//!     .must(QueryNode::term("comment_approved", 1))
//!     .must_not(QueryNode::terms("comment_ID", vec![3, 5]))
//!     .build();
//! assert!(filter.is_some());
//!
//! // An empty accumulator yields no node at all
//! assert!(BoolBuilder::new().build().is_none());
//! ```

use serde::Serialize;

/// A single term value: comment fields are either numeric identifiers or
/// raw strings, and the distinction survives into the emitted JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TermValue {
    /// Numeric value (ids, karma, encoded moderation status)
    Int(i64),
    /// String value (emails, urls, status literals, types)
    Str(String),
}

impl From<i64> for TermValue {
    fn from(v: i64) -> Self {
        TermValue::Int(v)
    }
}

impl From<&str> for TermValue {
    fn from(v: &str) -> Self {
        TermValue::Str(v.to_string())
    }
}

impl From<String> for TermValue {
    fn from(v: String) -> Self {
        TermValue::Str(v)
    }
}

/// One bound of a range clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeBound {
    /// Bound value (date string or number, passed through verbatim)
    pub value: serde_json::Value,
    /// Whether the bound itself is included (gte/lte vs gt/lt)
    pub inclusive: bool,
}

/// Full-text match flavor for a `multi_match` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    /// Exact phrase match across fields
    Phrase,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Phrase => "phrase",
        }
    }
}

/// Term combination operator for a `multi_match` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOperator {
    /// All terms must match
    And,
}

impl MatchOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::And => "and",
        }
    }
}

/// A weighted free-text clause over a set of fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMatch {
    /// The search term, verbatim
    pub query: String,
    /// Fields searched, in priority order
    pub fields: Vec<String>,
    /// Match flavor; `None` is the engine's best-fields default
    pub match_type: Option<MatchType>,
    /// Term combination; `None` is the engine's `or` default
    pub operator: Option<MatchOperator>,
    /// Edit-distance tolerance; `None` omits the key
    pub fuzziness: Option<u32>,
    /// Relevance weight; `None` omits the key (engine default 1.0)
    pub boost: Option<f32>,
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryNode {
    /// Exact match on one field: {"term": {field: value}}
    Term { field: String, value: TermValue },
    /// Set membership on one field: {"terms": {field: [values]}}
    Terms {
        field: String,
        values: Vec<TermValue>,
    },
    /// Bounded comparison: {"range": {field: {gte: .., lt: ..}}}
    Range {
        field: String,
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
    },
    /// Field presence: {"exists": {"field": field}}
    Exists { field: String },
    /// Neutral match-everything clause with an optional weight
    MatchAll { boost: Option<f32> },
    /// Weighted free-text clause
    MultiMatch(MultiMatch),
    /// Nested boolean combination
    Bool(BoolNode),
}

impl QueryNode {
    /// Exact-match clause on a single value
    pub fn term(field: impl Into<String>, value: impl Into<TermValue>) -> Self {
        QueryNode::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set-membership clause over a list of values
    pub fn terms<V: Into<TermValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        QueryNode::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Field-presence clause
    pub fn exists(field: impl Into<String>) -> Self {
        QueryNode::Exists {
            field: field.into(),
        }
    }

    /// Match-everything clause with an explicit weight
    pub fn match_all(boost: f32) -> Self {
        QueryNode::MatchAll { boost: Some(boost) }
    }

    /// Collapse a value list into the cheapest clause that holds it:
    /// one element becomes `term`, two or more become `terms`.
    ///
    /// Returns `None` for an empty list; the two shapes are semantically
    /// identical and the collapse must be reproduced exactly for
    /// output-shape compatibility.
    pub fn term_or_terms(field: &str, mut values: Vec<TermValue>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(QueryNode::Term {
                field: field.to_string(),
                value: values.pop().expect("len checked"),
            }),
            _ => Some(QueryNode::Terms {
                field: field.to_string(),
                values,
            }),
        }
    }
}

/// Boolean combination node.
///
/// `must` carries the conjunction of activated filter dimensions. The
/// `should` and `must_not` lists only appear on the top-level node, for
/// the special-case disjunctions (unapproved-identifier matching) and the
/// exclude variants of set-membership dimensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoolNode {
    pub must: Vec<QueryNode>,
    pub should: Vec<QueryNode>,
    pub must_not: Vec<QueryNode>,
}

impl BoolNode {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// Accumulator for the boolean filter tree.
///
/// Threaded through each dimension-handling step of the compiler; every
/// active dimension appends exactly one subtree. Building an untouched
/// accumulator yields `None` so the caller can distinguish "no filters"
/// from an empty filter object.
#[derive(Debug, Default)]
pub struct BoolBuilder {
    node: BoolNode,
}

impl BoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a clause to match (conjunction)
    pub fn must(mut self, node: QueryNode) -> Self {
        self.node.must.push(node);
        self
    }

    /// Require a clause not to match
    pub fn must_not(mut self, node: QueryNode) -> Self {
        self.node.must_not.push(node);
        self
    }

    /// Add an alternative to the top-level disjunction
    pub fn should(mut self, node: QueryNode) -> Self {
        self.node.should.push(node);
        self
    }

    /// Append under `must` or `must_not` when the clause exists
    pub fn push(self, polarity: Polarity, node: Option<QueryNode>) -> Self {
        match (polarity, node) {
            (Polarity::Include, Some(n)) => self.must(n),
            (Polarity::Exclude, Some(n)) => self.must_not(n),
            (_, None) => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// Number of clauses accumulated across all three lists
    pub fn len(&self) -> usize {
        self.node.must.len() + self.node.should.len() + self.node.must_not.len()
    }

    /// Build the boolean node, or `None` if nothing was accumulated
    pub fn build(self) -> Option<QueryNode> {
        if self.node.is_empty() {
            None
        } else {
            Some(QueryNode::Bool(self.node))
        }
    }
}

/// Whether a dimension narrows membership (`must`) or removes it
/// (`must_not`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}
