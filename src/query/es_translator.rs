//! Elasticsearch Translator
//!
//! Translates the query AST to the Elasticsearch JSON query DSL. The
//! emitted field names and JSON layouts are part of the external
//! contract: a real index schema expects these exact shapes.
//!
//! # DSL Generated
//!
//! ```json
//! {"term": {"user_id": 7}}                          -- Exact match
//! {"terms": {"comment_ID": [3, 5]}}                 -- Set membership
//! {"range": {"comment_date": {"gte": "...", "lt": "..."}}}
//! {"exists": {"field": "meta.rating"}}              -- Field presence
//! {"multi_match": {"query": "...", "type": "phrase", ...}}
//! {"bool": {"must": [...], "should": [...], "must_not": [...]}}
//! ```

use serde_json::{json, Map, Value};

use super::builder::{BoolNode, MultiMatch, QueryNode, RangeBound, TermValue};
use super::compiler::CompiledQuery;
use super::sort::SortClause;

/// Query DSL translator
pub struct EsTranslator;

impl EsTranslator {
    /// Translate a single AST node into its DSL object
    pub fn translate(node: &QueryNode) -> Value {
        match node {
            QueryNode::Term { field, value } => {
                let mut body = Map::new();
                body.insert(field.clone(), Self::term_value(value));
                json!({ "term": body })
            }
            QueryNode::Terms { field, values } => {
                let values: Vec<Value> = values.iter().map(Self::term_value).collect();
                let mut body = Map::new();
                body.insert(field.clone(), Value::Array(values));
                json!({ "terms": body })
            }
            QueryNode::Range {
                field,
                lower,
                upper,
            } => {
                let mut bounds = Map::new();
                if let Some(RangeBound { value, inclusive }) = lower {
                    bounds.insert(
                        if *inclusive { "gte" } else { "gt" }.to_string(),
                        value.clone(),
                    );
                }
                if let Some(RangeBound { value, inclusive }) = upper {
                    bounds.insert(
                        if *inclusive { "lte" } else { "lt" }.to_string(),
                        value.clone(),
                    );
                }
                let mut body = Map::new();
                body.insert(field.clone(), Value::Object(bounds));
                json!({ "range": body })
            }
            QueryNode::Exists { field } => {
                json!({ "exists": { "field": field } })
            }
            QueryNode::MatchAll { boost } => match boost {
                Some(boost) => json!({ "match_all": { "boost": boost } }),
                None => json!({ "match_all": {} }),
            },
            QueryNode::MultiMatch(clause) => Self::translate_multi_match(clause),
            QueryNode::Bool(node) => Self::translate_bool(node),
        }
    }

    /// Translate a boolean node, omitting empty occurrence lists
    fn translate_bool(node: &BoolNode) -> Value {
        let mut body = Map::new();
        if !node.must.is_empty() {
            body.insert("must".to_string(), Self::translate_list(&node.must));
        }
        if !node.should.is_empty() {
            body.insert("should".to_string(), Self::translate_list(&node.should));
        }
        if !node.must_not.is_empty() {
            body.insert("must_not".to_string(), Self::translate_list(&node.must_not));
        }
        json!({ "bool": body })
    }

    fn translate_list(nodes: &[QueryNode]) -> Value {
        Value::Array(nodes.iter().map(Self::translate).collect())
    }

    fn translate_multi_match(clause: &MultiMatch) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), Value::String(clause.query.clone()));
        body.insert(
            "fields".to_string(),
            Value::Array(
                clause
                    .fields
                    .iter()
                    .map(|f| Value::String(f.clone()))
                    .collect(),
            ),
        );
        if let Some(match_type) = clause.match_type {
            body.insert("type".to_string(), json!(match_type.as_str()));
        }
        if let Some(operator) = clause.operator {
            body.insert("operator".to_string(), json!(operator.as_str()));
        }
        if let Some(fuzziness) = clause.fuzziness {
            body.insert("fuzziness".to_string(), json!(fuzziness));
        }
        if let Some(boost) = clause.boost {
            body.insert("boost".to_string(), json!(boost));
        }
        json!({ "multi_match": body })
    }

    fn term_value(value: &TermValue) -> Value {
        match value {
            TermValue::Int(n) => json!(n),
            TermValue::Str(s) => json!(s),
        }
    }

    /// Translate a sort clause: {"<field>": {"order": "<dir>"}}
    pub fn translate_sort(clause: &SortClause) -> Value {
        let mut body = Map::new();
        body.insert(
            clause.field.clone(),
            json!({ "order": clause.direction.as_str() }),
        );
        Value::Object(body)
    }

    /// Assemble a compiled query into the full request-body document.
    ///
    /// `post_filter`, `sort`, and `_source` are omitted entirely when
    /// inactive, never emitted as empty objects.
    pub fn translate_document(compiled: &CompiledQuery) -> Value {
        let mut body = Map::new();
        body.insert("from".to_string(), json!(compiled.from));
        body.insert("size".to_string(), json!(compiled.size));
        if !compiled.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(compiled.sort.iter().map(Self::translate_sort).collect()),
            );
        }
        body.insert("query".to_string(), Self::translate(&compiled.query));
        if let Some(filter) = &compiled.post_filter {
            body.insert("post_filter".to_string(), Self::translate(filter));
        }
        if let Some(includes) = &compiled.source_includes {
            body.insert(
                "_source".to_string(),
                json!({ "includes": includes.clone() }),
            );
        }
        Value::Object(body)
    }
}
