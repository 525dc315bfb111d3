//! Filter request model
//!
//! The single input of the compiler: a flat mapping of named, optionally
//! typed parameters. Every field is optional; an absent or empty value
//! means "dimension not requested". The request is immutable during
//! compilation and never mutated in place.
//!
//! Deserialization is deliberately forgiving, because callers send these
//! parameters in whatever shape their HTTP layer produced: numeric
//! parameters accept numbers, numeric strings, or garbage (best-effort
//! integer cast, never an error); list parameters accept a bare scalar
//! as a one-element list.

use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::query::dates::DateQuery;
use crate::query::meta::MetaQuery;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request is not a JSON object")]
    NotAnObject,
    #[error("malformed request JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The full filter/sort request.
///
/// Parameter names are part of the external contract and match the
/// caller-facing query-argument names exactly, double underscores
/// included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    // Pagination
    #[serde(deserialize_with = "de_opt_count")]
    pub number: Option<u64>,
    #[serde(deserialize_with = "de_opt_count")]
    pub offset: Option<u64>,
    #[serde(deserialize_with = "de_opt_count")]
    pub page: Option<u64>,

    // Sort
    #[serde(deserialize_with = "de_opt_string")]
    pub order: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub orderby: Option<String>,

    // Author identity
    #[serde(deserialize_with = "de_opt_string")]
    pub author_email: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub author_url: Option<String>,
    #[serde(deserialize_with = "de_opt_i64")]
    pub user_id: Option<i64>,
    #[serde(rename = "author__in", deserialize_with = "de_i64_list")]
    pub author_in: Vec<i64>,
    #[serde(rename = "author__not_in", deserialize_with = "de_i64_list")]
    pub author_not_in: Vec<i64>,

    // Record ids
    #[serde(rename = "comment__in", deserialize_with = "de_i64_list")]
    pub comment_in: Vec<i64>,
    #[serde(rename = "comment__not_in", deserialize_with = "de_i64_list")]
    pub comment_not_in: Vec<i64>,

    // Score
    #[serde(deserialize_with = "de_opt_i64")]
    pub karma: Option<i64>,

    // Hierarchy
    #[serde(deserialize_with = "de_opt_i64")]
    pub parent: Option<i64>,
    #[serde(rename = "parent__in", deserialize_with = "de_i64_list")]
    pub parent_in: Vec<i64>,
    #[serde(rename = "parent__not_in", deserialize_with = "de_i64_list")]
    pub parent_not_in: Vec<i64>,
    #[serde(deserialize_with = "de_flag")]
    pub hierarchical: Option<String>,

    // Parent post
    #[serde(deserialize_with = "de_opt_i64")]
    pub post_author: Option<i64>,
    #[serde(rename = "post_author__in", deserialize_with = "de_i64_list")]
    pub post_author_in: Vec<i64>,
    #[serde(rename = "post_author__not_in", deserialize_with = "de_i64_list")]
    pub post_author_not_in: Vec<i64>,
    #[serde(deserialize_with = "de_opt_i64")]
    pub post_id: Option<i64>,
    #[serde(rename = "post__in", deserialize_with = "de_i64_list")]
    pub post_in: Vec<i64>,
    #[serde(rename = "post__not_in", deserialize_with = "de_i64_list")]
    pub post_not_in: Vec<i64>,
    #[serde(deserialize_with = "de_opt_string")]
    pub post_name: Option<String>,
    #[serde(deserialize_with = "de_opt_i64")]
    pub post_parent: Option<i64>,
    #[serde(deserialize_with = "de_string_list")]
    pub post_status: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub post_type: Vec<String>,

    // Moderation status
    #[serde(deserialize_with = "de_string_list")]
    pub status: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub include_unapproved: Vec<String>,

    // Comment type
    #[serde(rename = "type", deserialize_with = "de_string_list")]
    pub comment_type: Vec<String>,
    #[serde(rename = "type__in", deserialize_with = "de_string_list")]
    pub type_in: Vec<String>,
    #[serde(rename = "type__not_in", deserialize_with = "de_string_list")]
    pub type_not_in: Vec<String>,

    // Free-text search
    #[serde(deserialize_with = "de_opt_string")]
    pub search: Option<String>,
    pub search_fields: Option<SearchFields>,

    // Projection
    #[serde(deserialize_with = "de_opt_string")]
    pub fields: Option<String>,

    // Metadata
    #[serde(deserialize_with = "de_opt_string")]
    pub meta_key: Option<String>,
    pub meta_value: Option<Value>,
    pub meta_query: Option<MetaQuery>,

    // Temporal range
    #[serde(deserialize_with = "de_opt_date_query")]
    pub date_query: Option<DateQuery>,
}

impl FilterRequest {
    /// Parse a request from JSON text
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse a request from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            Value::Null => Ok(FilterRequest::default()),
            _ => Err(RequestError::NotAnObject),
        }
    }

    /// Whether the hierarchy flag is set (any non-empty value)
    pub fn wants_hierarchy(&self) -> bool {
        self.hierarchical
            .as_deref()
            .map(str::trim)
            .is_some_and(|h| !h.is_empty())
    }
}

/// Searched-field specification: explicit field names plus an optional
/// `meta` sub-list of keys to be rewritten into namespaced field paths.
///
/// Accepts a bare string, a list of strings (where an embedded
/// `{"meta": [...]}` object carries the key list), or an object mixing
/// positional fields with a `meta` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFields {
    pub fields: Vec<String>,
    pub meta: Vec<String>,
}

impl<'de> Deserialize<'de> for SearchFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let mut spec = SearchFields::default();
        match value {
            Value::String(s) => spec.fields.push(s),
            Value::Array(items) => {
                for item in items {
                    spec.absorb(item);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    if key == "meta" {
                        spec.meta.extend(string_items(item));
                    } else {
                        spec.absorb(item);
                    }
                }
            }
            _ => {}
        }
        Ok(spec)
    }
}

impl SearchFields {
    fn absorb(&mut self, item: Value) {
        match item {
            Value::String(s) => self.fields.push(s),
            Value::Object(map) => {
                for (key, inner) in map {
                    if key == "meta" {
                        self.meta.extend(string_items(inner));
                    }
                }
            }
            _ => {}
        }
    }
}

fn string_items(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Permissive deserializers
// ---------------------------------------------------------------------------

/// Best-effort integer cast: numbers truncate, strings parse their
/// leading integer, booleans map to 0/1, everything else is 0.
pub(crate) fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => parse_leading_i64(s),
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}

fn parse_leading_i64(s: &str) -> i64 {
    let t = s.trim();
    let (sign, digits) = match t.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, t.strip_prefix('+').unwrap_or(t)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|v| sign * v).unwrap_or(0)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Optional integer; empty strings and null count as absent, which keeps
/// an explicit `0` distinguishable from "not given"
pub(crate) fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.filter(|v| !is_blank(v)).map(|v| coerce_i64(&v)))
}

/// Optional non-negative count (pagination parameters)
pub(crate) fn de_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .filter(|v| !is_blank(v))
        .map(|v| coerce_i64(&v).max(0) as u64))
}

/// Optional string; numbers are stringified, other shapes are absent
pub(crate) fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Integer list; a bare scalar is a one-element list
pub(crate) fn de_i64_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| matches!(v, Value::Number(_) | Value::String(_) | Value::Bool(_)))
            .map(coerce_i64)
            .collect(),
        Some(scalar) if is_blank(&scalar) => Vec::new(),
        Some(scalar) => vec![coerce_i64(&scalar)],
    })
}

/// String list; a bare scalar is a one-element list, numbers stringify
pub(crate) fn de_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Number(n)) => vec![n.to_string()],
        Some(_) => Vec::new(),
    })
}

/// Temporal sub-query; only an object shape carries one, anything else
/// means "dimension not requested"
pub(crate) fn de_opt_date_query<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateQuery>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    }))
}

/// Truthy flag kept as a string; boolean `false`, `0`, and null all mean
/// "flag not set"
pub(crate) fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(true) => Some("1".to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) if coerce_i64(&Value::Number(n.clone())) != 0 => Some(n.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_is_default() {
        let req = FilterRequest::from_json("{}").unwrap();
        assert_eq!(req, FilterRequest::default());
    }

    #[test]
    fn test_null_is_default() {
        let req = FilterRequest::from_value(Value::Null).unwrap();
        assert_eq!(req, FilterRequest::default());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            FilterRequest::from_value(json!([1, 2])),
            Err(RequestError::NotAnObject)
        ));
        assert!(FilterRequest::from_json("not json at all").is_err());
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let req = FilterRequest::from_value(json!({
            "number": "25",
            "offset": "5",
            "user_id": "42",
            "karma": "0",
        }))
        .unwrap();
        assert_eq!(req.number, Some(25));
        assert_eq!(req.offset, Some(5));
        assert_eq!(req.user_id, Some(42));
        // Explicit zero karma stays present
        assert_eq!(req.karma, Some(0));
    }

    #[test]
    fn test_garbage_numerics_cast_best_effort() {
        let req = FilterRequest::from_value(json!({
            "user_id": "12abc",
            "parent": "abc",
            "number": -3,
        }))
        .unwrap();
        assert_eq!(req.user_id, Some(12));
        assert_eq!(req.parent, Some(0));
        assert_eq!(req.number, Some(0));
    }

    #[test]
    fn test_empty_string_means_absent() {
        let req = FilterRequest::from_value(json!({
            "user_id": "",
            "karma": "  ",
            "author__in": "",
        }))
        .unwrap();
        assert_eq!(req.user_id, None);
        assert_eq!(req.karma, None);
        assert!(req.author_in.is_empty());
    }

    #[test]
    fn test_scalar_becomes_one_element_list() {
        let req = FilterRequest::from_value(json!({
            "author__in": 7,
            "status": "approve",
            "type__in": 42,
        }))
        .unwrap();
        assert_eq!(req.author_in, vec![7]);
        assert_eq!(req.status, vec!["approve"]);
        assert_eq!(req.type_in, vec!["42"]);
    }

    #[test]
    fn test_double_underscore_names() {
        let req = FilterRequest::from_value(json!({
            "comment__in": [1, "2"],
            "comment__not_in": [3],
            "post_author__not_in": ["4"],
        }))
        .unwrap();
        assert_eq!(req.comment_in, vec![1, 2]);
        assert_eq!(req.comment_not_in, vec![3]);
        assert_eq!(req.post_author_not_in, vec![4]);
    }

    #[test]
    fn test_type_keyword_field() {
        let req = FilterRequest::from_value(json!({"type": ["comment", "pingback"]})).unwrap();
        assert_eq!(req.comment_type, vec!["comment", "pingback"]);
    }

    #[test]
    fn test_hierarchical_truthiness() {
        let flag = |v: Value| {
            FilterRequest::from_value(json!({ "hierarchical": v }))
                .unwrap()
                .wants_hierarchy()
        };
        assert!(flag(json!("threaded")));
        assert!(flag(json!(true)));
        assert!(flag(json!(1)));
        assert!(!flag(json!(false)));
        assert!(!flag(json!(0)));
        assert!(!flag(json!("")));
        assert!(!flag(Value::Null));
    }

    #[test]
    fn test_search_fields_shapes() {
        let bare: SearchFields = serde_json::from_value(json!("comment_content")).unwrap();
        assert_eq!(bare.fields, vec!["comment_content"]);

        let list: SearchFields =
            serde_json::from_value(json!(["comment_content", {"meta": ["rating"]}])).unwrap();
        assert_eq!(list.fields, vec!["comment_content"]);
        assert_eq!(list.meta, vec!["rating"]);

        let object: SearchFields = serde_json::from_value(json!({
            "0": "comment_author",
            "meta": ["mood", "rating"],
        }))
        .unwrap();
        assert_eq!(object.fields, vec!["comment_author"]);
        assert_eq!(object.meta, vec!["mood", "rating"]);
    }

    #[test]
    fn test_unknown_parameters_ignored() {
        let req = FilterRequest::from_value(json!({
            "status": "approve",
            "cache_results": true,
            "no_found_rows": false,
        }))
        .unwrap();
        assert_eq!(req.status, vec!["approve"]);
    }

    #[test]
    fn test_leading_integer_parse() {
        assert_eq!(parse_leading_i64("42"), 42);
        assert_eq!(parse_leading_i64("  -7 "), -7);
        assert_eq!(parse_leading_i64("+3"), 3);
        assert_eq!(parse_leading_i64("12px"), 12);
        assert_eq!(parse_leading_i64("px12"), 0);
        assert_eq!(parse_leading_i64(""), 0);
        assert_eq!(parse_leading_i64("-"), 0);
    }
}
