//! Sort-Key Resolver
//!
//! Maps a logical sort alias from the request onto the concrete sortable
//! index field. Free-text-analyzed fields cannot be sorted directly, so
//! the table targets their non-analyzed `.raw` sibling; reproducing that
//! suffix substitution exactly is required for the emitted document to
//! round-trip against a real index.
//!
//! Resolution is pure and total: a known alias yields its mapped field,
//! the two `meta_value*` aliases yield a clause only when the request
//! names a meta key, and anything else is sorted on as a literal field
//! name rather than rejected.

use serde::Serialize;

use crate::request::FilterRequest;

/// Alias used when the request carries no `orderby` of its own
pub const DEFAULT_SORT_ALIAS: &str = "comment_date_gmt";

/// Sort direction, normalized to exactly `asc` or `desc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Normalize the request's `order` parameter: a case-insensitive
    /// `asc` sorts ascending, anything else (including absent or empty)
    /// sorts descending.
    pub fn from_param(order: Option<&str>) -> Self {
        match order {
            Some(o) if o.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One entry of the ordered sort sequence; the first entry has the
/// highest priority, ties are broken by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
}

/// Closed alias table. Analyzed text fields map to their `.raw` sibling;
/// numeric and date fields sort on themselves.
const SORT_FIELDS: &[(&str, &str)] = &[
    ("comment_agent", "comment_agent.raw"),
    ("comment_approved", "comment_approved"),
    ("comment_author", "comment_author.raw"),
    ("comment_author_email", "comment_author_email.raw"),
    ("comment_author_IP", "comment_author_IP.raw"),
    ("comment_author_url", "comment_author_url.raw"),
    ("comment_content", "comment_content.raw"),
    ("comment_date", "comment_date"),
    ("comment_date_gmt", "comment_date_gmt"),
    ("comment_ID", "comment_ID"),
    ("comment_karma", "comment_karma"),
    ("comment_parent", "comment_parent"),
    ("comment_post_ID", "comment_post_ID"),
    ("comment_type", "comment_type.raw"),
    ("user_id", "user_id"),
];

/// Resolve a sort alias to its concrete sort clauses.
///
/// The `meta_value` / `meta_value_num` aliases need the request's
/// `meta_key` to know which namespaced meta field to target; without it
/// they resolve to an empty sequence (no clause emitted), which is
/// distinct from an unknown alias falling through to the literal branch.
pub fn resolve(alias: &str, direction: SortDirection, request: &FilterRequest) -> Vec<SortClause> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Vec::new();
    }

    let field = match alias {
        "meta_value" => match named_meta_key(request) {
            Some(key) => format!("meta.{key}.raw"),
            None => return Vec::new(),
        },
        "meta_value_num" => match named_meta_key(request) {
            Some(key) => format!("meta.{key}.long"),
            None => return Vec::new(),
        },
        known => SORT_FIELDS
            .iter()
            .find(|(a, _)| *a == known)
            .map(|(_, f)| f.to_string())
            // Unrecognized aliases are sorted on as-is
            .unwrap_or_else(|| known.to_string()),
    };

    vec![SortClause { field, direction }]
}

fn named_meta_key(request: &FilterRequest) -> Option<&str> {
    request
        .meta_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FilterRequest {
        FilterRequest::default()
    }

    #[test]
    fn test_direction_normalization() {
        assert_eq!(SortDirection::from_param(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(Some("ASC")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(Some(" Asc ")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(Some("bogus")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(Some("")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(None), SortDirection::Desc);
    }

    #[test]
    fn test_analyzed_fields_sort_on_raw_sibling() {
        let clauses = resolve("comment_author", SortDirection::Asc, &request());
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "comment_author.raw");
        assert_eq!(clauses[0].direction, SortDirection::Asc);
    }

    #[test]
    fn test_numeric_fields_sort_on_themselves() {
        let clauses = resolve("comment_karma", SortDirection::Desc, &request());
        assert_eq!(clauses[0].field, "comment_karma");
        let clauses = resolve("comment_date_gmt", SortDirection::Desc, &request());
        assert_eq!(clauses[0].field, "comment_date_gmt");
    }

    #[test]
    fn test_meta_value_requires_meta_key() {
        // No meta_key in the request: no clause, not a literal fallback
        assert!(resolve("meta_value", SortDirection::Asc, &request()).is_empty());
        assert!(resolve("meta_value_num", SortDirection::Asc, &request()).is_empty());

        let req = FilterRequest {
            meta_key: Some("rating".to_string()),
            ..Default::default()
        };
        let clauses = resolve("meta_value", SortDirection::Asc, &req);
        assert_eq!(clauses[0].field, "meta.rating.raw");
        let clauses = resolve("meta_value_num", SortDirection::Desc, &req);
        assert_eq!(clauses[0].field, "meta.rating.long");
    }

    #[test]
    fn test_unknown_alias_is_literal_passthrough() {
        let clauses = resolve("my_custom_field", SortDirection::Asc, &request());
        assert_eq!(clauses[0].field, "my_custom_field");
    }

    #[test]
    fn test_empty_alias_yields_nothing() {
        assert!(resolve("  ", SortDirection::Asc, &request()).is_empty());
    }
}
