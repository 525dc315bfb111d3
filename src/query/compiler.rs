// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Compiler
//!
//! The core engine: resolves a [`FilterRequest`] into one
//! [`CompiledQuery`]: pagination, sort order, the filter dimensions,
//! the relevance cascade, and the collaborator subtrees.
//!
//! Each filter dimension is one row of a declarative table
//! (`{parameter, clause shape, target field, polarity}`) processed by a
//! single generic routine; dimensions are independent and additive, so
//! every active one appends exactly one subtree to the accumulated
//! boolean tree. The handful of dimensions whose shape the table cannot
//! express (moderation status with its unapproved-identifier override,
//! metadata, temporal range) get dedicated steps after the table pass.
//!
//! Compilation never fails: malformed optional parameters degrade to
//! "dimension not requested" and numeric coercion is best-effort.

use std::time::Instant;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::CompilerConfig;
use crate::metrics;
use crate::request::FilterRequest;

use super::builder::{BoolBuilder, Polarity, QueryNode, TermValue};
use super::dates::{DateFilter, DateRangeFilterCompiler, DefaultDateRangeCompiler};
use super::es_translator::EsTranslator;
use super::meta::{DefaultMetaQueryCompiler, MetaClause, MetaCompare, MetaQueryCompiler};
use super::relevance::RelevanceQueryBuilder;
use super::sort::{self, SortClause, SortDirection, DEFAULT_SORT_ALIAS};

/// Primary identifier field, the sole projection under `fields=ids`
const ID_FIELD: &str = "comment_ID";

/// The compiled output: everything the search backend needs to execute
/// the request, minus the index name.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub from: u64,
    pub size: u64,
    /// Ordered sort sequence; empty means "relevance order"
    pub sort: Vec<SortClause>,
    /// Scoring query: the relevance cascade, or match-all
    pub query: QueryNode,
    /// Accumulated filter tree; `None` when no dimension activated
    pub post_filter: Option<QueryNode>,
    /// Result projection; `None` returns full documents
    pub source_includes: Option<Vec<String>>,
}

impl CompiledQuery {
    /// Render the Elasticsearch request-body document
    pub fn to_document(&self) -> Value {
        EsTranslator::translate_document(self)
    }
}

impl Serialize for CompiledQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// The query translation engine.
///
/// Stateless and reentrant: `compile` reads the request, allocates the
/// output fresh, and touches nothing shared, so one compiler instance
/// can serve concurrent callers.
pub struct QueryCompiler {
    config: CompilerConfig,
    meta: Box<dyn MetaQueryCompiler>,
    dates: Box<dyn DateRangeFilterCompiler>,
}

impl QueryCompiler {
    /// Compiler with the default collaborators
    pub fn new(config: CompilerConfig) -> Self {
        let meta = Box::new(DefaultMetaQueryCompiler::new(config.meta.clone()));
        Self {
            meta,
            dates: Box::new(DefaultDateRangeCompiler),
            config,
        }
    }

    /// Compiler with caller-supplied meta/date collaborators
    pub fn with_collaborators(
        config: CompilerConfig,
        meta: Box<dyn MetaQueryCompiler>,
        dates: Box<dyn DateRangeFilterCompiler>,
    ) -> Self {
        Self {
            config,
            meta,
            dates,
        }
    }

    /// Translate one filter/sort request into a query document
    pub fn compile(&self, request: &FilterRequest) -> CompiledQuery {
        let started = Instant::now();

        let (from, size) = self.paginate(request);
        let sort = self.resolve_sort(request);

        let mut filter = BoolBuilder::new();
        for dimension in DIMENSIONS {
            if let Some(node) = dimension.clause(request) {
                trace!(
                    dimension = dimension.param,
                    field = dimension.field,
                    "dimension_active"
                );
                metrics::record_dimension(dimension.param);
                filter = filter.push(dimension.polarity, Some(node));
            }
        }
        filter = self.apply_status(request, filter);
        filter = self.apply_meta(request, filter);
        filter = self.apply_dates(request, filter);

        let active = filter.len();
        let post_filter = filter.build();

        let query = match trimmed(&request.search) {
            Some(term) => RelevanceQueryBuilder::new(&self.config).build(term, request),
            None => QueryNode::match_all(1.0),
        };

        let source_includes = match trimmed(&request.fields) {
            Some("ids") => Some(vec![ID_FIELD.to_string()]),
            _ => None,
        };

        metrics::record_compile();
        metrics::record_active_dimensions(active);
        metrics::record_compile_latency(started.elapsed());
        debug!(from, size, clauses = active, "request_compiled");

        CompiledQuery {
            from,
            size,
            sort,
            query,
            post_filter,
            source_includes,
        }
    }

    /// `size` is the explicit non-zero `number`, else the configured
    /// result-window ceiling. An explicit `offset` always wins over the
    /// page-derived one, including an explicit zero.
    fn paginate(&self, request: &FilterRequest) -> (u64, u64) {
        let size = request
            .number
            .filter(|n| *n > 0)
            .unwrap_or(self.config.max_result_window);
        let from = match request.offset {
            Some(offset) => offset,
            None => match request.page {
                Some(page) if page > 1 => size.saturating_mul(page - 1),
                _ => 0,
            },
        };
        (from, size)
    }

    fn resolve_sort(&self, request: &FilterRequest) -> Vec<SortClause> {
        let direction = SortDirection::from_param(request.order.as_deref());
        let alias = trimmed(&request.orderby).unwrap_or(DEFAULT_SORT_ALIAS);
        sort::resolve(alias, direction, request)
    }

    /// Moderation status, with the unapproved-identifier override.
    ///
    /// `hold` and `approve` encode as the integers 0 and 1; other
    /// literals pass through as strings; an `all` literal disables the
    /// dimension. With `include_unapproved` present the status clause
    /// moves into a top-level `should` disjunction next to the
    /// identifier clauses.
    fn apply_status(&self, request: &FilterRequest, filter: BoolBuilder) -> BoolBuilder {
        let statuses: Vec<&str> = request
            .status
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if statuses.is_empty() || statuses.iter().any(|s| *s == "all") {
            return filter;
        }

        let values: Vec<TermValue> = statuses
            .iter()
            .map(|s| match *s {
                "hold" => TermValue::Int(0),
                "approve" => TermValue::Int(1),
                other => TermValue::Str(other.to_string()),
            })
            .collect();
        let clause =
            QueryNode::term_or_terms("comment_approved", values).expect("status list is non-empty");
        metrics::record_dimension("status");

        // Integer-parseable identifiers are owning-user ids, everything
        // else is an author email.
        let mut user_ids = Vec::new();
        let mut emails = Vec::new();
        for id in request
            .include_unapproved
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            match id.parse::<i64>() {
                Ok(n) => user_ids.push(TermValue::Int(n)),
                Err(_) => emails.push(TermValue::Str(id.to_string())),
            }
        }
        if user_ids.is_empty() && emails.is_empty() {
            return filter.must(clause);
        }

        metrics::record_dimension("include_unapproved");
        let mut filter = filter.should(clause);
        if !user_ids.is_empty() {
            filter = filter.should(QueryNode::Terms {
                field: "user_id".to_string(),
                values: user_ids,
            });
        }
        if !emails.is_empty() {
            filter = filter.should(QueryNode::Terms {
                field: "comment_author_email.raw".to_string(),
                values: emails,
            });
        }
        filter
    }

    /// Merge the `meta_key`/`meta_value` shorthand (shorthand first)
    /// with the structured meta query and hand both to the collaborator.
    fn apply_meta(&self, request: &FilterRequest, filter: BoolBuilder) -> BoolBuilder {
        let mut query = request.meta_query.clone().unwrap_or_default();
        if let Some(key) = trimmed(&request.meta_key) {
            let compare = match &request.meta_value {
                Some(value) if !value.is_null() => MetaCompare::Equals,
                // Bare key is a presence test
                _ => MetaCompare::Exists,
            };
            query.clauses.insert(
                0,
                MetaClause {
                    key: key.to_string(),
                    value: request.meta_value.clone(),
                    compare,
                },
            );
        }
        if query.clauses.is_empty() {
            return filter;
        }

        match self.meta.compile(&query) {
            Some(node) => {
                metrics::record_collaborator("meta", true);
                filter.must(node)
            }
            None => {
                metrics::record_collaborator("meta", false);
                filter
            }
        }
    }

    /// Only the `and` fragment of the collaborator output participates;
    /// fragments under any other key are discarded.
    fn apply_dates(&self, request: &FilterRequest, filter: BoolBuilder) -> BoolBuilder {
        let query = match &request.date_query {
            Some(query) if !query.is_empty() => query,
            _ => return filter,
        };
        let DateFilter { and, or: _ } = self.dates.compile(query);
        match and {
            Some(node) => {
                metrics::record_collaborator("date", true);
                filter.must(node)
            }
            None => {
                metrics::record_collaborator("date", false);
                filter
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dimension table
// ---------------------------------------------------------------------------

/// Clause shape of one table row
enum Extract {
    /// Single value, compiled to `term`
    Single(fn(&FilterRequest) -> Option<TermValue>),
    /// Id list, compiled to `terms`
    List(for<'a> fn(&'a FilterRequest) -> &'a [i64]),
    /// Literal list, trimmed, collapsed to `term`/`terms` by size
    Collapse(for<'a> fn(&'a FilterRequest) -> &'a [String]),
}

/// One independently toggleable filter dimension
struct Dimension {
    param: &'static str,
    field: &'static str,
    polarity: Polarity,
    extract: Extract,
}

impl Dimension {
    fn clause(&self, request: &FilterRequest) -> Option<QueryNode> {
        match self.extract {
            Extract::Single(get) => get(request).map(|value| QueryNode::Term {
                field: self.field.to_string(),
                value,
            }),
            Extract::List(get) => {
                let ids = get(request);
                if ids.is_empty() {
                    None
                } else {
                    Some(QueryNode::terms(self.field, ids.to_vec()))
                }
            }
            Extract::Collapse(get) => {
                let values: Vec<TermValue> = get(request)
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| TermValue::Str(s.to_string()))
                    .collect();
                QueryNode::term_or_terms(self.field, values)
            }
        }
    }
}

const DIMENSIONS: &[Dimension] = &[
    Dimension {
        param: "author_email",
        field: "comment_author_email.raw",
        polarity: Polarity::Include,
        extract: Extract::Single(x_author_email),
    },
    Dimension {
        param: "author_url",
        field: "comment_author_url.raw",
        polarity: Polarity::Include,
        extract: Extract::Single(x_author_url),
    },
    Dimension {
        param: "user_id",
        field: "user_id",
        polarity: Polarity::Include,
        extract: Extract::Single(x_user_id),
    },
    Dimension {
        param: "author__in",
        field: "user_id",
        polarity: Polarity::Include,
        extract: Extract::List(x_author_in),
    },
    Dimension {
        param: "author__not_in",
        field: "user_id",
        polarity: Polarity::Exclude,
        extract: Extract::List(x_author_not_in),
    },
    Dimension {
        param: "comment__in",
        field: "comment_ID",
        polarity: Polarity::Include,
        extract: Extract::List(x_comment_in),
    },
    Dimension {
        param: "comment__not_in",
        field: "comment_ID",
        polarity: Polarity::Exclude,
        extract: Extract::List(x_comment_not_in),
    },
    Dimension {
        param: "karma",
        field: "comment_karma",
        polarity: Polarity::Include,
        extract: Extract::Single(x_karma),
    },
    Dimension {
        param: "parent",
        field: "comment_parent",
        polarity: Polarity::Include,
        extract: Extract::Single(x_parent),
    },
    Dimension {
        param: "parent__in",
        field: "comment_parent",
        polarity: Polarity::Include,
        extract: Extract::List(x_parent_in),
    },
    Dimension {
        param: "parent__not_in",
        field: "comment_parent",
        polarity: Polarity::Exclude,
        extract: Extract::List(x_parent_not_in),
    },
    Dimension {
        param: "post_author",
        field: "comment_post_author_ID",
        polarity: Polarity::Include,
        extract: Extract::Single(x_post_author),
    },
    Dimension {
        param: "post_author__in",
        field: "comment_post_author_ID",
        polarity: Polarity::Include,
        extract: Extract::List(x_post_author_in),
    },
    Dimension {
        param: "post_author__not_in",
        field: "comment_post_author_ID",
        polarity: Polarity::Exclude,
        extract: Extract::List(x_post_author_not_in),
    },
    Dimension {
        param: "post_id",
        field: "comment_post_ID",
        polarity: Polarity::Include,
        extract: Extract::Single(x_post_id),
    },
    Dimension {
        param: "post__in",
        field: "comment_post_ID",
        polarity: Polarity::Include,
        extract: Extract::List(x_post_in),
    },
    Dimension {
        param: "post__not_in",
        field: "comment_post_ID",
        polarity: Polarity::Exclude,
        extract: Extract::List(x_post_not_in),
    },
    Dimension {
        param: "post_name",
        field: "comment_post_name.raw",
        polarity: Polarity::Include,
        extract: Extract::Single(x_post_name),
    },
    Dimension {
        param: "post_parent",
        field: "comment_post_parent",
        polarity: Polarity::Include,
        extract: Extract::Single(x_post_parent),
    },
    Dimension {
        param: "post_status",
        field: "comment_post_status",
        polarity: Polarity::Include,
        extract: Extract::Collapse(x_post_status),
    },
    Dimension {
        param: "post_type",
        field: "comment_post_type.raw",
        polarity: Polarity::Include,
        extract: Extract::Collapse(x_post_type),
    },
    Dimension {
        param: "type",
        field: "comment_type.raw",
        polarity: Polarity::Include,
        extract: Extract::Collapse(x_type),
    },
    Dimension {
        param: "type__in",
        field: "comment_type.raw",
        polarity: Polarity::Include,
        extract: Extract::Collapse(x_type_in),
    },
    Dimension {
        param: "type__not_in",
        field: "comment_type.raw",
        polarity: Polarity::Exclude,
        extract: Extract::Collapse(x_type_not_in),
    },
];

fn str_value(value: &Option<String>) -> Option<TermValue> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| TermValue::Str(s.to_string()))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn x_author_email(r: &FilterRequest) -> Option<TermValue> {
    str_value(&r.author_email)
}
fn x_author_url(r: &FilterRequest) -> Option<TermValue> {
    str_value(&r.author_url)
}
fn x_user_id(r: &FilterRequest) -> Option<TermValue> {
    r.user_id.map(TermValue::Int)
}
fn x_karma(r: &FilterRequest) -> Option<TermValue> {
    // An explicit zero is a real filter, not an absent parameter
    r.karma.map(TermValue::Int)
}

/// An explicit parent always wins; the hierarchy flag only pins the
/// parent to the root value when no parent dimension is present at all.
fn x_parent(r: &FilterRequest) -> Option<TermValue> {
    if let Some(parent) = r.parent {
        return Some(TermValue::Int(parent));
    }
    if r.wants_hierarchy() && r.parent_in.is_empty() && r.parent_not_in.is_empty() {
        return Some(TermValue::Int(0));
    }
    None
}

fn x_post_author(r: &FilterRequest) -> Option<TermValue> {
    r.post_author.map(TermValue::Int)
}
fn x_post_id(r: &FilterRequest) -> Option<TermValue> {
    r.post_id.map(TermValue::Int)
}
fn x_post_name(r: &FilterRequest) -> Option<TermValue> {
    str_value(&r.post_name)
}
fn x_post_parent(r: &FilterRequest) -> Option<TermValue> {
    r.post_parent.map(TermValue::Int)
}

fn x_author_in(r: &FilterRequest) -> &[i64] {
    &r.author_in
}
fn x_author_not_in(r: &FilterRequest) -> &[i64] {
    &r.author_not_in
}
fn x_comment_in(r: &FilterRequest) -> &[i64] {
    &r.comment_in
}
fn x_comment_not_in(r: &FilterRequest) -> &[i64] {
    &r.comment_not_in
}
fn x_parent_in(r: &FilterRequest) -> &[i64] {
    &r.parent_in
}
fn x_parent_not_in(r: &FilterRequest) -> &[i64] {
    &r.parent_not_in
}
fn x_post_author_in(r: &FilterRequest) -> &[i64] {
    &r.post_author_in
}
fn x_post_author_not_in(r: &FilterRequest) -> &[i64] {
    &r.post_author_not_in
}
fn x_post_in(r: &FilterRequest) -> &[i64] {
    &r.post_in
}
fn x_post_not_in(r: &FilterRequest) -> &[i64] {
    &r.post_not_in
}

fn x_post_status(r: &FilterRequest) -> &[String] {
    &r.post_status
}
fn x_post_type(r: &FilterRequest) -> &[String] {
    &r.post_type
}
fn x_type(r: &FilterRequest) -> &[String] {
    &r.comment_type
}
fn x_type_in(r: &FilterRequest) -> &[String] {
    &r.type_in
}
fn x_type_not_in(r: &FilterRequest) -> &[String] {
    &r.type_not_in
}
