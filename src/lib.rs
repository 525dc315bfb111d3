//! # comment-query
//!
//! A query translation engine: converts a structured, high-level
//! filter/sort request for comment records into an Elasticsearch
//! bool/filter/sort query document that a remote search index can
//! execute.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FilterRequest                          │
//! │  • ~30 named, optional parameters (identity, ownership,    │
//! │    hierarchy, status, temporal, free-text, metadata)        │
//! │  • permissive JSON deserialization, never rejects input     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      QueryCompiler                          │
//! │  • pagination + sort resolution                             │
//! │  • declarative dimension table → boolean filter tree        │
//! │  • moderation-status encoding, unapproved override          │
//! │  • meta/date collaborators behind trait seams               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                CompiledQuery → EsTranslator                 │
//! │  • {from, size, sort, query, post_filter?, _source?}        │
//! │  • exact DSL field names, raw-variant suffixes preserved    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use comment_query::{CompilerConfig, FilterRequest, QueryCompiler};
//!
//! let compiler = QueryCompiler::new(CompilerConfig::default());
//!
//! let request = FilterRequest {
//!     status: vec!["approve".into()],
//!     post_id: Some(42),
//!     search: Some("rust".into()),
//!     number: Some(20),
//!     ..Default::default()
//! };
//!
//! let compiled = compiler.compile(&request);
//! let document = compiled.to_document();
//!
//! assert_eq!(document["size"], 20);
//! assert!(document.get("post_filter").is_some());
//! ```
//!
//! ## Guarantees
//!
//! - **Never fails**: absent, empty, or malformed optional parameters
//!   degrade to "dimension not requested"; numeric coercion is
//!   best-effort.
//! - **Stateless**: every compilation allocates its output fresh; one
//!   compiler serves concurrent callers with no coordination.
//! - **Shape-exact output**: `post_filter` is omitted (not emitted
//!   empty) when no dimension activates; one-element lists collapse to
//!   `term`; analyzed fields filter and sort on their `.raw` sibling.
//!
//! ## Modules
//!
//! - [`query`]: the compiler, the AST, the translator, and the
//!   sort/relevance/meta/date components
//! - [`request`]: the [`FilterRequest`] input model
//! - [`config`]: compiler configuration knobs
//! - [`metrics`]: instrumentation facade (exporter chosen by the host)

pub mod config;
pub mod metrics;
pub mod query;
pub mod request;

pub use config::{CompilerConfig, MetaPolicy, RelevanceConfig};
pub use query::{
    BoolBuilder, CompiledQuery, DateFilter, DateQuery, DateRangeFilterCompiler,
    DefaultDateRangeCompiler, DefaultMetaQueryCompiler, EsTranslator, MetaClause, MetaCompare,
    MetaQuery, MetaQueryCompiler, MetaRelation, QueryCompiler, QueryNode, RelevanceQueryBuilder,
    SortClause, SortDirection, TermValue,
};
pub use request::{FilterRequest, RequestError, SearchFields};
