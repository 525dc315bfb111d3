// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Translation
//!
//! Compiles a filter/sort request into an Elasticsearch query document.
//!
//! # Architecture
//!
//! ```text
//! FilterRequest
//!     ↓
//! QueryCompiler ──→ dimension table ──→ BoolBuilder (AST accumulator)
//!     │                  │
//!     │                  ├─→ MetaQueryCompiler   (meta.<key>.* subtree)
//!     │                  └─→ DateRangeFilterCompiler (range subtree)
//!     │
//!     ├─→ SortResolver        (alias → sortable field)
//!     ├─→ RelevanceBuilder    (phrase → all-terms → fuzzy cascade)
//!     ↓
//! CompiledQuery ──→ EsTranslator ──→ JSON query DSL
//! ```
//!
//! The compiler is pure and synchronous: no I/O, no shared state, safe
//! to call concurrently with distinct requests. Collaborators plug in
//! behind the [`MetaQueryCompiler`] and [`DateRangeFilterCompiler`]
//! traits and must honor the same contract.

pub mod builder;
pub mod compiler;
pub mod dates;
pub mod es_translator;
pub mod meta;
pub mod relevance;
pub mod sort;

pub use builder::{BoolBuilder, BoolNode, MatchOperator, MatchType, MultiMatch, Polarity, QueryNode, RangeBound, TermValue};
pub use compiler::{CompiledQuery, QueryCompiler};
pub use dates::{DateFilter, DateQuery, DateRangeFilterCompiler, DefaultDateRangeCompiler};
pub use es_translator::EsTranslator;
pub use meta::{DefaultMetaQueryCompiler, MetaClause, MetaCompare, MetaQuery, MetaQueryCompiler, MetaRelation};
pub use relevance::RelevanceQueryBuilder;
pub use sort::{SortClause, SortDirection, DEFAULT_SORT_ALIAS};
