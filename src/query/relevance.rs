//! Relevance-Query Builder
//!
//! Builds the free-text scoring query as a disjunction of three weighted
//! tiers, in this fixed order:
//!
//! 1. exact phrase match across all fields (boost 4)
//! 2. all-terms-required match, zero fuzziness (boost 2)
//! 3. fuzzy match with default edit-distance tolerance (engine-default
//!    weight)
//!
//! Exact phrases rank highest, strict-term matches next, typo-tolerant
//! matches last. The ordering and default weights are a contract, not an
//! accident of construction; the per-tier weights come from
//! [`RelevanceConfig`](crate::config::RelevanceConfig).

use crate::config::CompilerConfig;
use crate::request::FilterRequest;

use super::builder::{BoolBuilder, MatchOperator, MatchType, MultiMatch, QueryNode};

/// Builds the scoring query for a free-text search term
pub struct RelevanceQueryBuilder<'a> {
    config: &'a CompilerConfig,
}

impl<'a> RelevanceQueryBuilder<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Build the three-tier cascade for `term` over the request's
    /// resolved search fields.
    pub fn build(&self, term: &str, request: &FilterRequest) -> QueryNode {
        let fields = self.resolve_fields(request);
        let relevance = &self.config.relevance;

        BoolBuilder::new()
            .should(QueryNode::MultiMatch(MultiMatch {
                query: term.to_string(),
                fields: fields.clone(),
                match_type: Some(MatchType::Phrase),
                operator: None,
                fuzziness: None,
                boost: Some(relevance.phrase_boost),
            }))
            .should(QueryNode::MultiMatch(MultiMatch {
                query: term.to_string(),
                fields: fields.clone(),
                match_type: None,
                operator: Some(MatchOperator::And),
                fuzziness: Some(relevance.terms_fuzziness),
                boost: Some(relevance.terms_boost),
            }))
            .should(QueryNode::MultiMatch(MultiMatch {
                query: term.to_string(),
                fields,
                match_type: None,
                operator: None,
                fuzziness: Some(relevance.fuzziness),
                boost: relevance.fuzzy_boost,
            }))
            .build()
            .expect("cascade always has three branches")
    }

    /// Resolve the searched field set.
    ///
    /// No `search_fields` in the request means the configured default
    /// set. An explicit spec keeps its plain fields and rewrites its
    /// `meta` key list to the per-key value sub-field. An explicit spec
    /// that resolves to nothing falls back to the defaults rather than
    /// emitting a fieldless clause.
    pub fn resolve_fields(&self, request: &FilterRequest) -> Vec<String> {
        let spec = match &request.search_fields {
            None => return self.config.search_fields.clone(),
            Some(spec) => spec,
        };

        let mut fields: Vec<String> = spec
            .fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        fields.extend(
            spec.meta
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(|k| format!("meta.{k}.value")),
        );

        if fields.is_empty() {
            self.config.search_fields.clone()
        } else {
            fields
        }
    }
}
