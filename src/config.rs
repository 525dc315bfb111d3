//! Configuration for the query compiler.
//!
//! # Example
//!
//! ```
//! use comment_query::CompilerConfig;
//!
//! // Minimal config (uses defaults)
//! let config = CompilerConfig::default();
//! assert_eq!(config.max_result_window, 10_000);
//!
//! // Full config
//! let config = CompilerConfig {
//!     max_result_window: 500,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the query compiler.
///
/// All fields have sensible defaults; the zero-config compiler produces
/// documents a stock comment index accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Result-set size used when the request carries no explicit `number`.
    ///
    /// This is the operational ceiling: the backend rejects windows above
    /// its own `max_result_window` setting, so requests without explicit
    /// pagination are pinned to it rather than left unbounded.
    #[serde(default = "default_max_result_window")]
    pub max_result_window: u64,

    /// Textual fields searched when the request carries no
    /// `search_fields` of its own.
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,

    /// Weights and tolerances of the relevance cascade
    #[serde(default)]
    pub relevance: RelevanceConfig,

    /// Metadata key policy, owned by the meta-query collaborator
    #[serde(default)]
    pub meta: MetaPolicy,
}

/// Weights and fuzziness of the three-tier relevance cascade.
///
/// The tier ordering (phrase, then all-terms, then fuzzy) is fixed; only
/// the weights are tunable.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    /// Weight of the exact-phrase tier
    #[serde(default = "default_phrase_boost")]
    pub phrase_boost: f32,

    /// Weight of the all-terms-required tier
    #[serde(default = "default_terms_boost")]
    pub terms_boost: f32,

    /// Edit-distance tolerance of the all-terms tier
    #[serde(default)]
    pub terms_fuzziness: u32,

    /// Weight of the fuzzy tier; unset leaves the engine default (1.0)
    #[serde(default)]
    pub fuzzy_boost: Option<f32>,

    /// Edit-distance tolerance of the fuzzy tier
    #[serde(default = "default_fuzziness")]
    pub fuzziness: u32,
}

/// Allow/deny policy for metadata keys, applied by the default
/// meta-query collaborator before compiling clauses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaPolicy {
    /// When set, only these keys may be filtered or searched on
    #[serde(default)]
    pub allowed_keys: Option<Vec<String>>,

    /// Keys that may never be filtered or searched on
    #[serde(default)]
    pub excluded_keys: Vec<String>,
}

impl MetaPolicy {
    /// Whether clauses against `key` may be compiled
    pub fn permits(&self, key: &str) -> bool {
        if self.excluded_keys.iter().any(|k| k == key) {
            return false;
        }
        match &self.allowed_keys {
            Some(allowed) => allowed.iter().any(|k| k == key),
            None => true,
        }
    }
}

fn default_max_result_window() -> u64 {
    10_000
}

fn default_search_fields() -> Vec<String> {
    [
        "comment_content",
        "comment_author",
        "comment_author_email",
        "comment_author_url",
        "comment_author_IP",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_phrase_boost() -> f32 {
    4.0
}

fn default_terms_boost() -> f32 {
    2.0
}

fn default_fuzziness() -> u32 {
    1
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_result_window: default_max_result_window(),
            search_fields: default_search_fields(),
            relevance: RelevanceConfig::default(),
            meta: MetaPolicy::default(),
        }
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            phrase_boost: default_phrase_boost(),
            terms_boost: default_terms_boost(),
            terms_fuzziness: 0,
            fuzzy_boost: None,
            fuzziness: default_fuzziness(),
        }
    }
}
