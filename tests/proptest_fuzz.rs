//! Property-based tests (fuzzing) for the query compiler.
//!
//! Uses proptest to generate random/malformed inputs and verify the
//! compiler never panics and upholds its structural invariants.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use comment_query::{CompilerConfig, FilterRequest, QueryCompiler, SortDirection};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate arbitrary JSON values (including invalid structures)
fn arbitrary_json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        4,  // depth
        64, // max nodes
        10, // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..10).prop_map(Value::Array),
                prop::collection::hash_map(".*", inner, 0..10)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

/// Known parameter names, so fuzzed requests hit real dimensions
const PARAMETERS: &[&str] = &[
    "number",
    "offset",
    "page",
    "order",
    "orderby",
    "author_email",
    "author_url",
    "user_id",
    "author__in",
    "author__not_in",
    "comment__in",
    "comment__not_in",
    "karma",
    "parent",
    "parent__in",
    "parent__not_in",
    "hierarchical",
    "post_author",
    "post_author__in",
    "post_author__not_in",
    "post_id",
    "post__in",
    "post__not_in",
    "post_name",
    "post_parent",
    "post_status",
    "post_type",
    "status",
    "include_unapproved",
    "type",
    "type__in",
    "type__not_in",
    "search",
    "search_fields",
    "fields",
    "meta_key",
    "meta_value",
    "meta_query",
    "date_query",
];

/// Generate a request object whose keys are real parameter names but
/// whose values are arbitrary shapes
fn scrambled_request_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec((prop::sample::select(PARAMETERS), arbitrary_json_strategy()), 0..12)
        .prop_map(|entries| {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.to_string(), value);
            }
            Value::Object(map)
        })
}

// =============================================================================
// Deserialization Fuzz Tests
// =============================================================================

proptest! {
    /// Request deserialization should never panic on arbitrary bytes
    #[test]
    fn fuzz_request_from_random_bytes(bytes in prop::collection::vec(any::<u8>(), 0..10000)) {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            // Should never panic, only return Err
            let _ = FilterRequest::from_json(text);
        }
    }

    /// Request deserialization should handle arbitrary JSON gracefully
    #[test]
    fn fuzz_request_from_arbitrary_json(value in arbitrary_json_strategy()) {
        let _ = FilterRequest::from_value(value);
    }

    /// Real parameter names with scrambled value shapes must always
    /// deserialize: coercion is best-effort, never an error
    #[test]
    fn fuzz_scrambled_parameters_always_deserialize(request in scrambled_request_strategy()) {
        prop_assert!(FilterRequest::from_value(request).is_ok());
    }
}

// =============================================================================
// Compilation Invariant Tests
// =============================================================================

proptest! {
    /// Compilation never panics, whatever shape the request took
    #[test]
    fn prop_compile_never_panics(request in scrambled_request_strategy()) {
        let request = FilterRequest::from_value(request).expect("parameter names are known");
        let compiler = QueryCompiler::new(CompilerConfig::default());
        let _ = compiler.compile(&request).to_document();
    }

    /// The emitted document always carries from, size, and query;
    /// post_filter is either absent or a non-empty bool
    #[test]
    fn prop_document_structure(request in scrambled_request_strategy()) {
        let request = FilterRequest::from_value(request).expect("parameter names are known");
        let doc = QueryCompiler::new(CompilerConfig::default())
            .compile(&request)
            .to_document();

        prop_assert!(doc["from"].is_u64());
        prop_assert!(doc["size"].is_u64());
        prop_assert!(doc.get("query").is_some());

        if let Some(filter) = doc.get("post_filter") {
            let bool_node = filter["bool"].as_object().expect("bool post_filter");
            prop_assert!(!bool_node.is_empty(), "post_filter must never be empty");
        }
    }

    /// Explicit offset always wins; page derives only in its absence
    #[test]
    fn prop_offset_precedence(
        offset in prop::option::of(0u64..100_000),
        page in prop::option::of(0u64..1000),
        number in prop::option::of(0u64..1000),
    ) {
        let request = FilterRequest { offset, page, number, ..Default::default() };
        let compiled = QueryCompiler::new(CompilerConfig::default()).compile(&request);

        let size = match number {
            Some(n) if n > 0 => n,
            _ => 10_000,
        };
        let expected = match offset {
            Some(o) => o,
            None => match page {
                Some(p) if p > 1 => size * (p - 1),
                _ => 0,
            },
        };
        prop_assert_eq!(compiled.from, expected);
        prop_assert_eq!(compiled.size, size);
    }

    /// Direction normalizes to asc exactly for case-insensitive "asc"
    #[test]
    fn prop_direction_total(order in ".*") {
        let direction = SortDirection::from_param(Some(&order));
        if order.trim().eq_ignore_ascii_case("asc") {
            prop_assert_eq!(direction, SortDirection::Asc);
        } else {
            prop_assert_eq!(direction, SortDirection::Desc);
        }
    }

    /// Status lists collapse by surviving-element count, with hold and
    /// approve rewritten to their numeric encoding
    #[test]
    fn prop_status_collapse(statuses in prop::collection::vec("[a-z0-9]{0,8}", 0..6)) {
        let request = FilterRequest { status: statuses.clone(), ..Default::default() };
        let doc = QueryCompiler::new(CompilerConfig::default())
            .compile(&request)
            .to_document();

        let survivors: Vec<&str> = statuses
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if survivors.is_empty() || survivors.contains(&"all") {
            prop_assert!(doc.get("post_filter").is_none());
        } else {
            let clause = &doc["post_filter"]["bool"]["must"][0];
            let expected: Vec<Value> = survivors
                .iter()
                .map(|s| match *s {
                    "hold" => json!(0),
                    "approve" => json!(1),
                    other => json!(other),
                })
                .collect();
            if expected.len() == 1 {
                prop_assert_eq!(&clause["term"]["comment_approved"], &expected[0]);
            } else {
                prop_assert_eq!(
                    clause["terms"]["comment_approved"].as_array().expect("terms"),
                    &expected
                );
            }
        }
    }

    /// Compilation is deterministic: same request, same document
    #[test]
    fn prop_compile_deterministic(request in scrambled_request_strategy()) {
        let request = FilterRequest::from_value(request).expect("parameter names are known");
        let compiler = QueryCompiler::new(CompilerConfig::default());
        prop_assert_eq!(
            compiler.compile(&request).to_document(),
            compiler.compile(&request).to_document()
        );
    }
}

// =============================================================================
// Edge Case Tests
// =============================================================================

proptest! {
    /// Very long identifier lists compile without issue
    #[test]
    fn prop_large_id_lists(ids in prop::collection::vec(any::<i64>(), 0..500)) {
        let request = FilterRequest { comment_in: ids.clone(), ..Default::default() };
        let doc = QueryCompiler::new(CompilerConfig::default())
            .compile(&request)
            .to_document();
        if ids.is_empty() {
            prop_assert!(doc.get("post_filter").is_none());
        } else {
            let emitted = doc["post_filter"]["bool"]["must"][0]["terms"]["comment_ID"]
                .as_array()
                .expect("terms clause")
                .len();
            prop_assert_eq!(emitted, ids.len());
        }
    }

    /// Unapproved identifiers split exhaustively: every entry lands in
    /// exactly one branch
    #[test]
    fn prop_unapproved_partition(entries in prop::collection::vec("[a-z0-9@.]{1,12}", 1..8)) {
        let request = FilterRequest {
            status: vec!["approve".to_string()],
            include_unapproved: entries.clone(),
            ..Default::default()
        };
        let doc = QueryCompiler::new(CompilerConfig::default())
            .compile(&request)
            .to_document();

        let numeric = entries.iter().filter(|e| e.trim().parse::<i64>().is_ok()).count();
        let textual = entries.len() - numeric;

        let should = doc["post_filter"]["bool"]["should"].as_array().expect("should");
        let ids = should
            .iter()
            .find_map(|c| c["terms"]["user_id"].as_array())
            .map_or(0, |a| a.len());
        let emails = should
            .iter()
            .find_map(|c| c["terms"]["comment_author_email.raw"].as_array())
            .map_or(0, |a| a.len());
        prop_assert_eq!(ids, numeric);
        prop_assert_eq!(emails, textual);
    }
}
