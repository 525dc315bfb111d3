// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic comment-query usage example.
//!
//! Demonstrates:
//! 1. Building a compiler with default configuration
//! 2. Compiling a plain "latest approved comments" request
//! 3. Compiling a loaded request (search + filters + meta + dates)
//! 4. Parsing a request straight from JSON parameters
//! 5. Displaying metrics (OTEL-compatible)
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;

use comment_query::{CompilerConfig, FilterRequest, QueryCompiler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for OTEL export)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    // Simple logging (no filter for simplicity)
    tracing_subscriber::fmt().with_target(false).compact().init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           comment-query: Basic Usage Example                  ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Build the compiler
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Building compiler with default configuration...");
    let compiler = QueryCompiler::new(CompilerConfig::default());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Latest approved comments on a post
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Compiling: latest 10 approved comments on post 42");

    let request = FilterRequest {
        post_id: Some(42),
        status: vec!["approve".into()],
        number: Some(10),
        ..Default::default()
    };
    let compiled = compiler.compile(&request);
    println!("{}", serde_json::to_string_pretty(&compiled.to_document())?);

    // ─────────────────────────────────────────────────────────────────────────
    // 3. A loaded request: search, exclusions, metadata, dates
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Compiling: free-text search with filters and collaborators");

    let request = FilterRequest::from_value(json!({
        "search": "rust elasticsearch",
        "status": ["hold", "approve"],
        "include_unapproved": ["3", "a@example.com"],
        "author__not_in": [12],
        "meta_key": "rating",
        "meta_value": 5,
        "date_query": {"after": "2024-01-01 00:00:00", "inclusive": true},
        "orderby": "comment_author",
        "order": "asc",
        "number": 25,
        "page": 2,
    }))?;
    let compiled = compiler.compile(&request);
    println!("{}", serde_json::to_string_pretty(&compiled.to_document())?);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Straight from wire parameters
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🌐 Compiling straight from JSON parameters (note the lax types)");

    let request = FilterRequest::from_json(
        r#"{"number": "5", "user_id": "7", "fields": "ids", "type": "comment"}"#,
    )?;
    let compiled = compiler.compile(&request);
    println!("{}", serde_json::to_string_pretty(&compiled.to_document())?);

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Dump raw metrics (OTEL-compatible)
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics (OTEL export format):");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics in OTEL-compatible format
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_kind, key) = composite_key.into_parts();
        let name = key.name();
        let labels: Vec<_> = key
            .labels()
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        let label_str = if labels.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", labels.join(","))
        };

        match value {
            DebugValue::Counter(v) => counters.push((name.to_string(), label_str, v)),
            DebugValue::Gauge(_) => {}
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                let avg = if count > 0 { sum / count as f64 } else { 0.0 };
                histograms.push((name.to_string(), label_str, count, avg));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, avg) in &histograms {
            println!("   │  └─ {}{} count={} avg={:.6}", name, labels, count, avg);
        }
    }
    if counters.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
