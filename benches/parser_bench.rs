//! Field Parser and Record Validator benchmarks.
//!
//! Every inbox file passes through both layers exactly once, so these set
//! the floor on per-file latency.
//!
//! # Groups
//!
//! | Group | What it measures |
//! |-------|-----------------|
//! | `parse` | Parsing a short check-in, a long multi-line message, and junk |
//! | `validate` | Validation plus fingerprinting, with and without windows |
//!
//! # Viewing results
//!
//! ```sh
//! cargo bench --bench parser_bench
//! open target/criterion/report/index.html
//! ```

use chrono::{NaiveTime, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use welfare_board::parser::parse;
use welfare_board::validator::validate;
use welfare_board::{Ingest, TimeWindow, ValidationPolicy, WindowMode};

const SHORT: &str =
    "CALLSIGN: KK4ODA\nNAME: Dana Whitfield\nLOCATION: Shelter 3\nSTATUS: SAFE\nPOWER: GENERATOR\n";

fn long_message() -> String {
    let mut text = String::from(
        "CALLSIGN: W1ABC\nNAME: Sam Ortiz\nLOCATION: 14 Mill Rd\nSTATUS: NEED ASSISTANCE\nPOWER: OFF\nMESSAGE: Roof damage.\n",
    );
    for i in 0..40 {
        text.push_str(&format!("  line {i} of a long field report with details\n"));
    }
    text
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

fn parse_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    let long = long_message();
    let junk = "hello net control\n".repeat(50);
    for (name, text) in [("short", SHORT), ("long_message", long.as_str()), ("junk", junk.as_str())] {
        group.bench_with_input(BenchmarkId::new("text", name), text, |b, text| {
            b.iter(|| black_box(parse(black_box(text))))
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

fn validate_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    group.throughput(Throughput::Elements(1));

    let fields = parse(SHORT).expect("bench fixture parses");
    let at = Utc.with_ymd_and_hms(2024, 9, 27, 23, 30, 0).unwrap();
    let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

    let policies = [
        ("no_windows", ValidationPolicy::default()),
        (
            "annotate_windows",
            ValidationPolicy {
                windows: vec![
                    TimeWindow::new("Morning Net", hm(8, 0), hm(10, 0)),
                    TimeWindow::new("Evening Net", hm(19, 0), hm(21, 0)),
                ],
                window_mode: WindowMode::Annotate,
                hash_message: true,
            },
        ),
    ];

    for (name, policy) in &policies {
        group.bench_with_input(BenchmarkId::new("record", name), policy, |b, policy| {
            b.iter(|| {
                let ingest = Ingest {
                    received_at: at,
                    source_file: "kk4oda.txt".to_string(),
                };
                black_box(validate(&fields, ingest, policy))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, parse_bench, validate_bench);
criterion_main!(benches);
