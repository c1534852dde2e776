//! Library-only usage demo, in the manner of the teacher's own
//! `examples/test_match.rs`: no CLI parsing, just direct calls into the
//! public API against files passed as plain positional args.
//!
//! Run with: `cargo run --example match_demo -- query.png ref1.png ref2.png`

use contour_locate::config::MatchConfig;
use contour_locate::raster::Raster;
use contour_locate::matcher;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: match_demo <query.png> <reference.png> [reference2.png ...]");
        std::process::exit(1);
    }

    let query = Raster::open(std::path::Path::new(&args[1]))
        .unwrap_or_else(|e| panic!("failed to open query {}: {e}", args[1]));

    let references: Vec<Raster> = args[2..]
        .iter()
        .map(|p| Raster::open(std::path::Path::new(p)).unwrap_or_else(|e| panic!("failed to open {p}: {e}")))
        .collect();

    println!("query: {}x{}", query.width(), query.height());
    for (path, r) in args[2..].iter().zip(&references) {
        println!("reference {path}: {}x{}", r.width(), r.height());
    }

    let config = MatchConfig::default();
    let result = matcher::match_query(&query, &references, &config).expect("match_query failed");

    println!("\nquery_featureless: {}", result.query_featureless);
    for entry in &result.per_reference {
        println!(
            "  [{}] {} -> score={:.2} transform={:?} featureless={} low_confidence={}",
            entry.index,
            args[2 + entry.index],
            entry.result.score,
            entry.result.transform,
            entry.result.reference_featureless,
            entry.result.low_confidence,
        );
    }

    match result.best_index {
        Some(i) => println!("\nbest match: {} (score {:.2})", args[2 + i], result.best_score),
        None => println!("\nno result"),
    }
}
