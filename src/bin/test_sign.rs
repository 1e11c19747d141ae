//! Classify hand landmarks from a JSON file
//! Run with: cargo run --release --bin test_sign -- <landmarks.json>
//!
//! The file uses the hand tracking response shape: {"hands": [[{"x": .., "y": ..}, ...]]}

use anyhow::{Context, Result};
use assistive_gateway::services::classify;
use assistive_gateway::services::vision::parse_hands;
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("assistive_gateway=debug")
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let sample_path = if args.len() > 1 {
        args[1].clone()
    } else {
        "landmarks.json".to_string()
    };

    if !Path::new(&sample_path).exists() {
        eprintln!("Landmark file not found: {}", sample_path);
        std::process::exit(1);
    }

    let body = std::fs::read_to_string(&sample_path)
        .with_context(|| format!("Failed to read {}", sample_path))?;
    let hands = parse_hands(&body)?;
    info!("Loaded {} hand(s) from {}", hands.len(), sample_path);

    println!("\n=== Results ===");
    if hands.is_empty() {
        println!("  (no hands)");
    }
    for (i, hand) in hands.iter().enumerate() {
        match classify(hand) {
            Ok(label) => println!("  hand {}: {} ({} points)", i + 1, label.as_str(), hand.len()),
            Err(e) => println!("  hand {}: malformed: {}", i + 1, e),
        }
    }

    Ok(())
}
