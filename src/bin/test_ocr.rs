//! Quick OCR check against the tesseract adapter
//! Run with: cargo run --release --bin test_ocr -- <image_path>

use anyhow::{Context, Result};
use assistive_gateway::core::CanonicalImage;
use assistive_gateway::services::{OcrBackend, TesseractOcr};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("assistive_gateway::services::vision=debug")
        .with_target(false)
        .init();

    // Get image path from args
    let args: Vec<String> = std::env::args().collect();
    let sample_path = if args.len() > 1 {
        args[1].clone()
    } else {
        "test_sample.png".to_string()
    };

    if !Path::new(&sample_path).exists() {
        eprintln!("Image not found: {}", sample_path);
        std::process::exit(1);
    }

    info!("Loading image: {}", sample_path);
    let image = image::open(&sample_path)
        .with_context(|| format!("Failed to open {}", sample_path))?
        .to_rgb8();
    info!("Image dimensions: {}x{}", image.width(), image.height());

    let command = std::env::var("TESSERACT_CMD").unwrap_or_else(|_| "tesseract".to_string());
    let ocr = TesseractOcr::new(command);
    info!("Running OCR with: {}", ocr.command());

    let text = ocr.extract_text(&CanonicalImage::new(image)).await?;

    println!("\n=== Results ===");
    println!("Text:");
    if text.trim().is_empty() {
        println!("  (empty)");
    } else {
        for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            println!("  {}. {}", i + 1, line);
        }
    }

    Ok(())
}
