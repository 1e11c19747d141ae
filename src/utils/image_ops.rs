use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Asynchronously decode image bytes to RGB using spawn_blocking.
///
/// Image decoding is CPU-intensive, especially for large camera frames.
pub async fn load_rgb_from_memory_async(bytes: Vec<u8>) -> Result<RgbImage> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgb8())
            .context("Failed to load image from memory")
    })
    .await
    .context("Failed to spawn blocking task for image loading")?
}

/// Asynchronously encode an RGB image to PNG bytes using spawn_blocking.
///
/// Backends receive PNG regardless of the format the client sent.
pub async fn encode_png_async(img: RgbImage) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_png_sync(&img))
        .await
        .context("Failed to spawn blocking task for PNG encoding")?
}

/// Synchronous PNG encoding for small images and tools
pub fn encode_png_sync(img: &RgbImage) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut png_bytes);
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .context("Failed to encode image as PNG")?;
    Ok(png_bytes)
}
