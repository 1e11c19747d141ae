use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::core::errors::DecodeError;
use crate::core::types::CanonicalImage;
use crate::services::backends::ImageDecoder;
use crate::utils::load_rgb_from_memory_async;

/// Strip a `data:image/<subtype>;base64,` prefix if present. The prefix runs
/// to the last `;base64,` marker.
pub fn strip_data_url(payload: &str) -> &str {
    let payload = payload.trim();
    let Some(rest) = payload.strip_prefix("data:image/") else {
        return payload;
    };
    match rest.rfind(";base64,") {
        Some(idx) if idx > 0 => &rest[idx + ";base64,".len()..],
        _ => payload,
    }
}

/// Decodes base64 (optionally data-URL prefixed) images into RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64ImageDecoder;

impl Base64ImageDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageDecoder for Base64ImageDecoder {
    async fn decode(&self, payload: &str) -> Result<CanonicalImage, DecodeError> {
        // Line-wrapped payloads are accepted.
        let encoded: String = strip_data_url(payload)
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if encoded.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let bytes = STANDARD.decode(&encoded)?;
        if bytes.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let pixels = load_rgb_from_memory_async(bytes)
            .await
            .map_err(|e| DecodeError::InvalidImage(format!("{:#}", e)))?;
        debug!("Decoded image {}x{}", pixels.width(), pixels.height());

        Ok(CanonicalImage::new(pixels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encode_png_sync;
    use image::{Rgb, RgbImage};

    fn png_base64() -> String {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        STANDARD.encode(encode_png_sync(&img).unwrap())
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("data:image/jpeg;base64,QQ=="), "QQ==");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
        // Greedy up to the last marker.
        assert_eq!(
            strip_data_url("data:image/png;base64,x;base64,AAAA"),
            "AAAA"
        );
        // Subtype must be non-empty.
        assert_eq!(strip_data_url("data:image/;base64,AAAA"), "data:image/;base64,AAAA");
    }

    #[tokio::test]
    async fn test_decodes_prefixed_and_bare_payloads() {
        let decoder = Base64ImageDecoder::new();
        let bare = png_base64();
        let prefixed = format!("data:image/png;base64,{}", bare);

        let a = decoder.decode(&bare).await.unwrap();
        let b = decoder.decode(&prefixed).await.unwrap();

        assert_eq!((a.width(), a.height()), (3, 2));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let decoder = Base64ImageDecoder::new();
        assert_eq!(decoder.decode("").await, Err(DecodeError::EmptyPayload));
        assert_eq!(
            decoder.decode("data:image/png;base64,").await,
            Err(DecodeError::EmptyPayload)
        );
    }

    #[tokio::test]
    async fn test_invalid_base64_and_invalid_image() {
        let decoder = Base64ImageDecoder::new();

        assert!(matches!(
            decoder.decode("not base64!!").await,
            Err(DecodeError::InvalidBase64(_))
        ));

        let garbage = STANDARD.encode(b"definitely not an image");
        assert!(matches!(
            decoder.decode(&garbage).await,
            Err(DecodeError::InvalidImage(_))
        ));
    }

    #[tokio::test]
    async fn test_line_wrapped_payload_decodes() {
        let decoder = Base64ImageDecoder::new();
        let bare = png_base64();
        let wrapped: String = bare
            .as_bytes()
            .chunks(16)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\r\n");

        let a = decoder.decode(&bare).await.unwrap();
        let b = decoder
            .decode(&format!("data:image/png;base64,{}\n", wrapped))
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
