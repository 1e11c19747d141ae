use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::core::types::CanonicalImage;
use crate::services::backends::OcrBackend;
use crate::utils::encode_png_async;

pub const TESSERACT_NOT_FOUND: &str = "Tesseract OCR engine not found on the server.";

/// OCR through the tesseract command line, image on stdin and text on stdout
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run tesseract over already-encoded image bytes
    #[instrument(skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    pub async fn recognize_bytes(&self, image_bytes: &[u8]) -> Result<String> {
        let start = Instant::now();

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => anyhow!(TESSERACT_NOT_FOUND),
                _ => anyhow!(e).context(format!("Failed to start {}", self.command)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The process may exit before reading all input; its exit status decides.
            match stdin.write_all(image_bytes).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e).context("Failed to write image to tesseract"),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tesseract exited with {}: {}", output.status, stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "OCR produced {} chars in {:.0}ms",
            text.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(text)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrBackend for TesseractOcr {
    async fn extract_text(&self, image: &CanonicalImage) -> Result<String> {
        let png = encode_png_async(image.pixels.clone()).await?;
        self.recognize_bytes(&png).await
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
