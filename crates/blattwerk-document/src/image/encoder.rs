// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image encoder - resolve an image reference (local path, remote URL, or
// in-memory buffer) into a raster payload ready for embedding.

use std::time::Duration;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ImageInput, ImageSource, RasterPayload};
use tracing::{debug, info, instrument};

use crate::image::processor::{ImageProcessor, detect_format};

/// Reads image sources and validates that they decode as rasters.
///
/// Stateless apart from the HTTP client; nothing is cached between calls.
pub struct ImageEncoder {
    client: reqwest::Client,
}

impl ImageEncoder {
    /// Create an encoder whose remote fetches give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BlattwerkError::InvalidInput(format!("HTTP client setup: {err}")))?;
        Ok(Self { client })
    }

    /// Create an encoder around an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Read and decode `source`.
    ///
    /// Fails with `SourceUnavailable` when the bytes cannot be obtained and
    /// with `UnsupportedFormat` when they are not a decodable image. The
    /// payload keeps the original encoded bytes and the decoded pixel size.
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn encode(&self, source: &ImageSource) -> Result<RasterPayload> {
        let bytes = match source {
            ImageSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|err| BlattwerkError::unavailable(path.display().to_string(), err))?,
            ImageSource::Url(url) => self.fetch(url).await?,
            ImageSource::Bytes(bytes) => bytes.clone(),
        };

        let payload = tokio::task::spawn_blocking(move || inspect_raster(bytes))
            .await
            .map_err(|err| {
                BlattwerkError::UnsupportedFormat(format!("decoder task failed: {err}"))
            })??;

        info!(
            format = ?payload.format,
            width = payload.source_width,
            height = payload.source_height,
            "Image encoded"
        );
        Ok(payload)
    }

    /// Encode a build input; caller-supplied dimensions win over decoded ones.
    pub async fn encode_input(&self, input: &ImageInput) -> Result<RasterPayload> {
        let mut payload = self.encode(&input.source).await?;
        if let (Some(width), Some(height)) = (input.width, input.height) {
            payload = payload.with_dimensions(width, height);
        }
        Ok(payload)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching remote image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| BlattwerkError::unavailable(url, err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| BlattwerkError::unavailable(url, err))?;
        Ok(body.to_vec())
    }
}

/// Decode `bytes` once to validate them and learn the pixel size.
fn inspect_raster(bytes: Vec<u8>) -> Result<RasterPayload> {
    let format = detect_format(&bytes);
    let processor = ImageProcessor::from_bytes(&bytes)?;
    let (width, height) = (processor.width(), processor.height());
    Ok(RasterPayload {
        bytes,
        format,
        source_width: Some(width),
        source_height: Some(height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::RasterFormat;
    use image::{DynamicImage, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 200])));
        ImageProcessor::from_dynamic(img).to_png_bytes().unwrap()
    }

    fn encoder() -> ImageEncoder {
        ImageEncoder::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn in_memory_png_reports_dimensions() {
        let payload = encoder()
            .encode(&ImageSource::Bytes(png(40, 25)))
            .await
            .unwrap();
        assert_eq!(payload.format, Some(RasterFormat::Png));
        assert_eq!(payload.source_width, Some(40));
        assert_eq!(payload.source_height, Some(25));
    }

    #[tokio::test]
    async fn file_source_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, png(12, 30)).unwrap();

        let payload = encoder().encode(&ImageSource::Path(path)).await.unwrap();
        assert_eq!(payload.aspect_ratio(), Some(12.0 / 30.0));
    }

    #[tokio::test]
    async fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.jpg");
        let result = encoder().encode(&ImageSource::Path(path)).await;
        assert!(matches!(
            result,
            Err(BlattwerkError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_is_unsupported_format() {
        let result = encoder()
            .encode(&ImageSource::Bytes(b"GIF89a but not really".to_vec()))
            .await;
        assert!(matches!(result, Err(BlattwerkError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn unreachable_url_is_source_unavailable() {
        let result = encoder()
            .encode(&ImageSource::Url("http://127.0.0.1:9/missing.png".into()))
            .await;
        assert!(matches!(
            result,
            Err(BlattwerkError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn caller_dimensions_override_decoded_ones() {
        let input = ImageInput::new(ImageSource::Bytes(png(10, 10))).with_dimensions(300, 100);
        let payload = encoder().encode_input(&input).await.unwrap();
        assert_eq!(payload.source_width, Some(300));
        assert_eq!(payload.source_height, Some(100));
    }
}
