// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor - decoding, quality re-encoding, and pixel preparation for
// PDF embedding. Operates on in-memory images using the `image` crate.

use blattwerk_core::RasterFormat;
use blattwerk_core::error::BlattwerkError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let (pixels, w, h) = ImageProcessor::from_bytes(&bytes)?
///     .with_quality(75)?
///     .into_rgb8_pixels();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, BlattwerkError> {
        let img = image::load_from_memory(data).map_err(|err| {
            BlattwerkError::UnsupportedFormat(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    // -- Transformations ------------------------------------------------------

    /// Pass the image through a JPEG encode/decode cycle at `quality` (1-100).
    ///
    /// A quality of 100 or more leaves the pixels untouched.
    #[instrument(skip(self), fields(quality))]
    pub fn with_quality(self, quality: u8) -> Result<Self, BlattwerkError> {
        if quality >= 100 {
            return Ok(self);
        }
        let encoded = self.to_jpeg_bytes(quality.max(1))?;
        let image = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
            .map_err(|err| {
                BlattwerkError::UnsupportedFormat(format!("JPEG re-decode failed: {}", err))
            })?;
        debug!(encoded_len = encoded.len(), "Quality pass applied");
        Ok(Self { image })
    }

    // -- Output ---------------------------------------------------------------

    /// Flatten onto a white background and return packed RGB8 pixels with the
    /// image dimensions.
    ///
    /// Transparent areas become white rather than black, which is what a
    /// printed page shows through them.
    pub fn into_rgb8_pixels(self) -> (Vec<u8>, u32, u32) {
        let rgb = if self.image.color().has_alpha() {
            flatten_onto_white(&self.image)
        } else {
            self.image.to_rgb8()
        };
        let (width, height) = rgb.dimensions();
        (rgb.into_raw(), width, height)
    }

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, BlattwerkError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| {
                BlattwerkError::UnsupportedFormat(format!("PNG encoding failed: {}", err))
            })?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, BlattwerkError> {
        let mut buffer = Vec::new();
        let rgb = if self.image.color().has_alpha() {
            flatten_onto_white(&self.image)
        } else {
            self.image.to_rgb8()
        };
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder).map_err(|err| {
            BlattwerkError::UnsupportedFormat(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }
}

/// Sniff the raster encoding of `data` from its magic bytes.
pub fn detect_format(data: &[u8]) -> Option<RasterFormat> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some(RasterFormat::Jpeg),
        ImageFormat::Png => Some(RasterFormat::Png),
        ImageFormat::Gif => Some(RasterFormat::Gif),
        ImageFormat::WebP => Some(RasterFormat::WebP),
        ImageFormat::Bmp => Some(RasterFormat::Bmp),
        ImageFormat::Tiff => Some(RasterFormat::Tiff),
        _ => None,
    }
}

/// Alpha-composite an image over opaque white.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}
