// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document builder - lay out one raster image per page using `printpdf` 0.8,
// then finalise with `lopdf`: watermark overlay and the compression pass.
//
// printpdf builds pages as `Vec<Op>` lists; the saved bytes are re-parsed by
// lopdf for the document-wide post-processing steps.

use blattwerk_core::error::{BlattwerkError, Result, Stage};
use blattwerk_core::{ConversionSettings, RasterPayload};
use lopdf::Document;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{self, DEFAULT_MARGIN_MM, PageDimensions, Placement};
use crate::image::ImageProcessor;
use crate::pdf::watermark::{self, Watermark};

/// Embedding at 72 dpi makes one pixel one point before scaling.
const EMBED_DPI: f32 = 72.0;

/// Outcome of a build besides the bytes themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub page_count: usize,
    /// Zero-based indices of pages left empty because their image failed.
    pub degraded_pages: Vec<usize>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.degraded_pages.is_empty()
    }
}

/// Assembles a PDF with one page per image.
pub struct DocumentBuilder {
    settings: ConversionSettings,
    margin_mm: f32,
    title: String,
}

impl DocumentBuilder {
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            settings,
            margin_mm: DEFAULT_MARGIN_MM,
            title: "Blattwerk Document".into(),
        }
    }

    /// Override the print margin applied on every side.
    pub fn with_margin(mut self, margin_mm: f32) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    /// Set the title written to the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Page dimensions every page of the build shares.
    pub fn page(&self) -> PageDimensions {
        geometry::dimensions_for(self.settings.page_size, self.settings.orientation)
    }

    /// Where `payload` lands on the page.
    ///
    /// A missing source width or height is replaced by the page's, one side
    /// at a time, so an image without either is stretched to the page shape.
    pub fn placement_of(&self, payload: &RasterPayload) -> Placement {
        let page = self.page();
        let width = payload.source_width.map_or(page.width(), |w| w as f32);
        let height = payload.source_height.map_or(page.height(), |h| h as f32);
        let aspect = if width > 0.0 && height > 0.0 {
            width / height
        } else {
            page.aspect_ratio()
        };
        geometry::placement_for(&page, self.margin_mm, aspect)
    }

    /// Reject margins that leave no printable area on the page.
    fn check_margin(&self, page: &PageDimensions) -> Result<()> {
        let margin = self.margin_mm;
        let shortest = page.width().min(page.height());
        if !margin.is_finite() || margin < 0.0 || 2.0 * margin >= shortest {
            return Err(BlattwerkError::InvalidInput(format!(
                "margin {margin} mm leaves no printable area on a page {shortest} mm across"
            )));
        }
        Ok(())
    }

    /// Build the document and return its bytes.
    pub fn build(&self, images: &[RasterPayload]) -> Result<Vec<u8>> {
        self.build_with_report(images).map(|(bytes, _)| bytes)
    }

    /// Build the document, also reporting which pages came out empty.
    #[instrument(skip_all, fields(images = images.len(), page_size = %self.settings.page_size))]
    pub fn build_with_report(&self, images: &[RasterPayload]) -> Result<(Vec<u8>, BuildReport)> {
        if images.is_empty() {
            return Err(BlattwerkError::build(Stage::Layout, "no images to lay out"));
        }

        let page = self.page();
        self.check_margin(&page)?;
        info!(
            width_mm = page.width(),
            height_mm = page.height(),
            orientation = %self.settings.orientation,
            quality = self.settings.quality,
            "Building document"
        );

        let mut doc = PdfDocument::new(&self.title);
        let mut pages = Vec::with_capacity(images.len());
        let mut report = BuildReport::default();
        let mut last_failure = None;

        for (index, payload) in images.iter().enumerate() {
            let ops = match self.embed(&mut doc, payload, &page) {
                Ok(ops) => ops,
                Err(err) => {
                    warn!(
                        page = index + 1,
                        error = %err,
                        "Image could not be embedded, page left empty"
                    );
                    report.degraded_pages.push(index);
                    last_failure = Some(err);
                    Vec::new()
                }
            };
            pages.push(PdfPage::new(Mm(page.width()), Mm(page.height()), ops));
        }

        if report.degraded_pages.len() == images.len() {
            let cause = last_failure
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no image could be embedded".into());
            return Err(BlattwerkError::build(Stage::Embed, cause));
        }

        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let raw = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(raw_len = raw.len(), warnings = warnings.len(), "Pages serialised");

        let bytes = self.finalise(&raw, images.len())?;
        report.page_count = images.len();

        info!(
            bytes = bytes.len(),
            pages = report.page_count,
            degraded = report.degraded_pages.len(),
            "Document built"
        );
        Ok((bytes, report))
    }

    /// Decode `payload` and return the ops that draw it at its placement.
    fn embed(
        &self,
        doc: &mut PdfDocument,
        payload: &RasterPayload,
        page: &PageDimensions,
    ) -> Result<Vec<Op>> {
        let placement = self.placement_of(payload);

        let (pixels, width, height) = ImageProcessor::from_bytes(&payload.bytes)?
            .with_quality(self.settings.quality)?
            .into_rgb8_pixels();
        if width == 0 || height == 0 {
            return Err(BlattwerkError::UnsupportedFormat("image has no pixels".into()));
        }

        let xobject_id = doc.add_image(&RawImage {
            pixels: RawImageData::U8(pixels),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        });

        let target_w_pt = Mm(placement.width).into_pt().0;
        let target_h_pt = Mm(placement.height).into_pt().0;
        debug!(
            x_mm = placement.x,
            y_mm = placement.y,
            width_mm = placement.width,
            height_mm = placement.height,
            "Image placed"
        );

        Ok(vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Mm(placement.x).into_pt()),
                translate_y: Some(Mm(placement.bottom(page)).into_pt()),
                scale_x: Some(target_w_pt / width as f32),
                scale_y: Some(target_h_pt / height as f32),
                dpi: Some(EMBED_DPI),
                rotate: None,
            },
        }])
    }

    /// Watermark and compress the serialised pages.
    fn finalise(&self, raw: &[u8], expected_pages: usize) -> Result<Vec<u8>> {
        let mut document = Document::load_mem(raw)
            .map_err(|err| BlattwerkError::build(Stage::Serialize, format!("re-parse: {err}")))?;

        let pages = document.get_pages().len();
        if pages != expected_pages {
            return Err(BlattwerkError::build(
                Stage::Layout,
                format!("expected {expected_pages} pages, found {pages}"),
            ));
        }

        if let Some(text) = self.watermark_text() {
            let stamped = watermark::stamp_all_pages(&mut document, &Watermark::new(text))?;
            if stamped != expected_pages {
                return Err(BlattwerkError::build(
                    Stage::Watermark,
                    format!("stamped {stamped} of {expected_pages} pages"),
                ));
            }
        }

        if self.settings.compression {
            document.compress();
        } else {
            document.decompress();
        }

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|err| BlattwerkError::build(Stage::Serialize, err))?;
        Ok(bytes)
    }

    fn watermark_text(&self) -> Option<&str> {
        self.settings
            .watermark_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}
