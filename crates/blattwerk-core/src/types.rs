// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk document engine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{BlattwerkError, Result};

/// Supported page sizes.
///
/// Parsing from a name is lenient: anything unrecognised becomes [`PageSize::A4`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageSize {
    A4,
    Letter,
    A3,
}

impl PageSize {
    /// Canonical portrait dimensions in millimetres (width, height).
    pub fn portrait_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (216.0, 279.0),
            Self::A3 => (297.0, 420.0),
        }
    }

    /// Boundary name ("A4", "Letter", "A3").
    pub fn name(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "Letter",
            Self::A3 => "A3",
        }
    }

    /// Parse a page size name, case-insensitively.
    ///
    /// Unknown names fall back to A4 and log a warning.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "a4" => Self::A4,
            "letter" => Self::Letter,
            "a3" => Self::A3,
            other => {
                warn!(page_size = other, "unknown page size, falling back to A4");
                Self::A4
            }
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

impl From<String> for PageSize {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<PageSize> for String {
    fn from(size: PageSize) -> Self {
        size.name().to_owned()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }

    /// Only "landscape" (any case) selects landscape; everything else is portrait.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("landscape") {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Portrait
    }
}

impl From<String> for Orientation {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Orientation> for String {
    fn from(orientation: Orientation) -> Self {
        orientation.name().to_owned()
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings governing every page of one output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Re-encoding fidelity, 1..=100. 100 embeds the decoded pixels untouched.
    pub quality: u8,
    /// Flate-compress every stream of the finished document.
    pub compression: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            quality: 100,
            compression: true,
            watermark_text: None,
        }
    }
}

impl ConversionSettings {
    /// Validate and normalise the settings at the API boundary.
    ///
    /// Rejects a quality outside 1..=100 and turns a blank watermark into no
    /// watermark.
    pub fn validate(mut self) -> Result<Self> {
        if !(1..=100).contains(&self.quality) {
            return Err(BlattwerkError::InvalidInput(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self
            .watermark_text
            .as_deref()
            .is_some_and(|text| text.trim().is_empty())
        {
            self.watermark_text = None;
        }
        Ok(self)
    }
}

/// Raster encodings the engine can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl RasterFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Encoded image bytes plus whatever is known about their pixel size.
#[derive(Debug, Clone, Default)]
pub struct RasterPayload {
    pub bytes: Vec<u8>,
    pub format: Option<RasterFormat>,
    pub source_width: Option<u32>,
    pub source_height: Option<u32>,
}

impl RasterPayload {
    /// Payload with no known dimensions; placement falls back to the page aspect.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.source_width = Some(width);
        self.source_height = Some(height);
        self
    }

    /// Width / height, when both dimensions are known and non-zero.
    pub fn aspect_ratio(&self) -> Option<f32> {
        match (self.source_width, self.source_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(w as f32 / h as f32),
            _ => None,
        }
    }
}

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Url(String),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Interpret a URI-or-path string.
    pub fn parse(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(reference.to_owned())
        } else if let Some(path) = reference.strip_prefix("file://") {
            Self::Path(PathBuf::from(path))
        } else {
            Self::Path(PathBuf::from(reference))
        }
    }

    /// Short description for logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// One entry of a build request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub source: ImageSource,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageInput {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Text returned by the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    /// 0.0..=1.0
    pub confidence: f32,
    pub language: String,
}

impl OcrResult {
    pub fn empty(language: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            language: language.into(),
        }
    }
}

/// Unique identifier for a saved project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| BlattwerkError::InvalidInput(format!("not a project id: {value}")))
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved conversion project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Image references (paths or URLs) in page order.
    pub images: Vec<String>,
    pub settings: ConversionSettings,
    pub pdf_path: Option<String>,
    pub notes: Option<String>,
}

/// Fields supplied by the caller when saving a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub images: Vec<String>,
    pub settings: ConversionSettings,
    pub pdf_path: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of a project. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub images: Option<Vec<String>>,
    pub settings: Option<ConversionSettings>,
    pub pdf_path: Option<String>,
    pub notes: Option<String>,
}
