// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry - page dimensions for a size/orientation pair, and image
// placement inside the printable area. Pure functions, all units millimetres.

use blattwerk_core::{Orientation, PageSize};

/// Margin applied on every side of the page.
pub const DEFAULT_MARGIN_MM: f32 = 5.0;

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Resolved page dimensions in millimetres.
///
/// Only [`dimensions_for`] produces these, and it applies orientation exactly
/// once. There is no way to rotate an existing value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    width: f32,
    height: f32,
}

impl PageDimensions {
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Width / height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    /// (width, height) in PDF points.
    pub fn to_points(&self) -> (f32, f32) {
        (self.width * POINTS_PER_MM, self.height * POINTS_PER_MM)
    }
}

/// An image rectangle on the page, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Distance from the bottom page edge to the bottom of the rectangle,
    /// i.e. the y coordinate in PDF's bottom-left origin.
    pub fn bottom(&self, page: &PageDimensions) -> f32 {
        page.height - self.y - self.height
    }
}

/// Page dimensions for a page size and orientation.
///
/// Landscape swaps the canonical portrait pair.
pub fn dimensions_for(page_size: PageSize, orientation: Orientation) -> PageDimensions {
    let (width, height) = page_size.portrait_mm();
    match orientation {
        Orientation::Portrait => PageDimensions { width, height },
        Orientation::Landscape => PageDimensions {
            width: height,
            height: width,
        },
    }
}

/// Place an image of the given aspect ratio (width / height) on the page.
///
/// The image fills the printable width first; if the resulting height does not
/// fit the printable height it is clamped there and the width recomputed from
/// the clamped height. The rectangle sits at the top-left margin corner.
///
/// A non-finite or non-positive aspect falls back to the page aspect.
pub fn placement_for(page: &PageDimensions, margin_mm: f32, image_aspect: f32) -> Placement {
    let aspect = if image_aspect.is_finite() && image_aspect > 0.0 {
        image_aspect
    } else {
        page.aspect_ratio()
    };

    let printable_width = page.width - 2.0 * margin_mm;
    let printable_height = page.height - 2.0 * margin_mm;

    let fitted_height = printable_width / aspect;
    let height = fitted_height.min(printable_height);
    let width = height * aspect;

    Placement {
        x: margin_mm,
        y: margin_mm,
        width,
        height,
    }
}
