// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module - source resolution, decoding, and pixel preparation.

pub mod encoder;
pub mod processor;

pub use encoder::ImageEncoder;
pub use processor::ImageProcessor;
