// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests: build documents from generated images, then merge,
// extract, and inspect them.

use blattwerk_core::{BlattwerkError, ConversionSettings, Orientation, PageSize, RasterPayload};
use blattwerk_document::{DocumentBuilder, DocumentMerger, DocumentSummary, ImageProcessor};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::Content;
use lopdf::{Document, Object};

// -- Fixtures -----------------------------------------------------------------

fn payload(width: u32, height: u32) -> RasterPayload {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 160, 40]));
    let bytes = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
        .to_png_bytes()
        .unwrap();
    RasterPayload::from_bytes(bytes).with_dimensions(width, height)
}

fn settings(page_size: PageSize, orientation: Orientation) -> ConversionSettings {
    ConversionSettings {
        page_size,
        orientation,
        compression: false,
        ..ConversionSettings::default()
    }
}

fn build(settings: ConversionSettings, images: &[RasterPayload]) -> Vec<u8> {
    DocumentBuilder::new(settings).build(images).unwrap()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

/// Pixel width of the image each page draws, in page order.
fn image_widths(bytes: &[u8]) -> Vec<i64> {
    let mut doc = Document::load_mem(bytes).unwrap();
    doc.decompress();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            let name = content
                .operations
                .iter()
                .find(|op| op.operator == "Do")
                .and_then(|op| op.operands.first())
                .and_then(|operand| operand.as_name().ok())
                .unwrap()
                .to_vec();

            let page = doc.get_dictionary(page_id).unwrap();
            let resources = resolve(&doc, page.get(b"Resources").unwrap()).as_dict().unwrap();
            let xobjects = resolve(&doc, resources.get(b"XObject").unwrap()).as_dict().unwrap();
            let stream = resolve(&doc, xobjects.get(&name).unwrap()).as_stream().unwrap();
            stream.dict.get(b"Width").unwrap().as_i64().unwrap()
        })
        .collect()
}

fn page_text(bytes: &[u8]) -> Vec<String> {
    let mut doc = Document::load_mem(bytes).unwrap();
    doc.decompress();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        })
        .collect()
}

/// Operands of the first `Tm` on each page, in page order.
fn text_matrices(bytes: &[u8]) -> Vec<Vec<f32>> {
    let mut doc = Document::load_mem(bytes).unwrap();
    doc.decompress();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            let tm = content
                .operations
                .iter()
                .find(|op| op.operator == "Tm")
                .unwrap();
            tm.operands.iter().map(|operand| operand.as_float().unwrap()).collect()
        })
        .collect()
}

// -- Building -----------------------------------------------------------------

#[test]
fn three_images_become_three_pages_in_order() {
    let bytes = build(
        settings(PageSize::A4, Orientation::Portrait),
        &[payload(10, 20), payload(20, 20), payload(30, 20)],
    );
    assert_eq!(image_widths(&bytes), vec![10, 20, 30]);
}

#[test]
fn corrupt_image_does_not_stop_the_build() {
    let corrupt = RasterPayload::from_bytes(b"\x89PNG truncated".to_vec()).with_dimensions(4, 4);
    let (bytes, report) = DocumentBuilder::new(settings(PageSize::Letter, Orientation::Portrait))
        .build_with_report(&[payload(8, 8), corrupt, payload(9, 9)])
        .unwrap();
    assert_eq!(report.degraded_pages, vec![1]);

    let summary = DocumentSummary::from_bytes(&bytes).unwrap();
    assert_eq!(summary.page_count, 3);
}

#[test]
fn watermark_lands_on_all_four_pages_with_compression() {
    let config = ConversionSettings {
        watermark_text: Some("CONFIDENTIAL".into()),
        compression: true,
        ..ConversionSettings::default()
    };
    let bytes = build(config, &vec![payload(16, 16); 4]);
    let texts = page_text(&bytes);
    assert_eq!(texts.len(), 4);
    for text in texts {
        assert!(text.contains("(CONFIDENTIAL) Tj"));
        assert!(text.contains("BwWatermarkGS gs"));
    }
}

#[test]
fn watermark_is_rotated_45_degrees_about_each_page_centre() {
    let config = ConversionSettings {
        watermark_text: Some("COPY".into()),
        ..settings(PageSize::Letter, Orientation::Landscape)
    };
    let bytes = build(config, &vec![payload(16, 9); 3]);
    let sizes = DocumentSummary::from_bytes(&bytes).unwrap().page_sizes();
    let matrices = text_matrices(&bytes);
    assert_eq!(matrices.len(), 3);

    let (sin, cos) = 45f32.to_radians().sin_cos();
    for (page, (matrix, (width, height))) in matrices.iter().zip(sizes).enumerate() {
        let expected = [cos, sin, -sin, cos, width / 2.0, height / 2.0];
        assert_eq!(matrix.len(), 6, "page {}", page + 1);
        for (actual, wanted) in matrix.iter().zip(expected) {
            assert!((actual - wanted).abs() < 0.01, "page {}: {matrix:?}", page + 1);
        }
    }
}

#[test]
fn identical_inputs_give_identical_page_structure() {
    let images = [payload(30, 40), payload(40, 30)];
    let a3_landscape = || settings(PageSize::A3, Orientation::Landscape);
    let first = DocumentSummary::from_bytes(&build(a3_landscape(), &images)).unwrap();
    let second = DocumentSummary::from_bytes(&build(a3_landscape(), &images)).unwrap();
    assert_eq!(first.pages, second.pages);

    let (width, height) = first.page_sizes()[0];
    assert!((width - 1190.55).abs() < 0.5, "A3 landscape width {width}");
    assert!((height - 841.89).abs() < 0.5, "A3 landscape height {height}");
}

#[test]
fn missing_dimensions_stretch_the_image_to_the_page_shape() {
    let builder = DocumentBuilder::new(settings(PageSize::A4, Orientation::Portrait));
    let mut wide = payload(400, 100);
    let known = builder.placement_of(&wide);
    assert!((known.width / known.height - 4.0).abs() < 1e-3);

    wide.source_width = None;
    wide.source_height = None;
    let fallback = builder.placement_of(&wide);
    let page_aspect = 210.0 / 297.0;
    // The 4:1 image is drawn at the page's 210:297 shape.
    assert!((fallback.width / fallback.height - page_aspect).abs() < 1e-3);

    wide.source_height = Some(100);
    let height_only = builder.placement_of(&wide);
    // The page width stands in for the missing one: 210:100.
    assert!((height_only.width / height_only.height - 2.1).abs() < 1e-3);
}

// -- Merging ------------------------------------------------------------------

#[test]
fn merged_pages_keep_their_own_sizes() {
    let a4 = build(settings(PageSize::A4, Orientation::Portrait), &[payload(5, 5), payload(6, 6)]);
    let letter = build(settings(PageSize::Letter, Orientation::Landscape), &[payload(7, 7)]);

    let merged = DocumentMerger::new().merge(&[a4, letter]).unwrap();
    let summary = DocumentSummary::from_bytes(&merged).unwrap();
    assert_eq!(summary.page_count, 3);

    let sizes = summary.page_sizes();
    assert!((sizes[0].0 - 595.28).abs() < 0.5);
    assert!((sizes[2].0 - 790.87).abs() < 0.5, "Letter landscape width {}", sizes[2].0);
    assert_eq!(image_widths(&merged), vec![5, 6, 7]);
}

#[test]
fn corrupt_source_between_good_ones_is_skipped() {
    let first = build(settings(PageSize::A4, Orientation::Portrait), &[payload(11, 11)]);
    let last = build(
        settings(PageSize::A4, Orientation::Portrait),
        &[payload(12, 12), payload(13, 13)],
    );

    let merged = DocumentMerger::new()
        .merge(&[first, b"%PDF-1.7 broken".to_vec(), last])
        .unwrap();
    assert_eq!(image_widths(&merged), vec![11, 12, 13]);
}

#[test]
fn merge_edge_cases() {
    let merger = DocumentMerger::new();
    let empty: Vec<Vec<u8>> = Vec::new();
    assert!(matches!(merger.merge(&empty), Err(BlattwerkError::NoSourcesProvided)));

    let single = build(settings(PageSize::A4, Orientation::Portrait), &[payload(3, 3)]);
    assert_eq!(merger.merge(&[single.clone()]).unwrap(), single);

    let pair = merger.merge(&[single.clone(), single]).unwrap();
    assert_eq!(DocumentSummary::from_bytes(&pair).unwrap().page_count, 2);
}

#[test]
fn merging_twice_gives_the_same_structure() {
    let a = build(settings(PageSize::A4, Orientation::Portrait), &[payload(3, 3)]);
    let b = build(settings(PageSize::Letter, Orientation::Portrait), &[payload(4, 4)]);
    let merger = DocumentMerger::new();

    let once = merger.merge(&[a.clone(), b.clone()]).unwrap();
    let twice = merger.merge(&[a, b]).unwrap();
    let once = DocumentSummary::from_bytes(&once).unwrap();
    let twice = DocumentSummary::from_bytes(&twice).unwrap();
    assert_eq!(once.pages, twice.pages);
}

#[test]
fn extracted_pages_follow_the_requested_order() {
    let source = build(
        settings(PageSize::A4, Orientation::Portrait),
        &[payload(1, 1), payload(2, 2), payload(3, 3)],
    );
    let extracted = DocumentMerger::new().extract_pages(&source, &[3, 1]).unwrap();
    assert_eq!(image_widths(&extracted), vec![3, 1]);
}
