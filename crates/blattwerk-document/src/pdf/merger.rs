// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document merger - concatenate the pages of several PDFs into one document,
// reorder sources, and extract page selections, using `lopdf`.
//
// Pages are copied structurally: every object reachable from a page is cloned
// into the destination once per source, so shared fonts and images stay
// shared and reference cycles terminate.

use std::collections::{HashMap, HashSet};

use blattwerk_core::error::{BlattwerkError, Result, Stage};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

use crate::pdf::tree::{self, INHERITABLE_PAGE_KEYS};

/// Combines existing PDF documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMerger;

impl DocumentMerger {
    pub fn new() -> Self {
        Self
    }

    // -- Merging --------------------------------------------------------------

    /// Concatenate `sources` in order.
    ///
    /// A single source is returned byte-for-byte once it is known to parse.
    /// Sources that fail to parse contribute no pages; the merge fails only
    /// when none of them parses.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn merge<S: AsRef<[u8]>>(&self, sources: &[S]) -> Result<Vec<u8>> {
        match sources {
            [] => Err(BlattwerkError::NoSourcesProvided),
            [only] => {
                let bytes = only.as_ref();
                Document::load_mem(bytes).map_err(|err| {
                    BlattwerkError::UnsupportedFormat(format!("not a readable PDF: {err}"))
                })?;
                debug!(bytes = bytes.len(), "Single source passed through");
                Ok(bytes.to_vec())
            }
            _ => self.merge_many(sources),
        }
    }

    /// Merge `sources` rearranged by `order`, a list of indices into `sources`.
    pub fn merge_with_order<S: AsRef<[u8]>>(
        &self,
        sources: &[S],
        order: &[usize],
    ) -> Result<Vec<u8>> {
        let ordered = order
            .iter()
            .map(|&index| {
                sources.get(index).map(|source| source.as_ref()).ok_or_else(|| {
                    BlattwerkError::InvalidInput(format!(
                        "source index {index} out of range (have {})",
                        sources.len()
                    ))
                })
            })
            .collect::<Result<Vec<&[u8]>>>()?;
        debug!(?order, "Sources reordered");
        self.merge(&ordered)
    }

    fn merge_many<S: AsRef<[u8]>>(&self, sources: &[S]) -> Result<Vec<u8>> {
        info!(sources = sources.len(), "Merging PDFs");

        let (mut target, pages_root) = empty_destination();
        let mut kids = Vec::new();
        let mut parsed = 0usize;

        for (index, source) in sources.iter().enumerate() {
            let document = match Document::load_mem(source.as_ref()) {
                Ok(document) => document,
                Err(err) => {
                    warn!(source = index + 1, error = %err, "Source could not be parsed, skipping");
                    continue;
                }
            };
            parsed += 1;

            let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
            match copy_pages(&document, &mut target, &page_ids, pages_root) {
                Ok(copied) => {
                    debug!(source = index + 1, pages = copied.len(), "Source pages copied");
                    kids.extend(copied);
                }
                Err(err) => {
                    warn!(
                        source = index + 1,
                        error = %err,
                        "Source pages could not be copied, skipping"
                    );
                }
            }
        }

        if parsed == 0 {
            return Err(BlattwerkError::merge(
                Stage::Parse,
                "none of the sources is a readable PDF",
            ));
        }

        let page_count = kids.len();
        let bytes = finish(target, pages_root, kids)?;
        info!(pages = page_count, bytes = bytes.len(), "Merge complete");
        Ok(bytes)
    }

    // -- Extraction -----------------------------------------------------------

    /// Copy the listed 1-indexed pages of `source`, in the listed order, into
    /// a new document.
    #[instrument(skip_all, fields(bytes = source.len(), pages = ?pages))]
    pub fn extract_pages(&self, source: &[u8], pages: &[u32]) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(BlattwerkError::InvalidInput("no pages selected".into()));
        }
        let document = Document::load_mem(source).map_err(|err| {
            BlattwerkError::UnsupportedFormat(format!("not a readable PDF: {err}"))
        })?;
        let available = document.get_pages();

        let mut seen = HashSet::new();
        let mut page_ids = Vec::with_capacity(pages.len());
        for &number in pages {
            let page_id = available.get(&number).copied().ok_or_else(|| {
                BlattwerkError::InvalidInput(format!(
                    "page {number} out of range (document has {})",
                    available.len()
                ))
            })?;
            if !seen.insert(number) {
                return Err(BlattwerkError::InvalidInput(format!("page {number} selected twice")));
            }
            page_ids.push(page_id);
        }

        let (mut target, pages_root) = empty_destination();
        let kids = copy_pages(&document, &mut target, &page_ids, pages_root)?;
        let bytes = finish(target, pages_root, kids)?;
        info!(pages = pages.len(), bytes = bytes.len(), "Pages extracted");
        Ok(bytes)
    }
}

// -- Destination document -----------------------------------------------------

/// A document holding only a catalog; the page tree node is reserved and
/// written by [`finish`].
fn empty_destination() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.7");
    let pages_root = doc.new_object_id();
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_root,
    });
    doc.trailer.set("Root", catalog_id);
    (doc, pages_root)
}

fn finish(mut doc: Document, pages_root: ObjectId, kids: Vec<ObjectId>) -> Result<Vec<u8>> {
    let count = kids.len() as i64;
    let kids: Vec<Object> = kids.into_iter().map(Object::Reference).collect();
    doc.objects.insert(
        pages_root,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    // Objects copied for a source that was later abandoned are unreachable.
    doc.prune_objects();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| BlattwerkError::merge(Stage::Serialize, err))?;
    Ok(bytes)
}

// -- Page copying -------------------------------------------------------------

/// Copy `page_ids` from `source` into `target`, returning the new page ids in
/// the same order. Nothing is linked into the page tree here.
fn copy_pages(
    source: &Document,
    target: &mut Document,
    page_ids: &[ObjectId],
    pages_root: ObjectId,
) -> Result<Vec<ObjectId>> {
    let mut copier = PageCopier::new(source);

    // Reserve ids for every selected page first so links between them resolve
    // to the copies.
    let reserved: Vec<ObjectId> = page_ids
        .iter()
        .map(|&page_id| {
            let new_id = target.new_object_id();
            copier.copied.insert(page_id, new_id);
            new_id
        })
        .collect();

    for (&page_id, &new_id) in page_ids.iter().zip(&reserved) {
        copier.copy_page(target, page_id, new_id, pages_root)?;
    }
    Ok(reserved)
}

/// Memoised deep copy from one source document.
struct PageCopier<'a> {
    source: &'a Document,
    /// Source object id to destination object id.
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        new_id: ObjectId,
        pages_root: ObjectId,
    ) -> Result<()> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            BlattwerkError::merge(Stage::CopyPages, format!("page {page_id:?}: {err}"))
        })?;

        let mut copy = self.copy_dictionary(target, page);
        for key in INHERITABLE_PAGE_KEYS {
            if copy.has(key) {
                continue;
            }
            if let Some(value) = tree::inherited_attribute(source, page_id, key) {
                let value = self.copy_object(target, &value);
                copy.set(key, value);
            }
        }
        copy.set("Parent", Object::Reference(pages_root));

        target.objects.insert(new_id, Object::Dictionary(copy));
        Ok(())
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(target, item)).collect())
            }
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    /// Copy every entry except `/Parent`, which only page-tree nodes and
    /// form fields carry and which the caller re-points where needed.
    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy_object(target, value));
        }
        copy
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(&mapped) = self.copied.get(&id) {
            return Object::Reference(mapped);
        }

        let source = self.source;
        let object = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                debug!(?id, error = %err, "Dangling reference dropped");
                return Object::Null;
            }
        };

        // Pages outside the selection, and the source page tree itself, must
        // not be dragged in through links or annotations.
        if is_page_tree_node(object) {
            return Object::Null;
        }

        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(target, object);
        target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    /// A PDF whose pages each draw their own label; `media_box` is set on
    /// the page tree root so pages inherit it.
    fn labelled_pdf(labels: &[&str], media_box: [i64; 4]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids = Vec::new();
        for label in labels {
            let body = format!("BT /F1 24 Tf 72 720 Td ({label}) Tj ET");
            let content_id = doc.add_object(Stream::new(Dictionary::new(), body.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => labels.len() as i64,
                "Resources" => resources_id,
                "MediaBox" => media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn page_labels(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let raw = doc.get_page_content(page_id).unwrap();
                let content = String::from_utf8_lossy(&raw).into_owned();
                let start = content.find('(').unwrap() + 1;
                let end = content.find(')').unwrap();
                content[start..end].to_string()
            })
            .collect()
    }

    const LETTER: [i64; 4] = [0, 0, 612, 792];

    #[test]
    fn no_sources_is_rejected() {
        let sources: [Vec<u8>; 0] = [];
        assert!(matches!(
            DocumentMerger::new().merge(&sources),
            Err(BlattwerkError::NoSourcesProvided)
        ));
    }

    #[test]
    fn single_source_is_returned_unchanged() {
        let source = labelled_pdf(&["only"], LETTER);
        let merged = DocumentMerger::new().merge(&[source.clone()]).unwrap();
        assert_eq!(merged, source);
    }

    #[test]
    fn single_unreadable_source_is_unsupported() {
        let result = DocumentMerger::new().merge(&[b"%PDF-garbage".to_vec()]);
        assert!(matches!(result, Err(BlattwerkError::UnsupportedFormat(_))));
    }

    #[test]
    fn pages_are_concatenated_in_source_order() {
        let a = labelled_pdf(&["a1", "a2"], LETTER);
        let b = labelled_pdf(&["b1"], LETTER);
        let merged = DocumentMerger::new().merge(&[a, b]).unwrap();
        assert_eq!(page_labels(&merged), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn corrupt_source_in_the_middle_is_skipped() {
        let a = labelled_pdf(&["a1"], LETTER);
        let c = labelled_pdf(&["c1", "c2"], LETTER);
        let merged = DocumentMerger::new()
            .merge(&[a, b"garbage".to_vec(), c])
            .unwrap();
        assert_eq!(page_labels(&merged), vec!["a1", "c1", "c2"]);
    }

    #[test]
    fn all_sources_corrupt_is_a_parse_failure() {
        let result = DocumentMerger::new().merge(&[b"x".to_vec(), b"y".to_vec()]);
        assert!(matches!(
            result,
            Err(BlattwerkError::MergeFailed { stage: Stage::Parse, .. })
        ));
    }

    #[test]
    fn inherited_attributes_are_materialised() {
        let a = labelled_pdf(&["a1"], [0, 0, 300, 400]);
        let b = labelled_pdf(&["b1"], LETTER);
        let merged = DocumentMerger::new().merge(&[a, b]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        let pages = doc.get_pages();
        let first = doc.get_dictionary(pages[&1]).unwrap();
        assert!(first.has(b"Resources"));
        assert_eq!(tree::media_box(&doc, pages[&1]), [0.0, 0.0, 300.0, 400.0]);
        assert_eq!(tree::media_box(&doc, pages[&2]), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn shared_resources_are_copied_once_per_source() {
        let a = labelled_pdf(&["a1", "a2", "a3"], LETTER);
        let b = labelled_pdf(&["b1"], LETTER);
        let merged = DocumentMerger::new().merge(&[a, b]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        let fonts = doc
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .and_then(|dict| dict.get(b"Type"))
                    .and_then(Object::as_name)
                    .map(|name| name == b"Font")
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(fonts, 2);
    }

    #[test]
    fn merge_with_order_rearranges_sources() {
        let a = labelled_pdf(&["a"], LETTER);
        let b = labelled_pdf(&["b"], LETTER);
        let c = labelled_pdf(&["c"], LETTER);
        let merged = DocumentMerger::new()
            .merge_with_order(&[a, b, c], &[2, 0, 1])
            .unwrap();
        assert_eq!(page_labels(&merged), vec!["c", "a", "b"]);
    }

    #[test]
    fn merge_with_order_rejects_bad_index() {
        let a = labelled_pdf(&["a"], LETTER);
        let result = DocumentMerger::new().merge_with_order(&[a], &[0, 3]);
        assert!(matches!(result, Err(BlattwerkError::InvalidInput(_))));
    }

    #[test]
    fn extract_pages_keeps_requested_order() {
        let source = labelled_pdf(&["p1", "p2", "p3", "p4"], LETTER);
        let extracted = DocumentMerger::new().extract_pages(&source, &[4, 2]).unwrap();
        assert_eq!(page_labels(&extracted), vec!["p4", "p2"]);
    }

    #[test]
    fn extract_pages_validates_selection() {
        let source = labelled_pdf(&["p1", "p2"], LETTER);
        let merger = DocumentMerger::new();
        assert!(matches!(
            merger.extract_pages(&source, &[3]),
            Err(BlattwerkError::InvalidInput(_))
        ));
        assert!(matches!(
            merger.extract_pages(&source, &[]),
            Err(BlattwerkError::InvalidInput(_))
        ));
        assert!(matches!(
            merger.extract_pages(&source, &[1, 1]),
            Err(BlattwerkError::InvalidInput(_))
        ));
    }
}
