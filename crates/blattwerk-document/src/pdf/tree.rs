// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-tree helpers shared by the merger, the watermark overlay, and
// inspection: reference resolution and inherited page attributes.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from an ancestor `/Pages` node.
pub(crate) const INHERITABLE_PAGE_KEYS: [&[u8]; 4] =
    [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, the conventional fallback for a page without a MediaBox.
pub(crate) const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Bound on reference chains and page-tree depth; malformed files can loop.
const MAX_DEPTH: usize = 32;

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resolve `object` to a dictionary and return an owned copy.
pub(crate) fn owned_dictionary(doc: &Document, object: &Object) -> Option<Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Look `key` up on the ancestors of `page_id`, nearest first.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut parent = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .ok()?
        .as_reference()
        .ok()?;
    for _ in 0..MAX_DEPTH {
        let node = doc.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// A page attribute, taken from the page itself or inherited.
pub(crate) fn page_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let page = doc.get_dictionary(page_id).ok()?;
    match page.get(key) {
        Ok(value) => Some(value.clone()),
        Err(_) => inherited_attribute(doc, page_id, key),
    }
}

/// The page's MediaBox as `[llx, lly, urx, ury]` in points.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    page_attribute(doc, page_id, b"MediaBox")
        .and_then(|object| rectangle(doc, &object))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// The page's effective /Rotate, normalised to 0, 90, 180 or 270.
pub(crate) fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    page_attribute(doc, page_id, b"Rotate")
        .and_then(|object| resolve(doc, &object)?.as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360)
}

fn rectangle(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let items = resolve(doc, object)?.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = resolve(doc, item)?.as_float().ok()?;
    }
    Some(rect)
}
