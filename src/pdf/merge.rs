//! Splice the separately rendered cover page onto the body PDF.

use crate::error::{Error, Result};
use lopdf::{Document, Object, ObjectId};

/// Index (0-based) of the blank page the body pass always produces where the
/// hidden cover section used to be. Tied to the two-section template layout.
pub const ARTIFACT_PAGE_INDEX: u32 = 1;

/// Index (0-based) of the page taken from the cover render.
pub const COVER_PAGE_INDEX: u32 = 0;

/// Merge `[cover, body]` into the final document.
///
/// The artifact page is dropped from the body, the cover render is trimmed
/// back to its first page (dropping `extra_pages` overflow pages after it),
/// and that page is inserted in front of the body.
pub fn merge<B: AsRef<[u8]>>(buffers: &[B], extra_pages: usize) -> Result<Vec<u8>> {
    let [cover, body] = buffers else {
        return Err(Error::MergeArity(buffers.len()));
    };
    let mut cover = Document::load_mem(cover.as_ref())?;
    let mut body = Document::load_mem(body.as_ref())?;

    let body_pages = body.get_pages().len();
    if body_pages <= ARTIFACT_PAGE_INDEX as usize {
        tracing::warn!(body_pages, "body render has no artifact page to remove");
    }
    body.delete_pages(&[ARTIFACT_PAGE_INDEX + 1]);

    if extra_pages > 0 {
        let first = COVER_PAGE_INDEX + 2;
        let overflow: Vec<u32> = (first..first + extra_pages as u32).collect();
        cover.delete_pages(&overflow);
    }

    let cover_page = import_page(&mut body, cover, COVER_PAGE_INDEX)?;
    insert_page(&mut body, cover_page, 0)?;

    body.prune_objects();
    let mut out = Vec::new();
    body.save_to(&mut out)
        .map_err(|e| Error::Serialize(e.to_string()))?;
    Ok(out)
}

/// Move every object of `src` into `dst` under fresh ids and return the new
/// id of page `index`. The page is not yet part of `dst`'s page tree;
/// anything of `src` it doesn't reference is dropped on the next prune.
fn import_page(dst: &mut Document, mut src: Document, index: u32) -> Result<ObjectId> {
    src.renumber_objects_with(dst.max_id + 1);
    let page_id = *src
        .get_pages()
        .get(&(index + 1))
        .ok_or(Error::EmptyDocument)?;
    dst.max_id = dst.max_id.max(src.max_id);
    dst.objects.extend(src.objects);
    Ok(page_id)
}

/// Attach `page_id` as child `index` of the root page tree node.
fn insert_page(doc: &mut Document, page_id: ObjectId, index: usize) -> Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let pages_id = doc.get_dictionary(root_id)?.get(b"Pages")?.as_reference()?;

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Parent", Object::Reference(pages_id));

    let kids = doc
        .get_object_mut(pages_id)?
        .as_dict_mut()?
        .get_mut(b"Kids")?
        .as_array_mut()?;
    kids.insert(index.min(kids.len()), Object::Reference(page_id));

    // The root's count covers every leaf, whatever happened further down.
    let total = doc.get_pages().len() as i64;
    doc.get_object_mut(pages_id)?
        .as_dict_mut()?
        .set("Count", total);
    Ok(())
}
