use super::{PageMap, TocEntry};
use crate::dom::{SUBTITLE_NUMBER_CLASS, TITLE_NUMBER_CLASS, TocNumber};
use crate::error::Result;
use crate::render::ReportPage;

/// Turn a page map into the list of numbers to append, page by page.
pub fn plan(entries: &[TocEntry], map: &PageMap) -> Vec<TocNumber> {
    map.iter()
        .flat_map(|(&page, indices)| {
            indices.iter().filter_map(move |&index| {
                let entry = entries.get(index)?;
                Some(TocNumber {
                    index,
                    page,
                    class: if entry.is_subtitle {
                        SUBTITLE_NUMBER_CLASS
                    } else {
                        TITLE_NUMBER_CLASS
                    },
                })
            })
        })
        .collect()
}

/// Append page numbers to the TOC links in `page`. A document without a TOC
/// container is left alone. Returns the number of entries numbered.
pub async fn inject_page_numbers<P: ReportPage>(
    page: &mut P,
    entries: &[TocEntry],
    map: &PageMap,
) -> Result<usize> {
    let numbers = plan(entries, map);
    if page.inject_page_numbers(&numbers).await? {
        Ok(numbers.len())
    } else {
        tracing::warn!("document has no table of contents; leaving it unnumbered");
        Ok(0)
    }
}
