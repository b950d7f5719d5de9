//! Find which physical page each TOC title first appears on.
//!
//! Matching is plain substring containment over the page's text runs glued
//! together. This is a heuristic: titles that are prefixes of each other, or
//! that straddle a page break, can be missed or misplaced. The output only
//! drives cosmetic page numbers, so the rules below are kept exactly as they
//! are rather than made smarter.

use super::{PageMap, TocEntry};
use crate::error::Result;
use crate::pdf::text::PageText;

/// Pages at the front of the preliminary render that never hold section
/// titles: the cover and the table of contents itself. This is a constraint
/// on the input template, which must put exactly these two first.
pub const COVER_PAGE_COUNT: u32 = 2;

/// First physical page scanned for titles.
pub const FIRST_BODY_PAGE: u32 = COVER_PAGE_COUNT + 1;

/// Map pages to the TOC entries that first appear on them.
///
/// When the cover overflowed (`extra_pages > 0`) everything shifts down, so
/// the TOC page itself falls inside the scanned range. Each title's first
/// match is then taken to be its TOC line and only marks it as seen; the
/// next match is the real one.
///
/// The text buffer restarts on every page and after every match, so text
/// already consumed by one title cannot satisfy the next.
pub fn find_page_numbers(
    text: &impl PageText,
    entries: &[TocEntry],
    extra_pages: usize,
) -> Result<PageMap> {
    let mut map = PageMap::new();
    let mut seen = vec![false; entries.len()];
    let mut found = vec![false; entries.len()];

    for page in FIRST_BODY_PAGE..=text.page_count() {
        let mut buffer = String::new();
        for run in text.page_runs(page)? {
            buffer.push_str(&run);
            for (i, entry) in entries.iter().enumerate() {
                if found[i] || entry.title.is_empty() || !buffer.contains(&entry.title) {
                    continue;
                }
                buffer.clear();
                if extra_pages > 0 && !seen[i] {
                    seen[i] = true;
                    continue;
                }
                found[i] = true;
                map.entry(page).or_default().push(entry.index);
            }
        }
    }

    tracing::debug!(
        located = found.iter().filter(|f| **f).count(),
        total = entries.len(),
        "located TOC titles"
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{Pages, make_cid_pdf};
    use crate::pdf::text::PdfText;

    fn entries() -> Vec<TocEntry> {
        TocEntry::from_titles(&["Introduction", "1. Scope", "2. Method"])
    }

    fn locate(pages: &[&[&str]], extra_pages: usize) -> PageMap {
        find_page_numbers(&Pages::new(pages), &entries(), extra_pages).unwrap()
    }

    #[test]
    fn cover_fits_one_page() {
        let map = locate(
            &[
                &["Report"],
                &["Introduction", "1. Scope", "2. Method"],
                &["Introduction", " some text"],
                &["1. Scope", " more"],
            ],
            0,
        );
        assert_eq!(map, PageMap::from([(3, vec![0]), (4, vec![1])]));
    }

    #[test]
    fn cover_overflow_suppresses_first_match() {
        let map = locate(
            &[
                &["Report"],
                &["Report continued"],
                &["Introduction"],
                &["Introduction", " body"],
            ],
            1,
        );
        assert_eq!(map, PageMap::from([(4, vec![0])]));
    }

    #[test]
    fn cover_and_contents_pages_are_skipped() {
        let map = locate(&[&["Introduction"], &["1. Scope"]], 0);
        assert!(map.is_empty());
    }

    #[test]
    fn words_split_across_runs() {
        let map = locate(&[&[], &[], &["Intro", "duc", "tion"]], 0);
        assert_eq!(map, PageMap::from([(3, vec![0])]));
    }

    #[test]
    fn several_titles_on_one_page() {
        let map = locate(&[&[], &[], &["1. Scope", "Introduction", "2. Method"]], 0);
        assert_eq!(map, PageMap::from([(3, vec![1, 0, 2])]));
    }

    #[test]
    fn buffer_resets_after_match() {
        // After "1. Scope" matches, the buffer is empty again, so the text
        // before it cannot combine with later runs.
        let entries = TocEntry::from_titles(&["1. Scope", "Scope 2"]);
        let pages = Pages::new(&[&[], &[], &["1. Scope", " 2"]]);
        let map = find_page_numbers(&pages, &entries, 0).unwrap();
        assert_eq!(map, PageMap::from([(3, vec![0])]));
    }

    #[test]
    fn buffer_does_not_cross_pages() {
        let map = locate(&[&[], &[], &["Intro"], &["duction"]], 0);
        assert!(map.is_empty());
    }

    #[test]
    fn each_title_on_at_most_one_page() {
        let map = locate(
            &[
                &[],
                &[],
                &["Introduction", "1. Scope"],
                &["Introduction", "1. Scope", "2. Method"],
                &["2. Method"],
            ],
            0,
        );
        let mut all: Vec<usize> = map.values().flatten().copied().collect();
        all.sort();
        assert_eq!(all, [0, 1, 2]);
        assert_eq!(map[&4], [2]);
    }

    #[test]
    fn no_suppression_without_overflow() {
        let map = locate(&[&[], &[], &["2. Method"]], 0);
        assert_eq!(map, PageMap::from([(3, vec![2])]));
    }

    #[test]
    fn unmatched_titles_are_absent() {
        let map = locate(&[&[], &[], &["Nothing relevant"]], 0);
        assert!(map.is_empty());
    }

    #[test]
    fn empty_titles_never_match() {
        let entries = TocEntry::from_titles(&["", "Introduction"]);
        let pages = Pages::new(&[&[], &[], &["Introduction"]]);
        let map = find_page_numbers(&pages, &entries, 0).unwrap();
        assert_eq!(map, PageMap::from([(3, vec![1])]));
    }

    #[test]
    fn idempotent() {
        let pages = Pages::new(&[
            &["Report"],
            &["Introduction", "1. Scope"],
            &["Introduction"],
            &["1. Scope", "2. Method"],
        ]);
        let first = find_page_numbers(&pages, &entries(), 0).unwrap();
        let second = find_page_numbers(&pages, &entries(), 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn locates_titles_in_printed_pdf() {
        let pdf = make_cid_pdf(&[
            &["Report"],
            &["Introduction", "1. Scope"],
            &["Intro", "duction", " text"],
            &["1. Scope"],
        ]);
        let text = PdfText::parse(&pdf).unwrap();
        let map = find_page_numbers(&text, &entries(), 0).unwrap();
        assert_eq!(map, PageMap::from([(3, vec![0]), (4, vec![1])]));
    }
}
