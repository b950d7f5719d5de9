pub mod inject;
pub mod locate;

use std::collections::BTreeMap;

/// Physical page number (1-based) → indices of the TOC entries that first
/// appear on that page, in TOC order.
pub type PageMap = BTreeMap<u32, Vec<usize>>;

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub index: usize,
    pub title: String,
    pub is_subtitle: bool,
}

impl TocEntry {
    pub fn new(index: usize, title: &str) -> Self {
        let title: String = title.chars().filter(|&c| c != '\n').collect();
        Self {
            index,
            is_subtitle: title.contains('.'),
            title,
        }
    }

    /// Build the entry list from link texts, in document order.
    pub fn from_titles<S: AsRef<str>>(titles: &[S]) -> Vec<Self> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Self::new(i, t.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_titles_are_subtitles() {
        let entries = TocEntry::from_titles(&["Introduction", "1. Scope", "1.2 Method"]);
        let subs: Vec<_> = entries.iter().map(|e| e.is_subtitle).collect();
        assert_eq!(subs, [false, true, true]);
    }

    #[test]
    fn newlines_removed() {
        assert_eq!(TocEntry::new(0, "Long\ntitle").title, "Longtitle");
    }

    #[test]
    fn indices_follow_order() {
        let entries = TocEntry::from_titles(&["a", "b"]);
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].title, "b");
    }
}
