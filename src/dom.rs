//! The report's HTML contract, and the page scripts that query and mutate it.
//!
//! Each script in `scripts/` is a single JS function expression taking one
//! JSON argument object. They are invoked as `(<script>)(<args>)` and always
//! return a value (never `null`/`undefined`) so the result survives the trip
//! back over CDP.

use crate::assets::assets;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

assets!(
    SCRIPTS,
    "scripts",
    [
        "toc_titles.js",
        "total_pages.js",
        "inject_page_numbers.js",
        "project_cover.js",
        "project_body.js",
        "document_html.js"
    ]
);

pub const COVER_SECTION_ID: &str = "presentation";
pub const TOC_CONTAINER_ID: &str = "table-of-content";
pub const TOTAL_PAGES_CLASS: &str = "totalPages";
pub const FIRST_PAGE_HEADER_ID: &str = "first-page-header";
pub const FIRST_PAGE_FOOTER_ID: &str = "first-page-footer";
pub const PAGE_HEADER_ID: &str = "page-header";
pub const PAGE_FOOTER_ID: &str = "page-footer";

pub const DOTS_CLASS: &str = "dots";
pub const TITLE_NUMBER_CLASS: &str = "title-page-number";
pub const SUBTITLE_NUMBER_CLASS: &str = "subtitle-page-number";

/// Header/footer template used when the document lacks the element. Chrome
/// prints its own date/title header for an empty template, so this must not
/// be empty.
pub const PLACEHOLDER_TEMPLATE: &str = "<span></span>";

/// A page number to append to one TOC entry's link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNumber {
    pub index: usize,
    pub page: u32,
    pub class: &'static str,
}

/// The two views of a loaded report that get printed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Only the cover section is displayed.
    Cover,

    /// Everything after the cover. When the cover fits on one page its
    /// children are hidden too.
    Body { extra_pages: usize },
}

/// The serialized DOM after a projection, with the header and footer
/// templates that belong to it (if the document has them).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Projected {
    pub html: String,
    pub header: Option<String>,
    pub footer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TocTitles {
    pub titles: Option<Vec<String>>,
}

pub fn script(name: &'static str) -> Result<Cow<'static, str>> {
    SCRIPTS
        .load(name)
        .map_err(Error::io("loading page script", name))
}

/// Build a JS expression applying the script `name` to `args`.
pub fn invocation(name: &'static str, args: &impl Serialize) -> Result<String> {
    let source = script(name)?;
    let source = source.trim().trim_end_matches(';');
    Ok(format!("({source})({})", serde_json::to_string(args)?))
}

pub fn toc_titles_call() -> Result<String> {
    invocation(
        "toc_titles.js",
        &serde_json::json!({ "tocId": TOC_CONTAINER_ID }),
    )
}

pub fn total_pages_call(total: u32) -> Result<String> {
    invocation(
        "total_pages.js",
        &serde_json::json!({ "className": TOTAL_PAGES_CLASS, "total": total }),
    )
}

pub fn inject_call(numbers: &[TocNumber]) -> Result<String> {
    invocation(
        "inject_page_numbers.js",
        &serde_json::json!({
            "tocId": TOC_CONTAINER_ID,
            "dotsClass": DOTS_CLASS,
            "numbers": numbers,
        }),
    )
}

pub fn project_call(projection: Projection) -> Result<String> {
    match projection {
        Projection::Cover => invocation(
            "project_cover.js",
            &serde_json::json!({
                "coverId": COVER_SECTION_ID,
                "headerId": FIRST_PAGE_HEADER_ID,
                "footerId": FIRST_PAGE_FOOTER_ID,
            }),
        ),
        Projection::Body { extra_pages } => invocation(
            "project_body.js",
            &serde_json::json!({
                "coverId": COVER_SECTION_ID,
                "extraPages": extra_pages,
                "headerId": PAGE_HEADER_ID,
                "footerId": PAGE_FOOTER_ID,
            }),
        ),
    }
}

pub fn document_html_call() -> Result<String> {
    invocation("document_html.js", &serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_script_loads() {
        for name in SCRIPTS.names() {
            let source = SCRIPTS.load(name).unwrap();
            assert!(source.contains("=>"), "{name} is not a function expression");
        }
    }

    #[test]
    fn call_embeds_arguments() {
        let call = total_pages_call(12).unwrap();
        assert!(call.starts_with("(({ className, total })"));
        assert!(call.ends_with(r#"({"className":"totalPages","total":12})"#));
    }

    #[test]
    fn inject_serializes_numbers() {
        let call = inject_call(&[TocNumber {
            index: 2,
            page: 7,
            class: SUBTITLE_NUMBER_CLASS,
        }])
        .unwrap();
        assert!(call.contains(r#""class":"subtitle-page-number""#));
        assert!(call.contains(r#""index":2"#));
        assert!(call.contains(r#""page":7"#));
        assert!(call.contains(r#""tocId":"table-of-content""#));
    }

    #[test]
    fn body_projection_passes_extra_pages() {
        let call = project_call(Projection::Body { extra_pages: 2 }).unwrap();
        assert!(call.contains(r#""extraPages":2"#));
        assert!(call.contains(r#""headerId":"page-header""#));
    }

    #[test]
    fn cover_projection_uses_first_page_templates() {
        let call = project_call(Projection::Cover).unwrap();
        assert!(call.contains(r#""headerId":"first-page-header""#));
        assert!(call.contains(r#""footerId":"first-page-footer""#));
    }

    #[test]
    fn document_html_takes_no_arguments() {
        assert!(document_html_call().unwrap().ends_with("(null)"));
    }

    #[test]
    fn body_script_hides_cover_children_only_without_overflow() {
        let source = script("project_body.js").unwrap();
        assert!(source.contains("cover.style.display = 'flex'"));
        assert!(source.contains("if (extraPages === 0)"));
        assert!(source.contains("child.style.display = 'none'"));
        // Every section after the cover is forced back on.
        assert!(source.contains("if (i > 0)"));
        assert!(source.contains("section.style.display = 'block'"));
    }

    #[test]
    fn cover_script_hides_other_sections() {
        let source = script("project_cover.js").unwrap();
        assert!(source.contains("section.id !== coverId"));
        assert!(source.contains("section.style.display = 'none'"));
        assert!(!source.contains("extraPages"));
    }
}
