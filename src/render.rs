//! The renderer seam: what the pipeline needs from a headless browser.

use crate::dom::{Projected, Projection, TocNumber};
use crate::error::Result;
use serde::Deserialize;
use std::future::Future;

const MM_PER_INCH: f64 = 25.4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
}

impl PageFormat {
    /// Paper `(width, height)` in inches, which is what the browser wants.
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (210.0 / MM_PER_INCH, 297.0 / MM_PER_INCH),
            PageFormat::A3 => (297.0 / MM_PER_INCH, 420.0 / MM_PER_INCH),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Margins {
    pub top_mm: f64,
    pub bottom_mm: f64,
}

impl Margins {
    pub const fn new(top_mm: f64, bottom_mm: f64) -> Self {
        Self { top_mm, bottom_mm }
    }

    pub fn top_inches(&self) -> f64 {
        self.top_mm / MM_PER_INCH
    }

    pub fn bottom_inches(&self) -> f64 {
        self.bottom_mm / MM_PER_INCH
    }
}

/// Options for a single print call. Built fresh for every render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub format: PageFormat,
    pub margins: Margins,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub print_background: bool,
    pub display_header_footer: bool,
}

/// Page geometry shared by every pass of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub format: PageFormat,
    pub cover_margins: Margins,
    pub body_margins: Margins,
    pub print_background: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            cover_margins: Margins::new(20.0, 25.0),
            body_margins: Margins::new(35.0, 25.0),
            print_background: true,
        }
    }
}

impl Layout {
    fn with_templates(&self, margins: Margins, header: String, footer: String) -> RenderOptions {
        RenderOptions {
            format: self.format,
            margins,
            header_template: Some(header),
            footer_template: Some(footer),
            print_background: self.print_background,
            display_header_footer: true,
        }
    }

    pub fn cover_options(&self, header: String, footer: String) -> RenderOptions {
        self.with_templates(self.cover_margins, header, footer)
    }

    pub fn body_options(&self, header: String, footer: String) -> RenderOptions {
        self.with_templates(self.body_margins, header, footer)
    }

    /// The page-discovery render uses body margins so page breaks land where
    /// they will in the body pass. Headers live inside the margins and do not
    /// move anything, so they are left out.
    pub fn preliminary_options(&self) -> RenderOptions {
        RenderOptions {
            format: self.format,
            margins: self.body_margins,
            header_template: None,
            footer_template: None,
            print_background: self.print_background,
            display_header_footer: false,
        }
    }
}

/// One browser page holding a live copy of the report DOM.
///
/// The DOM methods encode the report's HTML contract (cover section, TOC
/// container, header/footer ids); see `crate::dom`.
pub trait ReportPage: Send {
    fn load_html(&mut self, html: &str) -> impl Future<Output = Result<()>> + Send;

    /// Print the page as it currently stands.
    fn print_pdf(&mut self, options: &RenderOptions) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Link texts of the TOC entries, or `None` if there is no TOC container.
    fn toc_titles(&mut self) -> impl Future<Output = Result<Option<Vec<String>>>> + Send;

    /// Fill every total-page-count field. Returns how many were found.
    fn set_total_pages(&mut self, total: u32) -> impl Future<Output = Result<usize>> + Send;

    /// Append dots and page numbers to TOC links. Returns `false`, leaving
    /// the DOM untouched, if there is no TOC container.
    fn inject_page_numbers(&mut self, numbers: &[TocNumber]) -> impl Future<Output = Result<bool>> + Send;

    fn project(&mut self, projection: Projection) -> impl Future<Output = Result<Projected>> + Send;

    /// Serialize the whole current DOM.
    fn document_html(&mut self) -> impl Future<Output = Result<String>> + Send;

    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

pub trait Renderer: Send + Sync + 'static {
    type Page: ReportPage;

    fn open_page(&self) -> impl Future<Output = Result<Self::Page>> + Send;
}

/// Close `page` and hand back `result`. An error from the work done on the
/// page wins over an error from closing it.
pub async fn finish<P: ReportPage, T>(page: P, result: Result<T>) -> Result<T> {
    let closed = page.close().await;
    let value = result?;
    closed?;
    Ok(value)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_in_inches() {
        let (w, h) = PageFormat::A4.size_inches();
        assert!((w - 8.267).abs() < 0.001);
        assert!((h - 11.693).abs() < 0.001);
    }

    #[test]
    fn margins_in_inches() {
        assert!((Margins::new(25.4, 50.8).top_inches() - 1.0).abs() < 1e-9);
        assert!((Margins::new(25.4, 50.8).bottom_inches() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn body_pass_has_taller_top_margin() {
        let layout = Layout::default();
        let cover = layout.cover_options("h".into(), "f".into());
        let body = layout.body_options("h".into(), "f".into());
        assert_eq!(cover.margins, Margins::new(20.0, 25.0));
        assert_eq!(body.margins, Margins::new(35.0, 25.0));
        assert!(cover.display_header_footer && body.display_header_footer);
    }

    #[test]
    fn preliminary_matches_body_geometry() {
        let layout = Layout::default();
        let prelim = layout.preliminary_options();
        assert_eq!(prelim.margins, layout.body_margins);
        assert!(!prelim.display_header_footer);
        assert_eq!(prelim.header_template, None);
    }
}
