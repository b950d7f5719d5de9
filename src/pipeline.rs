//! The whole run: number the TOC from a preliminary render, then print the
//! cover and body separately and stitch them together.

use crate::error::Result;
use crate::pdf::merge::merge;
use crate::pdf::text::{PageText, PdfText};
use crate::render::{Layout, Renderer, ReportPage, finish};
use crate::split::{probe_extra_pages, render_passes};
use crate::toc::TocEntry;
use crate::toc::inject::inject_page_numbers;
use crate::toc::locate::find_page_numbers;
use tracing::instrument;

/// The report with page numbers filled in, plus what was learned about its
/// layout along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedReport {
    pub html: String,
    pub extra_pages: usize,

    /// Pages in the preliminary render.
    pub page_count: u32,

    /// TOC entries that got a page number.
    pub numbered: usize,
}

/// Fill in the TOC page numbers and total page count of `html`.
#[instrument(skip_all, fields(bytes = html.len()))]
pub async fn number_toc<R: Renderer>(
    renderer: &R,
    html: &str,
    layout: &Layout,
) -> Result<NumberedReport> {
    let extra_pages = probe_extra_pages(renderer, html, layout).await?;

    let mut page = renderer.open_page().await?;
    let result = number_loaded(&mut page, html, extra_pages, layout).await;
    let report = finish(page, result).await?;
    tracing::info!(
        pages = report.page_count,
        extra_pages,
        numbered = report.numbered,
        "numbered table of contents"
    );
    Ok(report)
}

async fn number_loaded<P: ReportPage>(
    page: &mut P,
    html: &str,
    extra_pages: usize,
    layout: &Layout,
) -> Result<NumberedReport> {
    page.load_html(html).await?;
    let preliminary = preliminary_render(page, layout).await?;
    let text = PdfText::parse(&preliminary)?;
    let page_count = text.page_count();

    // Same numbering the TOC gets: overflow pages stay in the body render.
    let fields = page.set_total_pages(page_count).await?;
    tracing::debug!(page_count, fields, "set total page count");

    let numbered = match page.toc_titles().await? {
        Some(titles) => {
            let entries = TocEntry::from_titles(&titles);
            let map = find_page_numbers(&text, &entries, extra_pages)?;
            inject_page_numbers(page, &entries, &map).await?
        }
        None => {
            tracing::warn!("document has no table of contents; only the page count was set");
            0
        }
    };

    Ok(NumberedReport {
        html: page.document_html().await?,
        extra_pages,
        page_count,
        numbered,
    })
}

#[instrument(skip_all)]
async fn preliminary_render<P: ReportPage>(page: &mut P, layout: &Layout) -> Result<Vec<u8>> {
    page.print_pdf(&layout.preliminary_options()).await
}

/// Print an already-numbered report. Without a known `extra_pages` the cover
/// is probed again.
#[instrument(skip_all, fields(bytes = html.len()))]
pub async fn render_pdf<R: Renderer>(
    renderer: &R,
    html: &str,
    extra_pages: Option<usize>,
    layout: &Layout,
) -> Result<Vec<u8>> {
    let extra_pages = match extra_pages {
        Some(n) => n,
        None => probe_extra_pages(renderer, html, layout).await?,
    };

    let mut page = renderer.open_page().await?;
    let result = async {
        page.load_html(html).await?;
        render_passes(renderer, &mut page, extra_pages, layout).await
    }
    .await;
    let passes = finish(page, result).await?;

    let pdf = merge(&passes, extra_pages)?;
    tracing::info!(bytes = pdf.len(), extra_pages, "assembled PDF");
    Ok(pdf)
}

/// Both halves in one go, carrying the cover probe over.
pub async fn build<R: Renderer>(
    renderer: &R,
    html: &str,
    layout: &Layout,
) -> Result<(NumberedReport, Vec<u8>)> {
    let report = number_toc(renderer, html, layout).await?;
    let pdf = render_pdf(renderer, &report.html, Some(report.extra_pages), layout).await?;
    Ok((report, pdf))
}
