//! The cover/body split: print the first section and the rest separately so
//! each gets its own margins, header and footer.

use crate::dom::{PLACEHOLDER_TEMPLATE, Projected, Projection};
use crate::error::Result;
use crate::pdf::text::{PageText, PdfText};
use crate::render::{Layout, RenderOptions, Renderer, ReportPage, finish};
use tracing::instrument;

/// Print `html` on a fresh page.
pub async fn render_html<R: Renderer>(
    renderer: &R,
    html: &str,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let mut page = renderer.open_page().await?;
    let result = load_and_print(&mut page, html, options).await;
    finish(page, result).await
}

async fn load_and_print<P: ReportPage>(
    page: &mut P,
    html: &str,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    page.load_html(html).await?;
    page.print_pdf(options).await
}

/// Count how many pages the cover section spills over onto, by printing it
/// on its own.
#[instrument(skip_all)]
pub async fn probe_extra_pages<R: Renderer>(
    renderer: &R,
    html: &str,
    layout: &Layout,
) -> Result<usize> {
    let mut page = renderer.open_page().await?;
    let result = print_cover(&mut page, html, layout).await;
    let pdf = finish(page, result).await?;
    let pages = PdfText::parse(&pdf)?.page_count() as usize;
    let extra_pages = pages.saturating_sub(1);
    tracing::debug!(pages, extra_pages, "probed cover section");
    Ok(extra_pages)
}

async fn print_cover<P: ReportPage>(page: &mut P, html: &str, layout: &Layout) -> Result<Vec<u8>> {
    page.load_html(html).await?;
    let cover = page.project(Projection::Cover).await?;
    page.print_pdf(&cover_options(layout, cover.header, cover.footer))
        .await
}

/// The two final renders, `[cover, body]`, both projected from the report
/// already loaded in `page`.
#[instrument(skip_all, fields(extra_pages = extra_pages))]
pub async fn render_passes<R: Renderer>(
    renderer: &R,
    page: &mut R::Page,
    extra_pages: usize,
    layout: &Layout,
) -> Result<[Vec<u8>; 2]> {
    let Projected {
        html,
        header,
        footer,
    } = page.project(Projection::Cover).await?;
    let cover = render_html(renderer, &html, &cover_options(layout, header, footer)).await?;
    tracing::debug!(bytes = cover.len(), "rendered cover pass");

    let Projected {
        html,
        header,
        footer,
    } = page.project(Projection::Body { extra_pages }).await?;
    let body = render_html(renderer, &html, &body_options(layout, header, footer)).await?;
    tracing::debug!(bytes = body.len(), "rendered body pass");

    Ok([cover, body])
}

fn cover_options(layout: &Layout, header: Option<String>, footer: Option<String>) -> RenderOptions {
    layout.cover_options(
        template(header, "first-page header"),
        template(footer, "first-page footer"),
    )
}

fn body_options(layout: &Layout, header: Option<String>, footer: Option<String>) -> RenderOptions {
    layout.body_options(template(header, "page header"), template(footer, "page footer"))
}

fn template(html: Option<String>, what: &'static str) -> String {
    html.unwrap_or_else(|| {
        tracing::warn!(element = what, "element missing from document; using a blank template");
        PLACEHOLDER_TEMPLATE.to_string()
    })
}
