//! Headless Chrome behind the renderer seam.

use crate::dom::{self, Projected, Projection, TocNumber, TocTitles};
use crate::error::{Error, Result};
use crate::render::{RenderOptions, Renderer, ReportPage};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_executable: Option<PathBuf>,
    pub no_sandbox: bool,
    pub render_timeout: Duration,
}

/// One browser process, shared by every pipeline run.
pub struct RendererPool {
    browser: Browser,
    events: JoinHandle<()>,
    cancel: CancellationToken,
    timeout: Duration,
}

impl RendererPool {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder().request_timeout(settings.render_timeout);
        if let Some(exe) = &settings.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(Error::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Launch(e.to_string()))?;

        // The connection only makes progress while its event stream is polled.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser event error: {e}");
                }
            }
        });
        tracing::info!("headless browser started");

        Ok(Self {
            browser,
            events,
            cancel: CancellationToken::new(),
            timeout: settings.render_timeout,
        })
    }

    /// Cancel anything still in flight and shut the browser down.
    pub async fn close(mut self) -> Result<()> {
        self.cancel.cancel();
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("waiting for browser exit: {e}");
        }
        self.events.abort();
        closed?;
        tracing::info!("headless browser stopped");
        Ok(())
    }

    /// A token that, once cancelled, aborts every page call in progress.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Renderer for RendererPool {
    type Page = ChromePage;

    async fn open_page(&self) -> Result<ChromePage> {
        let cancel = self.cancel.child_token();
        let page = guard(self.timeout, &cancel, self.browser.new_page("about:blank")).await?;
        Ok(ChromePage {
            page: Some(page),
            timeout: self.timeout,
            cancel,
        })
    }
}

/// Bound a browser call by the render timeout and the pool's shutdown.
async fn guard<T, E>(
    timeout: Duration,
    cancel: &CancellationToken,
    call: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    Error: From<E>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = tokio::time::timeout(timeout, call) => match res {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::Timeout(timeout)),
        },
    }
}

pub struct ChromePage {
    // Only `None` once closed.
    page: Option<Page>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ChromePage {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(Error::Cancelled)
    }

    async fn eval<T: DeserializeOwned>(&self, expr: String) -> Result<T> {
        let page = self.page()?;
        let result = guard(self.timeout, &self.cancel, page.evaluate(expr)).await?;
        Ok(result.into_value()?)
    }
}

fn print_params(options: &RenderOptions) -> PrintToPdfParams {
    let (width, height) = options.format.size_inches();
    PrintToPdfParams {
        print_background: Some(options.print_background),
        display_header_footer: Some(options.display_header_footer),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(options.margins.top_inches()),
        margin_bottom: Some(options.margins.bottom_inches()),
        header_template: options.header_template.clone(),
        footer_template: options.footer_template.clone(),
        ..Default::default()
    }
}

impl ReportPage for ChromePage {
    async fn load_html(&mut self, html: &str) -> Result<()> {
        let page = self.page()?;
        guard(self.timeout, &self.cancel, page.set_content(html)).await?;
        Ok(())
    }

    async fn print_pdf(&mut self, options: &RenderOptions) -> Result<Vec<u8>> {
        let page = self.page()?;
        guard(self.timeout, &self.cancel, page.pdf(print_params(options))).await
    }

    async fn toc_titles(&mut self) -> Result<Option<Vec<String>>> {
        let found: TocTitles = self.eval(dom::toc_titles_call()?).await?;
        Ok(found.titles)
    }

    async fn set_total_pages(&mut self, total: u32) -> Result<usize> {
        self.eval(dom::total_pages_call(total)?).await
    }

    async fn inject_page_numbers(&mut self, numbers: &[TocNumber]) -> Result<bool> {
        self.eval(dom::inject_call(numbers)?).await
    }

    async fn project(&mut self, projection: Projection) -> Result<Projected> {
        self.eval(dom::project_call(projection)?).await
    }

    async fn document_html(&mut self) -> Result<String> {
        self.eval(dom::document_html_call()?).await
    }

    async fn close(mut self) -> Result<()> {
        match self.page.take() {
            Some(page) => guard(self.timeout, &self.cancel, page.close()).await,
            None => Ok(()),
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!("closing abandoned page: {e}");
                    }
                });
            }
            Err(_) => tracing::warn!("page dropped outside the runtime; leaving it open"),
        }
    }
}
