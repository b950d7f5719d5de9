use crate::core::Config;
use crate::pipeline;
use crate::render::{Layout, Renderer};
use anyhow::Context as _;
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

type HandlerResult<T> = Result<T, (StatusCode, String)>;

struct AppState<R> {
    renderer: Arc<R>,
    layout: Arc<Layout>,
    // One permit per pipeline run.
    permits: Arc<Semaphore>,
}

// Derived `Clone` would needlessly require `R: Clone`.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: self.renderer.clone(),
            layout: self.layout.clone(),
            permits: self.permits.clone(),
        }
    }
}

impl<R> AppState<R> {
    fn new(renderer: Arc<R>, config: &Config) -> Self {
        Self {
            renderer,
            layout: Arc::new(config.layout()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_renders.max(1))),
        }
    }

    async fn permit(&self) -> HandlerResult<SemaphorePermit<'_>> {
        self.permits.acquire().await.map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "server is shutting down".to_string(),
            )
        })
    }
}

fn router<R: Renderer>(state: AppState<R>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/html", post(html::<R>))
        .route("/pdf", post(pdf::<R>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve the pipeline over HTTP until Ctrl-C. Shutting down cancels
/// `shutdown`, which aborts renders still in progress.
pub async fn serve<R: Renderer>(
    renderer: Arc<R>,
    config: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(AppState::new(renderer, config), config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("could not bind {}", config.bind))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("could not listen for Ctrl-C: {e}");
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await
        .context("server error")
}

fn require_body(body: &str) -> HandlerResult<()> {
    if body.trim().is_empty() {
        Err((StatusCode::BAD_REQUEST, "request body is empty".into()))
    } else {
        Ok(())
    }
}

fn failed(what: &str) -> impl FnOnce(crate::error::Error) -> (StatusCode, String) {
    move |e| {
        tracing::error!("{what} failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{what} failed: {e}"))
    }
}

/// Number the table of contents of the posted report.
async fn html<R: Renderer>(
    State(state): State<AppState<R>>,
    body: String,
) -> HandlerResult<Html<String>> {
    tracing::info!("POST /html ({} bytes)", body.len());
    require_body(&body)?;

    let _permit = state.permit().await?;
    let report = pipeline::number_toc(state.renderer.as_ref(), &body, &state.layout)
        .await
        .map_err(failed("numbering"))?;
    Ok(Html(report.html))
}

/// Render a numbered report to PDF.
async fn pdf<R: Renderer>(
    State(state): State<AppState<R>>,
    body: String,
) -> HandlerResult<Response> {
    tracing::info!("POST /pdf ({} bytes)", body.len());
    require_body(&body)?;

    let _permit = state.permit().await?;
    let pdf = pipeline::render_pdf(state.renderer.as_ref(), &body, None, &state.layout)
        .await
        .map_err(failed("rendering"))?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::make_pdf;
    use crate::render::fake::FakeRenderer;

    fn state(renderer: &FakeRenderer) -> AppState<FakeRenderer> {
        AppState::new(Arc::new(renderer.clone()), &Config::default())
    }

    #[tokio::test]
    async fn empty_body_is_rejected_before_rendering() {
        let renderer = FakeRenderer::new(None, vec![]);
        for body in ["", "  \n\t "] {
            let (status, _) = html(State(state(&renderer)), body.to_string())
                .await
                .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let (status, _) = pdf(State(state(&renderer)), body.to_string())
                .await
                .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert_eq!(renderer.with(|s| s.pages_opened), 0);
    }

    #[tokio::test]
    async fn html_returns_numbered_report() {
        let renderer = FakeRenderer::new(
            Some(&["Intro"]),
            vec![
                make_pdf(&[&["Cover"]]),
                make_pdf(&[&["Cover"], &["Intro"], &["Intro", " text"]]),
            ],
        );
        let Html(body) = html(State(state(&renderer)), "<report>".into())
            .await
            .unwrap();
        assert_eq!(body, "numbered:<report>");
    }

    #[tokio::test]
    async fn pdf_has_content_type() {
        let renderer = FakeRenderer::new(
            None,
            vec![
                make_pdf(&[&["Cover"]]),
                make_pdf(&[&["Cover"]]),
                make_pdf(&[&["toc"], &[], &["body"]]),
            ],
        );
        let response = pdf(State(state(&renderer)), "<report>".into())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
    }

    #[tokio::test]
    async fn pipeline_failure_is_server_error() {
        let renderer = FakeRenderer::new(None, vec![]);
        let (status, message) = pdf(State(state(&renderer)), "<report>".into())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("rendering failed"));
    }

    #[tokio::test]
    async fn closed_semaphore_is_unavailable() {
        let renderer = FakeRenderer::new(None, vec![]);
        let state = state(&renderer);
        state.permits.close();
        let (status, _) = html(State(state), "<report>".into()).await.unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn router_builds() {
        let renderer = FakeRenderer::new(None, vec![]);
        let _ = router(state(&renderer), 1024);
    }
}
