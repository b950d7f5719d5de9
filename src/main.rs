mod assets;
mod browser;
mod core;
mod dom;
mod error;
mod pdf;
mod pipeline;
mod render;
mod serve;
mod split;
mod toc;

use crate::browser::RendererPool;
use crate::core::{Config, Context};
use anyhow::Result;
use argh::FromArgs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Number the table of contents of an HTML report and print it to PDF.
struct TopLevel {
    /// config file (default: tocpdf.toml, if present)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Html(HtmlCommand),
    Pdf(PdfCommand),
    Build(BuildCommand),
    Serve(ServeCommand),
}

#[derive(FromArgs)]
/// Write <stem>_toc.html with page numbers filled in.
#[argh(subcommand, name = "html")]
struct HtmlCommand {
    /// input report (default: from config)
    #[argh(positional)]
    input: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Render <stem>_toc.html to <stem>.pdf.
#[argh(subcommand, name = "pdf")]
struct PdfCommand {
    /// input report (default: from config)
    #[argh(positional)]
    input: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Number and render in one go.
#[argh(subcommand, name = "build")]
struct BuildCommand {
    /// input report (default: from config)
    #[argh(positional)]
    input: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Serve the pipeline over HTTP.
#[argh(subcommand, name = "serve")]
struct ServeCommand {
    /// address to listen on (default: from config)
    #[argh(option)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: TopLevel = argh::from_env();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TopLevel) -> Result<()> {
    let mut config = Config::load(args.config.as_deref()).await?;
    let input = |given: Option<PathBuf>| Context::new(given.unwrap_or_else(|| config.input.clone()));
    let job = match args.command {
        Command::Html(c) => Job::Html(input(c.input)),
        Command::Pdf(c) => Job::Pdf(input(c.input)),
        Command::Build(c) => Job::Build(input(c.input)),
        Command::Serve(c) => Job::Serve(c.bind),
    };
    if let Job::Serve(Some(bind)) = job {
        config.bind = bind;
    }

    let pool = Arc::new(RendererPool::launch(&config.browser_settings()).await?);
    let result = execute(job, &pool, &config).await;

    match Arc::try_unwrap(pool) {
        Ok(pool) => {
            if let Err(e) = pool.close().await {
                tracing::warn!("closing browser: {e}");
            }
        }
        Err(_) => tracing::warn!("browser still in use at exit"),
    }
    result
}

enum Job {
    Html(Context),
    Pdf(Context),
    Build(Context),
    Serve(Option<SocketAddr>),
}

async fn execute(job: Job, pool: &Arc<RendererPool>, config: &Config) -> Result<()> {
    let layout = config.layout();
    match job {
        Job::Html(ctx) => {
            let html = ctx.read_input().await?;
            let report = pipeline::number_toc(pool.as_ref(), &html, &layout).await?;
            ctx.write_numbered(&report.html).await?;
        }
        Job::Pdf(ctx) => {
            let html = ctx.read_numbered().await?;
            let pdf = pipeline::render_pdf(pool.as_ref(), &html, None, &layout).await?;
            ctx.write_pdf(&pdf).await?;
        }
        Job::Build(ctx) => {
            let html = ctx.read_input().await?;
            let (report, pdf) = pipeline::build(pool.as_ref(), &html, &layout).await?;
            ctx.write_numbered(&report.html).await?;
            ctx.write_pdf(&pdf).await?;
        }
        Job::Serve(_) => serve::serve(pool.clone(), config, pool.cancel_token()).await?,
    }
    Ok(())
}
