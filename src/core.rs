use crate::browser::BrowserSettings;
use crate::error::{Error, Result};
use crate::render::{Layout, Margins, PageFormat};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Config file looked for in the working directory when none is given.
pub const DEFAULT_CONFIG: &str = "tocpdf.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: PathBuf,
    pub page_format: PageFormat,
    pub print_background: bool,
    pub cover_margins: Margins,
    pub body_margins: Margins,
    pub render_timeout_secs: u64,
    pub max_concurrent_renders: usize,
    pub bind: SocketAddr,
    pub max_body_bytes: usize,
    pub chrome_executable: Option<PathBuf>,
    pub no_sandbox: bool,
}

impl Default for Config {
    fn default() -> Self {
        let layout = Layout::default();
        Self {
            input: "report.html".into(),
            page_format: layout.format,
            print_background: layout.print_background,
            cover_margins: layout.cover_margins,
            body_margins: layout.body_margins,
            render_timeout_secs: 60,
            max_concurrent_renders: 4,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: 100 * 1024 * 1024,
            chrome_executable: None,
            no_sandbox: false,
        }
    }
}

impl Config {
    /// Read the config file at `path`, or `tocpdf.toml` if there is one.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG), false),
        };
        match fs::read_to_string(path).await {
            // Only the implicit file may be missing.
            Err(ref e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(Error::io("reading config", path)(e)),
            Ok(s) => Self::parse(&s),
        }
    }

    pub fn parse(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn layout(&self) -> Layout {
        Layout {
            format: self.page_format,
            cover_margins: self.cover_margins,
            body_margins: self.body_margins,
            print_background: self.print_background,
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            chrome_executable: self.chrome_executable.clone(),
            no_sandbox: self.no_sandbox,
            render_timeout: Duration::from_secs(self.render_timeout_secs),
        }
    }
}

/// The files one report run reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub input: PathBuf,
}

impl Context {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Where the numbered HTML goes: `report.html` → `report_toc.html`,
    /// next to the input.
    pub fn numbered_path(&self) -> PathBuf {
        self.sibling("_toc", "html")
    }

    /// Where the final PDF goes: `report.html` → `report.pdf`.
    pub fn pdf_path(&self) -> PathBuf {
        self.sibling("", "pdf")
    }

    fn sibling(&self, suffix: &str, ext: &str) -> PathBuf {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        self.input.with_file_name(format!("{stem}{suffix}.{ext}"))
    }

    pub async fn read_input(&self) -> Result<String> {
        read_html(&self.input).await
    }

    pub async fn read_numbered(&self) -> Result<String> {
        read_html(&self.numbered_path()).await
    }

    pub async fn write_numbered(&self, html: &str) -> Result<PathBuf> {
        let path = self.numbered_path();
        write(&path, html.as_bytes()).await?;
        Ok(path)
    }

    pub async fn write_pdf(&self, pdf: &[u8]) -> Result<PathBuf> {
        let path = self.pdf_path();
        write(&path, pdf).await?;
        Ok(path)
    }
}

async fn read_html(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(Error::io("reading", path))
}

async fn write(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(Error::io("writing", path))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let ctx = Context::new("out/report.html");
        assert_eq!(ctx.numbered_path(), Path::new("out/report_toc.html"));
        assert_eq!(ctx.pdf_path(), Path::new("out/report.pdf"));
    }

    #[test]
    fn derived_paths_without_extension() {
        let ctx = Context::new("report");
        assert_eq!(ctx.numbered_path(), Path::new("report_toc.html"));
        assert_eq!(ctx.pdf_path(), Path::new("report.pdf"));
    }

    #[test]
    fn empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.input, Path::new("report.html"));
        assert_eq!(config.layout(), Layout::default());
        assert_eq!(config.max_body_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn partial_config() {
        let config = Config::parse(
            r#"
            page_format = "letter"
            render_timeout_secs = 5

            [body_margins]
            top_mm = 40
            bottom_mm = 20
            "#,
        )
        .unwrap();
        let layout = config.layout();
        assert_eq!(layout.format, PageFormat::Letter);
        assert_eq!(layout.body_margins, Margins::new(40.0, 20.0));
        assert_eq!(layout.cover_margins, Margins::new(20.0, 25.0));
        assert_eq!(
            config.browser_settings().render_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(matches!(
            Config::parse("pagefomat = \"a4\""),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn explicit_config_must_exist() {
        let err = Config::load(Some(Path::new("/nonexistent/tocpdf.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[tokio::test]
    async fn missing_input_reports_path() {
        let ctx = Context::new("/nonexistent/report.html");
        let err = ctx.read_input().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/report.html"));
    }
}
