use std::path::PathBuf;
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not launch headless browser: {0}")]
    Launch(String),

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("unexpected result from page script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("browser did not respond within {0:?}")]
    Timeout(Duration),

    #[error("render cancelled")]
    Cancelled,

    #[error("malformed PDF: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("PDF has no pages")]
    EmptyDocument,

    #[error("merge needs exactly 2 PDFs (cover and body), got {0}")]
    MergeArity(usize),

    #[error("could not serialize PDF: {0}")]
    Serialize(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io {
            action,
            path,
            source,
        }
    }
}
