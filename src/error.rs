use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("layout is missing required boundaries: {}", .missing.join(", "))]
    MissingBoundary { missing: Vec<&'static str> },

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("text recognition failed: {0}")]
    Ocr(String),

    #[error("renderer backend unavailable: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid layout template: {0}")]
    Template(#[from] serde_json::Error),
}

impl Error {
    /// Failures local to a single batch item; everything else aborts the batch
    /// before it starts.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Error::Render(_) | Error::Ocr(_))
    }
}
