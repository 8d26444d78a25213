use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a corpus into an index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read corpus {path}: {source}")]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing tab between document id and text")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid document id {raw:?}")]
    InvalidDocId { line: usize, raw: String },

    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Malformed lines only cost that document; everything else stops the build.
    pub fn is_line_error(&self) -> bool {
        matches!(
            self,
            Error::MissingSeparator { .. } | Error::InvalidDocId { .. } | Error::InvalidUtf8 { .. }
        )
    }
}
