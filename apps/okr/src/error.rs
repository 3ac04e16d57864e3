//! Application errors.

use okr_core::{ErrorKind, OkrError};
use std::path::PathBuf;

/// Everything that can stop a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Okr(#[from] OkrError),

    #[error("Cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data file: {0}")]
    Data(#[from] serde_json::Error),

    #[error("Invalid config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot write output: {0}")]
    Output(std::io::Error),
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code: 2 for bad input, 3 forbidden, 4 not found,
    /// 5 conflict, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Okr(err) => match err.kind() {
                ErrorKind::BadRequest => 2,
                ErrorKind::Forbidden => 3,
                ErrorKind::NotFound => 4,
                ErrorKind::Conflict => 5,
                ErrorKind::Internal => 1,
            },
            AppError::Config { .. } => 2,
            AppError::Io { .. } | AppError::Data(_) | AppError::Output(_) => 1,
        }
    }
}
