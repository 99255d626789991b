use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlashError {
    #[error("invalid size or offset '{token}': {reason}")]
    Parse { token: String, reason: String },

    #[error("partition '{name}' not found in {}", table.display())]
    PartitionNotFound { name: String, table: PathBuf },

    #[error("data directory not found: {}", .0.display())]
    MissingSourceDirectory(PathBuf),

    #[error("{tool} not found at {}", path.display())]
    ToolNotFound { tool: String, path: PathBuf },

    #[error("{tool} failed ({status}): {stderr}")]
    ToolExecutionFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FlashError {
    pub(crate) fn parse(token: &str, reason: impl Into<String>) -> Self {
        FlashError::Parse {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlashError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type FlashResult<T> = Result<T, FlashError>;
