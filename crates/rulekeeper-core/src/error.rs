use std::path::PathBuf;

use thiserror::Error;

/// Failures of the rule pipeline, one variant per failure category.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The manifest exists but is not shaped like a manifest.
    #[error("invalid manifest {}: {message}", .path.display())]
    Configuration { path: PathBuf, message: String },

    /// A rule document failed validation. Fatal for the whole load.
    #[error("invalid rule document {}: {message}", .path.display())]
    Document { path: PathBuf, message: String },

    /// Malformed request, rejected before any loading happens.
    #[error("invalid request: {0}")]
    Request(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking loader task panicked or was cancelled.
    #[error("rule loading task failed: {0}")]
    Task(String),
}

impl RulesError {
    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

pub type Result<T> = std::result::Result<T, RulesError>;
