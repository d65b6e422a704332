//! Domain-specific errors for the install pipeline

use thiserror::Error;

use crate::core::recipe::RecipeError;
use crate::io::extract::ExtractError;
use crate::io::link::LinkError;

/// Everything that can fail a single package's pipeline. Each error is
/// caught at the pipeline level, reported on that package's terminal
/// line, and never aborts a sibling pipeline.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("{0}")]
    InvalidSpec(String),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error("no {platform} build of '{name}' is available")]
    UnsupportedPlatform { name: String, platform: String },

    /// The downloader already wrote the specific message on the line
    #[error("download failed")]
    Download,

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("no executable files found in {name}@{version}")]
    NoExecutableFound { name: String, version: String },

    #[error(transparent)]
    LinkCreation(#[from] LinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Whether the failure was already reported on the owning line
    /// (keeps each line's final content to exactly one message).
    pub fn already_reported(&self) -> bool {
        matches!(self, Self::Download)
    }
}
