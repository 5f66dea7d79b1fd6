use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Predicting requires a completed training run; there is no fallback.
    #[error("no trained model for user {user}: missing {path:?}")]
    ModelsMissing { user: String, path: PathBuf },

    #[error("graph query failed: {0}")]
    Graph(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
