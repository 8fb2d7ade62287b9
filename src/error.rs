use thiserror::Error;

/// Errors surfaced by the explorer.
///
/// Row-level problems (missing titles, unparseable dates) and words that do not
/// fit the canvas are never errors; they are reported in the cleaning report and
/// the layout instead. Only invalid configuration aborts a run before any work
/// is done. The remaining variants come from the loader and exporter.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no input: {0}")]
    NoInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ExplorerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ExplorerError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
