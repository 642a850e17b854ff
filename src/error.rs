use thiserror::Error;

/// Errors surfaced by the spectrogram engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// FFT size or hop size rejected before analysis started.
    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),
    /// The input could not be analyzed; callers fall back to the placeholder view.
    #[error("spectrogram unavailable: {0}")]
    AnalysisUnavailable(String),
    /// Label times out of range or with a non-positive duration.
    #[error("label bounds violation: {0}")]
    BoundsViolation(String),
    /// The analysis was superseded by a newer load.
    #[error("analysis cancelled")]
    Cancelled,
    #[error("unknown category key {0:?}")]
    UnknownCategory(String),
    #[error("category limit of {0} reached")]
    CategoryLimit(usize),
    #[error("export error: {0}")]
    Export(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
