use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Fetch failed for '{symbol}' after {attempts} attempts: {reason}")]
    FetchFailure {
        symbol: String,
        attempts: usize,
        reason: String,
    },

    #[error("Insufficient data: need {required} observations, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Computation precondition failed: {0}")]
    ComputationPrecondition(String),

    #[error("Series alignment error: {0}")]
    Alignment(String),

    #[error("Notification error: {0}")]
    NotifyError(String),

    #[error("Internal processing error: {0}")]
    ProcessingError(String),

    // Catch-all for anyhow errors coming out of adapter parsing code.
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

/// How the top-level run boundary treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Upstream data unavailable; report through the failure channel if one is configured.
    Abort,
    /// Expected during warm-up; log only.
    WarmUp,
    /// Anything else; log as an error.
    Fault,
}

impl EngineError {
    pub fn disposition(&self) -> Disposition {
        match self {
            EngineError::FetchFailure { .. } => Disposition::Abort,
            EngineError::InsufficientData { .. } | EngineError::ComputationPrecondition(_) => Disposition::WarmUp,
            _ => Disposition::Fault,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
