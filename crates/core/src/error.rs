use std::sync::Arc;

use thiserror::Error;

/// Cloneable so one failed load can be reported on every request that
/// depended on it.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Cannot pair animal '{0}' with itself")]
    InvalidPair(String),

    #[error("Species mismatch: '{left}' vs '{right}'")]
    SpeciesMismatch { left: String, right: String },

    #[error("Locus '{0}' is not in the species locus catalog")]
    UnknownLocus(String),

    #[error("Animal '{0}' not found")]
    AnimalNotFound(String),

    #[error("Het probability {percent} for locus '{locus}' is outside 0-100%")]
    InvalidProbability { locus: String, percent: f64 },

    #[error("Invalid locus catalog: {0}")]
    InvalidCatalog(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Pedigree error: {0}")]
    Pedigree(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("CSV error: {0}")]
    Csv(#[source] Arc<csv::Error>),

    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(Arc::new(e))
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Csv(Arc::new(e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Json(Arc::new(e))
    }
}

impl EngineError {
    /// Whether retrying the same request could succeed.
    ///
    /// Only repository failures are transient; every other error is permanent
    /// for the given input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::DataUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
