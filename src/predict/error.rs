use thiserror::Error;

/// Failure reported by a [`PropagationEngine`](crate::predict::engine::PropagationEngine).
#[derive(Debug, Error)]
pub enum PropagationError {
    /// The satellite does not rise (or never sets) for the observer within
    /// the engine's look-ahead horizon, e.g. a geostationary orbit.
    #[error("satellite is never visible from the observer")]
    NeverVisible,
    #[error("propagation failed: {0}")]
    Failed(String),
}

impl From<sgp4::Error> for PropagationError {
    fn from(err: sgp4::Error) -> Self {
        PropagationError::Failed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Truncated TLE record in {file} at line {line}")]
    TruncatedRecord { file: String, line: usize },
    #[error("Invalid TLE for {name} in {file}: {message}")]
    InvalidTle {
        file: String,
        name: String,
        message: String,
    },
    #[error("Propagation error for {satellite}: {source}")]
    Propagation {
        satellite: String,
        #[source]
        source: PropagationError,
    },
}
