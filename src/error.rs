use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no path found")]
    NoPathFound,
    #[error("flow network did not separate within the iteration bound")]
    InfeasibleNetwork,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("stale reference: {0}")]
    StaleReference(String),
    #[error("spawn capacity exhausted")]
    CapacityExhausted,
    #[error("inconsistent cache: {0}")]
    InconsistentCache(String),
    #[error("codec failure: {0}")]
    Codec(String),
}

impl EngineError {
    /// Every error other than a broken cache is expected to self-correct on a later tick.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::InconsistentCache(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
