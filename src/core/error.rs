//! Error types for the flow scoring core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    /// Malformed or expired contract parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No contracts for a ticker
    #[error("Empty chain: {0}")]
    EmptyChain(String),

    /// Required derived data (Greeks, exposure entry) missing for a contract
    #[error("Incomplete input: {0}")]
    IncompleteInput(String),

    /// Not enough history for a statistical detector
    #[error("Insufficient baseline: {0}")]
    InsufficientBaseline(String),

    /// Regime cannot be classified; fatal to the whole cycle
    #[error("Regime unavailable: {0}")]
    RegimeUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type FlowResult<T> = Result<T, FlowError>;

impl FlowError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn empty_chain(msg: impl Into<String>) -> Self {
        Self::EmptyChain(msg.into())
    }

    pub fn incomplete_input(msg: impl Into<String>) -> Self {
        Self::IncompleteInput(msg.into())
    }

    pub fn insufficient_baseline(msg: impl Into<String>) -> Self {
        Self::InsufficientBaseline(msg.into())
    }

    pub fn regime_unavailable(msg: impl Into<String>) -> Self {
        Self::RegimeUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors that only invalidate one contract and never the cycle
    pub fn is_contract_scoped(&self) -> bool {
        matches!(
            self,
            FlowError::InvalidInput(_)
                | FlowError::IncompleteInput(_)
                | FlowError::InsufficientBaseline(_)
        )
    }

    /// Short machine-readable tag, used in rejection records
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::InvalidInput(_) => "invalid_input",
            FlowError::EmptyChain(_) => "empty_chain",
            FlowError::IncompleteInput(_) => "incomplete_input",
            FlowError::InsufficientBaseline(_) => "insufficient_baseline",
            FlowError::RegimeUnavailable(_) => "regime_unavailable",
            FlowError::Config(_) => "config",
            FlowError::Io(_) => "io",
            FlowError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        FlowError::Serialization(e.to_string())
    }
}
