//! The unified error taxonomy for the compiler. Every subsystem boundary
//! returns this one flat enum rather than nesting per-module error types,
//! mirroring the teacher crate's single `SemanticError`/`WorkerError`
//! pattern.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SemLayerError {
    #[error("unknown cube: {0}")]
    UnknownCube(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("ambiguous join path from {from} to {to}: {detail}")]
    AmbiguousJoin {
        from: String,
        to: String,
        detail: String,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("dialect {dialect} does not support {feature}")]
    UnsupportedDialectFeature { dialect: String, feature: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("result decode error: {0}")]
    ResultDecodeError(String),
}

impl SemLayerError {
    /// The abstract kind name used in the `{"error": "<kind>", ...}` wire
    /// envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            SemLayerError::UnknownCube(_) => "UnknownCube",
            SemLayerError::UnknownField(_) => "UnknownField",
            SemLayerError::AmbiguousJoin { .. } => "AmbiguousJoin",
            SemLayerError::InvalidFilter(_) => "InvalidFilter",
            SemLayerError::InvalidDateRange(_) => "InvalidDateRange",
            SemLayerError::UnsupportedDialectFeature { .. } => "UnsupportedDialectFeature",
            SemLayerError::ExecutionFailed(_) => "ExecutionFailed",
            SemLayerError::ResultDecodeError(_) => "ResultDecodeError",
        }
    }

    /// HTTP status code an illustrative transport should map this to.
    pub fn http_status(&self) -> u16 {
        match self {
            SemLayerError::UnknownCube(_)
            | SemLayerError::UnknownField(_)
            | SemLayerError::AmbiguousJoin { .. }
            | SemLayerError::InvalidFilter(_)
            | SemLayerError::InvalidDateRange(_) => 400,
            SemLayerError::UnsupportedDialectFeature { .. } => 422,
            SemLayerError::ExecutionFailed(_) | SemLayerError::ResultDecodeError(_) => 500,
        }
    }
}
