use thiserror::Error;

/// One top-level error enum per crate boundary, the way the workspace this
/// engine is modeled on keeps a single error type per layer. Every command
/// body converts whatever went wrong into one of these variants; nothing in
/// the core panics on malformed input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Exists(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("validation failed for columns: {columns:?}: {message}")]
    ValidationFailure { columns: Vec<String>, message: String },

    #[error("expression error: {0}")]
    ExpressionError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("bad parameter: {0}")]
    BadParameter(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }

    pub fn exists(what: impl Into<String>) -> Self {
        EngineError::Exists(what.into())
    }

    pub fn type_mismatch(what: impl Into<String>) -> Self {
        EngineError::TypeMismatch(what.into())
    }

    pub fn validation_failure(columns: Vec<String>, message: impl Into<String>) -> Self {
        EngineError::ValidationFailure { columns, message: message.into() }
    }

    pub fn expression(what: impl Into<String>) -> Self {
        EngineError::ExpressionError(what.into())
    }

    pub fn bad_parameter(what: impl Into<String>) -> Self {
        EngineError::BadParameter(what.into())
    }
}
