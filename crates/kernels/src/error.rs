//! Errors raised while turning a winner record into kernel parameters.

use thiserror::Error;

/// The record text does not follow the kernel descriptor grammar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("no `Kernel_dnt_` descriptor found")]
    MissingDescriptor,

    #[error("expected {expected} at byte {position}, found {found}")]
    Syntax {
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("invalid literal '{literal}' for parameter '{key}'")]
    InvalidLiteral { key: String, literal: String },

    #[error("unterminated string starting at byte {position}")]
    UnterminatedString { position: usize },

    #[error("parameter '{0}' given more than once")]
    DuplicateKey(String),

    #[error("parameter '{0}' is reserved for the measured throughput")]
    ReservedKey(String),

    #[error("invalid throughput '{0}'")]
    InvalidThroughput(String),

    #[error("unsupported throughput unit '{0}', expected GFlop/s")]
    UnsupportedUnit(String),
}

/// The decoded fields do not satisfy any registered schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("unknown kernel algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("fields do not match the '{algorithm}' schema: {reason}")]
    InvalidFields { algorithm: String, reason: String },

    #[error("'{algorithm}' parameters rejected: {reason}")]
    Constraint { algorithm: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
