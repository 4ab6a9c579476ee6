//! Error types for casting, evaluation and compilation.

use crate::value::Kind;
use thiserror::Error;

/// A value could not be coerced to the requested kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    #[error("type cast failure, unexpected type: {0}")]
    UnknownKind(String),

    #[error("type cast failure, cannot convert {from} to {to}")]
    Unsupported { from: &'static str, to: Kind },

    #[error("type cast failure, invalid {to} value {text:?}")]
    Malformed { text: String, to: Kind },

    #[error("type cast failure, unsupported context value: {0}")]
    Unrepresentable(String),
}

/// Failure while parsing or evaluating expression text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument { function: String, reason: String },
}

/// Failure while lowering a condition tree.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid node '{path}': {reason}")]
    InvalidNode { path: String, reason: String },

    #[error("node '{path}' has no children")]
    MissingChildren { path: String },

    #[error("children of '{path}' is not an array")]
    ChildrenNotArray { path: String },

    #[error("children of '{path}' is empty")]
    EmptyChildren { path: String },

    #[error("child '{path}' is not an object")]
    ChildNotObject { path: String },

    #[error("leaf '{path}' is missing '{key}'")]
    MissingKey { path: String, key: &'static str },

    #[error("leaf '{path}' has unknown operator '{op}'")]
    UnknownOperator { path: String, op: String },

    #[error("leaf '{path}' has invalid value: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("condition tree is nested too deeply at '{path}'")]
    TooDeep { path: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
