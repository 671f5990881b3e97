//! Error types for the Kryon compiler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{file}:{line}: syntax error: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: semantic error: {message}")]
    Semantic {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: unresolved reference: {message}")]
    UnresolvedReference {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: cycle detected: {message}")]
    Cycle {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: value error: {message}")]
    ValueError {
        file: String,
        line: usize,
        message: String,
    },

    #[error("limit exceeded: {limit_type} (max {limit}, got {actual})")]
    LimitExceeded {
        limit_type: String,
        limit: usize,
        actual: usize,
    },

    #[error("include error: {message}")]
    Include { file: String, line: usize, message: String },

    #[error("internal compiler error: {message}")]
    InternalError { message: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn syntax(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax { file: file.into(), line, message: message.into() }
    }

    pub fn semantic(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Semantic { file: file.into(), line, message: message.into() }
    }

    pub fn unresolved(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::UnresolvedReference { file: file.into(), line, message: message.into() }
    }

    pub fn cycle(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Cycle { file: file.into(), line, message: message.into() }
    }

    pub fn value(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ValueError { file: file.into(), line, message: message.into() }
    }

    pub fn include(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Include { file: file.into(), line, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    pub fn limit(limit_type: impl Into<String>, limit: usize, actual: usize) -> Self {
        Self::LimitExceeded { limit_type: limit_type.into(), limit, actual }
    }

    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { path: path.into(), message: message.into() }
    }
}
