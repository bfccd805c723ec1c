//! Error types for the verification engine and CLI
//!
//! Outcome failures (a mismatched predicate, a refused connection) are data
//! and never surface here; this type covers compilation problems,
//! construction-time configuration mistakes, and evaluation faults that
//! abort a run.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the verification engine
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === Compilation Errors ===
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Analysis/Extraction Errors ===
    // Recovered into FAILURE verifications by descriptions, never fatal.
    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    // === Evaluation Faults ===
    // A matcher was handed a value outside its type domain. Deliberately
    // not folded into a verification: escapes to the scheduler's caller.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a compilation error with an empty node path
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(CompileError::new(message))
    }

    /// Attach a named path node to a compilation error.
    ///
    /// Non-compilation errors (e.g. a YAML shape mismatch) are converted
    /// first so that every error escaping the compiler carries a path.
    pub fn at_key(self, key: &str) -> Self {
        Self::Compile(self.into_compile().on_key(key))
    }

    /// Attach an indexed path node to a compilation error
    pub fn at_index(self, index: usize) -> Self {
        Self::Compile(self.into_compile().on_index(index))
    }

    fn into_compile(self) -> CompileError {
        match self {
            Self::Compile(e) => e,
            other => CompileError::new(other.to_string()),
        }
    }
}

/// A compilation failure annotated with the path of the node it occurred
/// at, rendered like `.cases[0].response.body[1]`
#[derive(Debug, Clone)]
pub struct CompileError {
    message: String,
    path: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
        }
    }

    /// Prepend a named node to the path
    pub fn on_key(mut self, key: &str) -> Self {
        self.path = format!(".{}{}", key, self.path);
        self
    }

    /// Prepend an indexed node to the path
    pub fn on_index(mut self, index: usize) -> Self {
        self.path = format!("[{}]{}", index, self.path);
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.path)
        }
    }
}

impl std::error::Error for CompileError {}
