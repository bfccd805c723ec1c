//! Common utilities shared across the engine and the CLI

pub mod error;
pub mod logging;

pub use error::{CompileError, Error, Result};
