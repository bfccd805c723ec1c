//! Declarative verification of HTTP services
//!
//! Scenarios written in YAML describe requests to issue and, through a
//! small matcher vocabulary, what the responses must look like. The engine
//! compiles them up front, runs them with bounded retries, and folds every
//! check into a four-valued severity lattice.

pub mod cli;
pub mod common;
pub mod compile;
pub mod context;
pub mod extract;
pub mod http;
pub mod run;
pub mod verify;

pub use common::{Error, Result};
pub use verify::Status;
