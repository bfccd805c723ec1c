//! HTTP layer: request templates, the transport seam, and attempt reports

pub mod request;
pub mod requester;
pub mod response;

pub use request::{Method, ParamValue, PreparedRequest, Request};
pub use requester::{Requester, Transport};
pub use response::{ExecutionReport, Response};
