//! Observer seam for execution progress

use crate::common::Result;
use crate::http::{ExecutionReport, Response};
use crate::run::scenario::ScenarioResult;
use crate::verify::Status;

/// Observes engine progress. Every hook defaults to a no-op so
/// implementations override only what they present.
pub trait Listener: Send + Sync {
    /// Called after every HTTP attempt, retried ones included
    fn on_execution(&self, _report: &ExecutionReport, _response: Option<&Response>) {}

    /// Called as each top-level scenario completes
    fn on_scenario(&self, _result: &ScenarioResult) {}

    /// Called exactly once, with the overall merged status
    fn on_end(&self, _overall: Status) -> Result<()> {
        Ok(())
    }
}

impl<T: Listener + ?Sized> Listener for std::sync::Arc<T> {
    fn on_execution(&self, report: &ExecutionReport, response: Option<&Response>) {
        (**self).on_execution(report, response)
    }

    fn on_scenario(&self, result: &ScenarioResult) {
        (**self).on_scenario(result)
    }

    fn on_end(&self, overall: Status) -> Result<()> {
        (**self).on_end(overall)
    }
}

/// Fans each notification out to the registered listeners, in registration
/// order
#[derive(Default)]
pub struct MergingListener {
    listeners: Vec<Box<dyn Listener>>,
}

impl MergingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: impl Listener + 'static) {
        self.listeners.push(Box::new(listener));
    }
}

impl Listener for MergingListener {
    fn on_execution(&self, report: &ExecutionReport, response: Option<&Response>) {
        for listener in &self.listeners {
            listener.on_execution(report, response);
        }
    }

    fn on_scenario(&self, result: &ScenarioResult) {
        for listener in &self.listeners {
            listener.on_scenario(result);
        }
    }

    fn on_end(&self, overall: Status) -> Result<()> {
        for listener in &self.listeners {
            listener.on_end(overall)?;
        }
        Ok(())
    }
}
