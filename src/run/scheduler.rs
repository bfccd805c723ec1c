//! Bounded-concurrency scheduling of top-level scenarios

use futures_util::stream::{self, StreamExt};

use crate::common::{Error, Result};
use crate::http::Transport;
use crate::run::listener::Listener;
use crate::run::scenario::{Scenario, ScenarioResult, ScenarioRunner};
use crate::verify::Status;

/// Runs top-level scenarios concurrently and drives the listener: one
/// `on_scenario` per completion, one `on_end` with the merged status.
pub struct ScenarioScheduler<T> {
    runner: ScenarioRunner<T>,
    concurrency: usize,
}

impl<T: Transport> ScenarioScheduler<T> {
    pub fn new(runner: ScenarioRunner<T>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::Config("concurrency must be positive".into()));
        }
        Ok(Self {
            runner,
            concurrency,
        })
    }

    /// Run every item to completion. Compiled scenarios execute; pre-built
    /// results (e.g. compile failures) pass straight through to the
    /// aggregation. Scenario failures are data, not errors: only engine
    /// faults return `Err`. An empty input is a vacuous SUCCESS.
    pub async fn run<I>(&self, items: I, listener: &dyn Listener) -> Result<Status>
    where
        I: IntoIterator<Item = std::result::Result<Scenario, ScenarioResult>>,
    {
        let mut results = stream::iter(items)
            .map(|item| async move {
                match item {
                    Ok(scenario) => self.runner.run(&scenario, listener).await,
                    Err(prebuilt) => Ok(prebuilt),
                }
            })
            .buffer_unordered(self.concurrency);

        let mut overall: Option<Status> = None;
        while let Some(result) = results.next().await {
            let result = result?;
            overall = Some(match overall {
                Some(merged) => merged.merge(result.status),
                None => result.status,
            });
            listener.on_scenario(&result);
        }
        let overall = overall.unwrap_or(Status::Success);
        listener.on_end(overall)?;
        Ok(overall)
    }
}
