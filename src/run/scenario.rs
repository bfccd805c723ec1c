//! Scenario trees: ordered or concurrent case lists plus nested
//! subscenarios

use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde::Serialize;
use time::OffsetDateTime;

use crate::common::Result;
use crate::context::Context;
use crate::http::Transport;
use crate::run::case::{verify_conditions, Case, CaseResult, CaseRunner};
use crate::run::listener::Listener;
use crate::verify::{Description, Status, Statused, StatusedList, Verification};

/// A compiled scenario: preconditions, cases, and nested subscenarios.
/// Scenarios form a tree, enforced acyclic by construction.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub label: Option<String>,
    pub ordered: bool,
    pub conditions: Vec<Description>,
    pub cases: Vec<Case>,
    pub subscenarios: Vec<Scenario>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            label: None,
            ordered: true,
            conditions: Vec::new(),
            cases: Vec::new(),
            subscenarios: Vec::new(),
        }
    }
}

/// Result of one scenario run, mirroring the scenario tree
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub conditions: Verification,
    pub cases: StatusedList<CaseResult>,
    pub subscenarios: StatusedList<ScenarioResult>,
}

impl ScenarioResult {
    /// A pre-built failure, used when a scenario cannot even be
    /// constructed (e.g. its file does not compile)
    pub fn failure(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            status: Status::Failure,
            message: Some(message.into()),
            conditions: Verification::skipped(),
            cases: StatusedList::default(),
            subscenarios: StatusedList::default(),
        }
    }
}

impl Statused for ScenarioResult {
    fn status(&self) -> Status {
        self.status
    }
}

/// Runs a scenario tree. Each scenario gets a fresh context originating at
/// its own start instant; cases honor the `ordered` flag while subscenarios
/// always run concurrently.
pub struct ScenarioRunner<T> {
    cases: CaseRunner<T>,
    base_url: String,
}

impl<T: Transport> ScenarioRunner<T> {
    pub fn new(cases: CaseRunner<T>, base_url: impl Into<String>) -> Self {
        Self {
            cases,
            base_url: base_url.into(),
        }
    }

    pub async fn run(
        &self,
        scenario: &Scenario,
        listener: &dyn Listener,
    ) -> Result<ScenarioResult> {
        self.run_scenario(scenario, listener).await
    }

    // Boxed for recursion through subscenarios.
    fn run_scenario<'a>(
        &'a self,
        scenario: &'a Scenario,
        listener: &'a dyn Listener,
    ) -> BoxFuture<'a, Result<ScenarioResult>> {
        async move {
            let context = Context::new(OffsetDateTime::now_utc())
                .with_value("base_url", self.base_url.clone());

            let condition_results = verify_conditions(&scenario.conditions, &context)?;
            if let Some(blocker) = condition_results
                .iter()
                .find(|v| v.status != Status::Success)
            {
                // Nothing is submitted: cases and subscenarios stay empty,
                // the scenario takes the first unsatisfied condition status.
                let status = blocker.status;
                return Ok(ScenarioResult {
                    label: scenario.label.clone(),
                    status,
                    message: None,
                    conditions: Verification::collect(condition_results),
                    cases: StatusedList::default(),
                    subscenarios: StatusedList::default(),
                });
            }
            let conditions = Verification::collect(condition_results);

            let run_cases = async {
                if scenario.ordered {
                    let mut results = Vec::with_capacity(scenario.cases.len());
                    for case in &scenario.cases {
                        results.push(self.cases.run(case, &context, listener).await?);
                    }
                    Ok(results)
                } else {
                    let futures = scenario
                        .cases
                        .iter()
                        .map(|case| self.cases.run(case, &context, listener));
                    join_all(futures).await.into_iter().collect()
                }
            };
            let run_subscenarios = join_all(
                scenario
                    .subscenarios
                    .iter()
                    .map(|subscenario| self.run_scenario(subscenario, listener)),
            );

            let (case_results, subscenario_results) = tokio::join!(run_cases, run_subscenarios);
            let cases = StatusedList::collect(case_results?);
            let subscenarios = StatusedList::collect(
                subscenario_results
                    .into_iter()
                    .collect::<Result<Vec<_>>>()?,
            );

            let status = Status::merge_all([conditions.status, cases.status, subscenarios.status]);
            Ok(ScenarioResult {
                label: scenario.label.clone(),
                status,
                message: None,
                conditions,
                cases,
                subscenarios,
            })
        }
        .boxed()
    }
}
