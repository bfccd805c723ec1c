//! One request/response verification unit

use std::time::Duration;

use serde::Serialize;

use crate::common::Result;
use crate::context::Context;
use crate::extract::Analyzer;
use crate::http::{ExecutionReport, Request, Transport};
use crate::run::listener::Listener;
use crate::run::unit::UnitRunner;
use crate::verify::{
    Description, ResponseDescription, ResponseVerification, Status, Statused, Verification,
};

/// A compiled case: preconditions, a request template, and the response
/// requirement. Immutable, produced by the compiler.
#[derive(Debug, Clone)]
pub struct Case {
    pub label: Option<String>,
    pub enabled: bool,
    pub conditions: Vec<Description>,
    pub wait: Option<Duration>,
    pub request: Request,
    pub response: ResponseDescription,
}

impl Default for Case {
    fn default() -> Self {
        Self {
            label: None,
            enabled: true,
            conditions: Vec::new(),
            wait: None,
            request: Request::default(),
            response: ResponseDescription::default(),
        }
    }
}

/// Result of one case run, mirroring the case shape
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: Status,
    pub conditions: Verification,
    pub execution: Verification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseVerification>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<ExecutionReport>,
}

impl CaseResult {
    fn skipped(label: Option<String>, status: Status, conditions: Verification) -> Self {
        Self {
            label,
            status,
            conditions,
            execution: Verification::skipped(),
            response: None,
            executions: Vec::new(),
        }
    }
}

impl Statused for CaseResult {
    fn status(&self) -> Status {
        self.status
    }
}

/// Runs one case end to end: preconditions, optional wait, then the
/// request through the retrying unit runner.
pub struct CaseRunner<T> {
    unit: UnitRunner<T>,
}

impl<T: Transport> CaseRunner<T> {
    pub fn new(unit: UnitRunner<T>) -> Self {
        Self { unit }
    }

    pub async fn run(
        &self,
        case: &Case,
        context: &Context,
        listener: &dyn Listener,
    ) -> Result<CaseResult> {
        if !case.enabled {
            return Ok(CaseResult::skipped(
                case.label.clone(),
                Status::Skipped,
                Verification::skipped(),
            ));
        }

        let condition_results = verify_conditions(&case.conditions, context)?;
        // The case takes the status of the first unsatisfied condition, not
        // a merge over all of them.
        if let Some(blocker) = condition_results
            .iter()
            .find(|v| v.status != Status::Success)
        {
            let status = blocker.status;
            return Ok(CaseResult::skipped(
                case.label.clone(),
                status,
                Verification::collect(condition_results),
            ));
        }
        let conditions = Verification::collect(condition_results);

        if let Some(wait) = case.wait {
            tokio::time::sleep(wait).await;
        }

        let request = case.request.prepare(context);
        let (executions, response) = self
            .unit
            .run(&request, Some(&case.response), context, listener)
            .await?;

        let execution = match executions.last() {
            Some(report) => Verification {
                status: report.status,
                message: report.message.clone(),
                children: Vec::new(),
            },
            None => Verification::skipped(),
        };
        let status = Status::merge_all([
            conditions.status,
            execution.status,
            response.as_ref().map_or(Status::Skipped, |r| r.status),
        ]);

        Ok(CaseResult {
            label: case.label.clone(),
            status,
            conditions,
            execution,
            response,
            executions,
        })
    }
}

/// Evaluate precondition descriptions against the context's JSON view
pub(crate) fn verify_conditions(
    conditions: &[Description],
    context: &Context,
) -> Result<Vec<Verification>> {
    if conditions.is_empty() {
        return Ok(Vec::new());
    }
    let analyzer = Analyzer::from(context.to_json());
    conditions
        .iter()
        .map(|condition| condition.verify(&analyzer, context))
        .collect()
}
