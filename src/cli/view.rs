//! Terminal presentation of results
//!
//! Logs each scenario result as an indented tree, two dots per level, at
//! the severity matching its status. Groups that checked nothing are kept
//! out of the output.

use tracing::{debug, error, info, warn};

use crate::common::Result;
use crate::http::{ExecutionReport, Response};
use crate::run::{CaseResult, Listener, ScenarioResult};
use crate::verify::{ResponseVerification, Status, Verification};

/// Logs progress and the result tree through `tracing`
pub struct LoggingListener;

impl Listener for LoggingListener {
    fn on_execution(&self, report: &ExecutionReport, response: Option<&Response>) {
        match response {
            Some(response) => debug!("{} -> {}", report.request, response.status),
            None => debug!(
                "{} -> {}",
                report.request,
                report.message.as_deref().unwrap_or("no response")
            ),
        }
    }

    fn on_scenario(&self, result: &ScenarioResult) {
        log_scenario(result, 0);
    }

    fn on_end(&self, overall: Status) -> Result<()> {
        log(overall, 0, format!("Overall: {}", overall));
        Ok(())
    }
}

fn log(status: Status, depth: usize, text: impl AsRef<str>) {
    let indent = "..".repeat(depth);
    let text = text.as_ref();
    match status {
        Status::Skipped | Status::Success => info!("{}{}", indent, text),
        Status::Unstable => warn!("{}{}", indent, text),
        Status::Failure => error!("{}{}", indent, text),
    }
}

fn log_scenario(result: &ScenarioResult, depth: usize) {
    let label = result.label.as_deref().unwrap_or("Scenario");
    log(result.status, depth, format!("{}: {}", label, result.status));
    if let Some(message) = &result.message {
        log(result.status, depth + 1, message);
    }
    log_group("Conditions", &result.conditions, depth + 1);
    if !result.cases.items.is_empty() {
        log(
            result.cases.status,
            depth + 1,
            format!("Cases: {}", result.cases.status),
        );
        for case in &result.cases.items {
            log_case(case, depth + 2);
        }
    }
    if !result.subscenarios.items.is_empty() {
        log(
            result.subscenarios.status,
            depth + 1,
            format!("Subscenarios: {}", result.subscenarios.status),
        );
        for subscenario in &result.subscenarios.items {
            log_scenario(subscenario, depth + 2);
        }
    }
}

fn log_case(case: &CaseResult, depth: usize) {
    let label = case.label.as_deref().unwrap_or("Case");
    log(case.status, depth, format!("{}: {}", label, case.status));
    log_group("Conditions", &case.conditions, depth + 1);
    log_group("Execution", &case.execution, depth + 1);
    if let Some(response) = &case.response {
        log_response(response, depth + 1);
    }
}

fn log_response(response: &ResponseVerification, depth: usize) {
    log(
        response.status,
        depth,
        format!("Response: {}", response.status),
    );
    log_group("Status Code", &response.status_code, depth + 1);
    log_group("Headers", &response.headers, depth + 1);
    log_group("Body", &response.body, depth + 1);
}

fn log_group(title: &str, verification: &Verification, depth: usize) {
    if verification.status == Status::Skipped && verification.children.is_empty() {
        return;
    }
    log(
        verification.status,
        depth,
        format!("{}: {}", title, verification.status),
    );
    if let Some(message) = &verification.message {
        log(verification.status, depth + 1, message);
    }
    log_children(&verification.children, depth + 1);
}

/// Children are anonymous; number them by position
fn log_children(children: &[Verification], depth: usize) {
    for (idx, child) in children.iter().enumerate() {
        log(child.status, depth, format!("{}: {}", idx + 1, child.status));
        if let Some(message) = &child.message {
            log(child.status, depth + 1, message);
        }
        log_children(&child.children, depth + 1);
    }
}
