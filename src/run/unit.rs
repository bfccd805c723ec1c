//! The retry loop around a single prepared request

use std::time::Duration;

use crate::common::{Error, Result};
use crate::context::Context;
use crate::http::{ExecutionReport, PreparedRequest, Transport};
use crate::run::listener::Listener;
use crate::verify::{ResponseDescription, ResponseVerification};

/// Executes one request until it is accepted or attempts run out.
///
/// An attempt is accepted when the transport succeeded and the response
/// requirement, if any, is met. `retry` counts extra attempts after the
/// first, with a fixed delay before each one.
pub struct UnitRunner<T> {
    transport: T,
    retry: usize,
    delay: Duration,
}

impl<T: Transport> UnitRunner<T> {
    pub fn new(transport: T, retry: i64, delay: Duration) -> Result<Self> {
        if retry < 0 {
            return Err(Error::Config(format!(
                "retry must not be negative, got {}",
                retry
            )));
        }
        Ok(Self {
            transport,
            retry: retry as usize,
            delay,
        })
    }

    /// Run the attempts and return every report, last one final, together
    /// with the verification of the last received response
    pub async fn run(
        &self,
        request: &PreparedRequest,
        requirement: Option<&ResponseDescription>,
        context: &Context,
        listener: &dyn Listener,
    ) -> Result<(Vec<ExecutionReport>, Option<ResponseVerification>)> {
        let mut reports = Vec::with_capacity(1);
        let mut verification = None;

        for attempt in 0..=self.retry {
            if attempt > 0 {
                tokio::time::sleep(self.delay).await;
            }
            let (report, response) = self.transport.execute(request).await;
            listener.on_execution(&report, response.as_ref());

            // Relative datetimes inside the requirement resolve against the
            // start of this attempt, not of the whole case.
            let attempt_context = context.with_origin(report.starts);
            verification = match (&response, requirement) {
                (Some(response), Some(requirement)) => {
                    Some(requirement.verify(response, &attempt_context)?)
                }
                _ => None,
            };

            let accepted = report.is_succeeded()
                && verification
                    .as_ref()
                    .map_or(true, |v| v.status.is_succeeded());
            reports.push(report);
            if accepted {
                break;
            }
        }

        Ok((reports, verification))
    }
}
