//! Stand-ins for the transport and listener seams, shared across run tests

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::common::Result;
use crate::http::{ExecutionReport, PreparedRequest, Response, Transport};
use crate::run::listener::Listener;
use crate::run::scenario::ScenarioResult;
use crate::verify::Status;

/// Serves scripted outcomes in order, repeating the last one once the
/// script runs out. `None` stands for a transport failure.
pub(crate) struct StubTransport {
    script: Mutex<Vec<Option<Response>>>,
    pub requests: Mutex<Vec<PreparedRequest>>,
}

impl StubTransport {
    pub fn replying(script: Vec<Option<Response>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: Response) -> Self {
        Self::replying(vec![Some(response)])
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: &PreparedRequest) -> (ExecutionReport, Option<Response>) {
        self.requests.lock().unwrap().push(request.clone());
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script.first().cloned().flatten()
            }
        };
        let now = OffsetDateTime::now_utc();
        match next {
            Some(response) => (
                ExecutionReport::success(request.to_string(), now, now),
                Some(response),
            ),
            None => (
                ExecutionReport::failure(request.to_string(), now, now, "connection refused"),
                None,
            ),
        }
    }
}

pub(crate) fn json_response(status: u16, body: &str) -> Response {
    Response {
        status,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.into(),
    }
}

/// Records every notification for assertions
#[derive(Default)]
pub(crate) struct RecordingListener {
    pub executions: Mutex<Vec<ExecutionReport>>,
    pub scenarios: Mutex<Vec<(String, Status)>>,
    pub ended: Mutex<Vec<Status>>,
}

impl Listener for RecordingListener {
    fn on_execution(&self, report: &ExecutionReport, _response: Option<&Response>) {
        self.executions.lock().unwrap().push(report.clone());
    }

    fn on_scenario(&self, result: &ScenarioResult) {
        self.scenarios
            .lock()
            .unwrap()
            .push((result.label.clone().unwrap_or_default(), result.status));
    }

    fn on_end(&self, overall: Status) -> Result<()> {
        self.ended.lock().unwrap().push(overall);
        Ok(())
    }
}
