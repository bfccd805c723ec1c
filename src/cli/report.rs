//! Standalone HTML report
//!
//! Collects scenario results as they complete and writes a single
//! self-contained `index.html` when the run ends.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::common::Result;
use crate::run::{CaseResult, Listener, ScenarioResult};
use crate::verify::{Status, Verification};

const REPORT_STYLE: &str =
    "body{font-family:system-ui,-apple-system,\"Segoe UI\",sans-serif;background:#0f172a;color:#e2e8f0;margin:0;padding:0;}\
    header{background:#1e293b;padding:24px 32px;border-bottom:1px solid rgba(148,163,184,0.2);}\
    h1{margin:0;font-size:28px;}\
    h2,h3{margin:0 0 8px 0;}\
    main{padding:32px;}\
    section{margin-bottom:24px;background:#111c34;padding:24px;border-radius:12px;border:1px solid rgba(148,163,184,0.1);}\
    section section{margin-top:16px;margin-bottom:0;}\
    .case{margin-top:16px;padding:16px;border-radius:8px;background:#0b1120;}\
    p{margin:4px 0;}\
    ul{margin:4px 0;padding-left:24px;}\
    .message{color:#94a3b8;}\
    details>summary{cursor:pointer;color:#38bdf8;}\
    .badge{display:inline-block;padding:2px 8px;border-radius:8px;font-size:12px;font-weight:600;}\
    .badge.skipped{background:#334155;color:#cbd5e1;}\
    .badge.success{background:#14532d;color:#bbf7d0;}\
    .badge.unstable{background:#713f12;color:#fde68a;}\
    .badge.failure{background:#7f1d1d;color:#fecaca;}";

/// Writes `<directory>/index.html` once the run ends
pub struct ReportingListener {
    directory: PathBuf,
    results: Mutex<Vec<ScenarioResult>>,
}

impl ReportingListener {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            results: Mutex::new(Vec::new()),
        }
    }
}

impl Listener for ReportingListener {
    fn on_scenario(&self, result: &ScenarioResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
    }

    fn on_end(&self, overall: Status) -> Result<()> {
        let results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.directory)?;
        let html = render_report(overall, &results);
        fs::write(self.directory.join("index.html"), html)?;
        Ok(())
    }
}

fn render_report(overall: Status, results: &[ScenarioResult]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    html.push_str("<title>Verification Report</title>\n");
    html.push_str("<style>");
    html.push_str(REPORT_STYLE);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<header>");
    html.push_str("<h1>Verification Report</h1>");
    html.push_str(&format!("<p>Overall: {}</p>", badge(overall)));
    html.push_str("</header>\n<main>\n");
    for result in results {
        render_scenario(&mut html, result);
    }
    if results.is_empty() {
        html.push_str("<section><p>No scenarios were run.</p></section>\n");
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

// Subscenarios recurse as nested sections.
fn render_scenario(html: &mut String, result: &ScenarioResult) {
    html.push_str("<section class=\"scenario\">");
    html.push_str(&format!(
        "<h2>{} {}</h2>",
        escape_html(result.label.as_deref().unwrap_or("Scenario")),
        badge(result.status)
    ));
    if let Some(message) = &result.message {
        html.push_str(&format!(
            "<p class=\"message\">{}</p>",
            escape_html(message)
        ));
    }
    render_group(html, "Conditions", &result.conditions);
    for case in &result.cases.items {
        render_case(html, case);
    }
    for subscenario in &result.subscenarios.items {
        render_scenario(html, subscenario);
    }
    html.push_str("</section>\n");
}

fn render_case(html: &mut String, case: &CaseResult) {
    html.push_str("<div class=\"case\">");
    html.push_str(&format!(
        "<h3>{} {}</h3>",
        escape_html(case.label.as_deref().unwrap_or("Case")),
        badge(case.status)
    ));
    render_group(html, "Conditions", &case.conditions);
    render_group(html, "Execution", &case.execution);
    if let Some(response) = &case.response {
        render_group(html, "Status Code", &response.status_code);
        render_group(html, "Headers", &response.headers);
        render_group(html, "Body", &response.body);
    }
    if !case.executions.is_empty() {
        html.push_str("<details><summary>Attempts</summary><ul>");
        for report in &case.executions {
            let line = match &report.message {
                Some(message) => format!("{} ({})", report.request, message),
                None => report.request.clone(),
            };
            html.push_str(&format!(
                "<li>{} {}</li>",
                escape_html(&line),
                badge(report.status)
            ));
        }
        html.push_str("</ul></details>");
    }
    html.push_str("</div>\n");
}

fn render_group(html: &mut String, title: &str, verification: &Verification) {
    if verification.status == Status::Skipped && verification.children.is_empty() {
        return;
    }
    html.push_str(&format!(
        "<p>{} {}</p>",
        escape_html(title),
        badge(verification.status)
    ));
    if let Some(message) = &verification.message {
        html.push_str(&format!(
            "<p class=\"message\">{}</p>",
            escape_html(message)
        ));
    }
    render_children(html, &verification.children);
}

fn render_children(html: &mut String, children: &[Verification]) {
    if children.is_empty() {
        return;
    }
    html.push_str("<ul>");
    for child in children {
        html.push_str("<li>");
        html.push_str(&badge(child.status));
        if let Some(message) = &child.message {
            html.push(' ');
            html.push_str(&escape_html(message));
        }
        render_children(html, &child.children);
        html.push_str("</li>");
    }
    html.push_str("</ul>\n");
}

fn badge(status: Status) -> String {
    format!(
        "<span class=\"badge {}\">{}</span>",
        status.to_string().to_lowercase(),
        status
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
