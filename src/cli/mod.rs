//! Command-line surface
//!
//! Argument parsing, engine assembly, and the listeners that present a
//! run: logging to the terminal and, on request, an HTML report.

mod report;
mod view;

pub use report::ReportingListener;
pub use view::LoggingListener;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use crate::common::{Error, Result};
use crate::compile::{self, Arguments};
use crate::http::Requester;
use crate::run::{
    CaseRunner, MergingListener, ScenarioResult, ScenarioRunner, ScenarioScheduler, UnitRunner,
};
use crate::verify::Status;

#[derive(Debug, Parser)]
#[command(name = "vouch", about = "Verify HTTP services against YAML scenarios")]
#[command(version, long_about = None)]
pub struct Args {
    /// Scenario files to run
    #[arg(required = true, value_name = "SCENARIO")]
    pub scenarios: Vec<PathBuf>,

    /// Base URL of the service under verification
    #[arg(short = 'u', long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Extra attempts after a rejected one
    #[arg(short, long, default_value = "0")]
    pub retry: i64,

    /// Seconds to wait before each extra attempt
    #[arg(short, long, default_value = "0.1")]
    pub delay: f64,

    /// Per-attempt timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// How many scenarios run at once
    #[arg(short, long, default_value = "1")]
    pub concurrency: usize,

    /// Named value, injectable in scenarios via `!argument KEY`
    /// Can be specified multiple times: -a user=bob -a count=3
    #[arg(short = 'a', long = "argument", value_name = "KEY=VALUE")]
    pub arguments: Vec<String>,

    /// Directory to write an HTML report into
    #[arg(short = 'R', long, value_name = "DIR")]
    pub report: Option<PathBuf>,

    /// Log every attempt and engine details
    #[arg(short, long)]
    pub verbose: bool,
}

/// Assemble the engine from parsed arguments and run every scenario file
pub async fn run(args: Args) -> Result<Status> {
    let arguments = parse_arguments(&args.arguments)?;
    if !args.delay.is_finite() || args.delay < 0.0 {
        return Err(Error::Config(format!(
            "delay must be a non-negative number of seconds, got {}",
            args.delay
        )));
    }
    let timeout = match args.timeout {
        Some(seconds) if !seconds.is_finite() || seconds <= 0.0 => {
            return Err(Error::Config(format!(
                "timeout must be a positive number of seconds, got {}",
                seconds
            )));
        }
        Some(seconds) => Some(Duration::from_secs_f64(seconds)),
        None => None,
    };

    let transport = Requester::new(args.base_url.clone(), timeout)?;
    let unit = UnitRunner::new(transport, args.retry, Duration::from_secs_f64(args.delay))?;
    let runner = ScenarioRunner::new(CaseRunner::new(unit), args.base_url);
    let scheduler = ScenarioScheduler::new(runner, args.concurrency)?;

    let mut listener = MergingListener::new();
    listener.push(LoggingListener);
    if let Some(directory) = args.report {
        listener.push(ReportingListener::new(directory));
    }

    // A file that does not compile becomes a pre-built failure so the
    // other files still run.
    let items = args.scenarios.iter().map(|path| {
        compile::compile_file(path, &arguments).map_err(|error| {
            ScenarioResult::failure(
                format!("Compilation Error ({})", path.display()),
                error.to_string(),
            )
        })
    });

    let overall = scheduler.run(items, &listener).await?;
    println!("{}", summary_line(overall));
    Ok(overall)
}

/// Parse `KEY=VALUE` pairs. Values are YAML scalars, so `count=3` is a
/// number and `flag=true` a boolean.
fn parse_arguments(pairs: &[String]) -> Result<Arguments> {
    let mut arguments = Arguments::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::Config(format!("invalid argument {:?}: expected KEY=VALUE", pair))
        })?;
        let value = if value.is_empty() {
            serde_yaml::Value::Null
        } else {
            serde_yaml::from_str(value)
                .map_err(|e| Error::Config(format!("invalid argument {:?}: {}", pair, e)))?
        };
        arguments.insert(key.to_string(), value);
    }
    Ok(arguments)
}

fn summary_line(overall: Status) -> String {
    let text = format!("Overall: {}", overall);
    match overall {
        Status::Skipped | Status::Success => text.green().bold().to_string(),
        Status::Unstable => text.yellow().bold().to_string(),
        Status::Failure => text.red().bold().to_string(),
    }
}
