//! Execution engine: the retrying unit runner, case and scenario runners,
//! and the top-level scheduler

pub mod case;
pub mod listener;
pub mod scenario;
pub mod scheduler;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

pub use case::{Case, CaseResult, CaseRunner};
pub use listener::{Listener, MergingListener};
pub use scenario::{Scenario, ScenarioResult, ScenarioRunner};
pub use scheduler::ScenarioScheduler;
pub use unit::UnitRunner;
