//! One reclamation run: inventory → plan → execute, with transcript.
//!
//! The caller owns preconditions (tool check, project detection, run lock);
//! this module only needs a [`Hypervisor`] and an immutable [`RunConfig`].

#![allow(missing_docs)]

use std::io::Write;

use serde_json::{Value, json};

use crate::cli::reporter::Reporter;
use crate::core::config::RunConfig;
use crate::core::errors::Result;
use crate::logger::jsonl::ActivityLog;
use crate::platform::pal::Hypervisor;
use crate::reclaim::executor::{ActionObserver, Executor, RunReport};
use crate::reclaim::inventory::{Inventory, InventoryCollector};
use crate::reclaim::plan::{Plan, PlanBuilder};
use crate::reclaim::scope::ScopeRule;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct SessionResult {
    pub inventory: Inventory,
    pub plan: Plan,
    pub report: RunReport,
}

impl SessionResult {
    /// Machine-readable summary for `--json`.
    #[must_use]
    pub fn to_json(&self, scope: &str) -> Value {
        json!({
            "scope": scope,
            "endpoint": self.inventory.endpoint,
            "pool": self.inventory.pool,
            "pool_status": self.inventory.pool_status,
            "discovered": self.plan.discovered(),
            "protected": self.plan.protected(),
            "report": self.report,
            "succeeded": self.report.succeeded(),
            "failed": self.report.failed(),
            "skipped": self.report.skipped(),
        })
    }
}

/// Collect, plan and execute once. Only inventory failures are errors;
/// per-action failures live in the returned report.
pub fn run_session<O: Write, E: Write>(
    run: &RunConfig,
    scope: &ScopeRule,
    hypervisor: &dyn Hypervisor,
    reporter: &mut Reporter<O, E>,
    mut activity: Option<&mut ActivityLog>,
    should_stop: Option<&dyn Fn() -> bool>,
) -> Result<SessionResult> {
    let scope_text = scope.describe();
    reporter.header(&scope_text, run.mode, hypervisor.endpoint(), &run.pool);

    let inventory = InventoryCollector::new(hypervisor).collect(&run.pool)?;
    reporter.pool_skipped(&run.pool, &inventory.pool_status);

    let plan = PlanBuilder::new(scope).build(&inventory);
    for item in plan.discovered() {
        reporter.discovered(item);
    }
    for volume in plan.protected() {
        reporter.protected(volume);
    }
    if plan.is_empty() {
        reporter.nothing_found();
    }

    let executor = Executor::new(hypervisor, run.mode);
    let report = {
        let mut observers: Vec<&mut dyn ActionObserver> = Vec::with_capacity(2);
        observers.push(&mut *reporter);
        if let Some(log) = activity.as_deref_mut() {
            observers.push(log);
        }
        executor.execute(&plan, should_stop, &mut observers)
    };
    reporter.summary(&report);

    if let Some(log) = activity {
        log.log_summary(&scope_text, &report);
        if let Some(reason) = log.degraded() {
            reporter.warn(reason);
        }
    }

    Ok(SessionResult {
        inventory,
        plan,
        report,
    })
}
