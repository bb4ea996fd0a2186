//! Plan execution under simulate or execute mode.
//!
//! Actions run strictly one after another. A failed action is recorded and
//! the walk continues; the run counts as completed whenever the end of the
//! plan is reached. Only an interrupt stops the walk early, and then every
//! remaining action is recorded as skipped.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::config::ExecutionMode;
use crate::core::errors::Result;
use crate::platform::pal::Hypervisor;
use crate::reclaim::plan::{Action, Discovered, Plan, PlannedAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DryRun,
    Interrupted,
}

/// Per-action result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded,
    Failed { code: String, error: String },
    Skipped { reason: SkipReason },
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub seq: usize,
    #[serde(flatten)]
    pub action: Action,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

/// Lifecycle of one domain during a run.
///
/// `Discovered → [Destroying → Stopped] → Undefining → Undefined | Failed`.
/// `Failed` is terminal but does not stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPhase {
    Discovered,
    Destroying,
    Stopped,
    Undefining,
    Undefined,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainProgress {
    pub name: String,
    pub phase: DomainPhase,
}

/// Structured result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: ExecutionMode,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "as_secs_f64")]
    pub duration: Duration,
    pub records: Vec<ActionRecord>,
    pub domains: Vec<DomainProgress>,
    /// The walk reached the end of the plan (false only when interrupted).
    pub completed: bool,
}

impl RunReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Succeeded))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(ActionOutcome::is_failure)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn phase_of(&self, domain: &str) -> Option<DomainPhase> {
        self.domains
            .iter()
            .find(|d| d.name == domain)
            .map(|d| d.phase)
    }

    fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Receives progress while a plan is walked.
pub trait ActionObserver {
    fn before_action(&mut self, _planned: &PlannedAction, _mode: ExecutionMode) {}
    fn after_action(&mut self, record: &ActionRecord, mode: ExecutionMode);
}

/// Walks a [`Plan`] against a [`Hypervisor`].
pub struct Executor<'a> {
    hypervisor: &'a dyn Hypervisor,
    mode: ExecutionMode,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(hypervisor: &'a dyn Hypervisor, mode: ExecutionMode) -> Self {
        Self { hypervisor, mode }
    }

    /// Execute every action in order. `should_stop` is consulted before each
    /// action; once it returns true the rest of the plan is skipped.
    pub fn execute(
        &self,
        plan: &Plan,
        should_stop: Option<&dyn Fn() -> bool>,
        observers: &mut [&mut dyn ActionObserver],
    ) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut domains: Vec<DomainProgress> = plan
            .discovered()
            .iter()
            .filter_map(|d| match d {
                Discovered::Domain(domain) => Some(DomainProgress {
                    name: domain.name.clone(),
                    phase: DomainPhase::Discovered,
                }),
                Discovered::Volume(_) => None,
            })
            .collect();
        let mut records = Vec::with_capacity(plan.len());
        let mut interrupted = false;

        for planned in plan.actions() {
            if !interrupted && should_stop.is_some_and(|stop| stop()) {
                interrupted = true;
            }

            for observer in observers.iter_mut() {
                observer.before_action(planned, self.mode);
            }

            let outcome = if interrupted {
                ActionOutcome::Skipped {
                    reason: SkipReason::Interrupted,
                }
            } else if self.mode.is_dry_run() {
                ActionOutcome::Skipped {
                    reason: SkipReason::DryRun,
                }
            } else {
                advance(&mut domains, &planned.action, None);
                let outcome = match self.invoke(&planned.action) {
                    Ok(()) => ActionOutcome::Succeeded,
                    Err(err) => ActionOutcome::Failed {
                        code: err.code().to_string(),
                        error: err.to_string(),
                    },
                };
                advance(&mut domains, &planned.action, Some(&outcome));
                outcome
            };

            let record = ActionRecord {
                seq: planned.seq,
                action: planned.action.clone(),
                outcome,
            };
            for observer in observers.iter_mut() {
                observer.after_action(&record, self.mode);
            }
            records.push(record);
        }

        RunReport {
            mode: self.mode,
            started_at,
            duration: start.elapsed(),
            records,
            domains,
            completed: !interrupted,
        }
    }

    fn invoke(&self, action: &Action) -> Result<()> {
        match action {
            Action::DestroyDomain { name } => self.hypervisor.destroy_domain(name),
            Action::UndefineDomain { name } => self.hypervisor.undefine_domain(name),
            Action::DeleteVolume { pool, name } => self.hypervisor.delete_volume(pool, name),
        }
    }
}

/// Move a domain's phase for `action`: `outcome == None` means the call is starting.
fn advance(domains: &mut [DomainProgress], action: &Action, outcome: Option<&ActionOutcome>) {
    let Some(progress) = domains.iter_mut().find(|d| d.name == action.target()) else {
        return;
    };
    progress.phase = match (action, outcome) {
        (Action::DestroyDomain { .. }, None) => DomainPhase::Destroying,
        (Action::DestroyDomain { .. }, Some(ActionOutcome::Succeeded)) => DomainPhase::Stopped,
        (Action::UndefineDomain { .. }, None) => DomainPhase::Undefining,
        (Action::UndefineDomain { .. }, Some(ActionOutcome::Succeeded)) => DomainPhase::Undefined,
        (Action::UndefineDomain { .. }, Some(_)) => DomainPhase::Failed,
        // A failed destroy leaves the domain in Destroying; undefine is still attempted.
        _ => progress.phase,
    };
}
