//! Deterministic deletion plans.
//!
//! A [`Plan`] is built once from one [`Inventory`] snapshot and a
//! [`ScopeRule`]. Domains come first in collector order (a running domain
//! gets `DestroyDomain` immediately followed by `UndefineDomain`), then
//! volumes in collector order. The plan is never mutated afterwards.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;

use crate::platform::pal::{Domain, DomainState, Volume};
use crate::reclaim::inventory::Inventory;
use crate::reclaim::scope::ScopeRule;

/// One destructive step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    DestroyDomain { name: String },
    UndefineDomain { name: String },
    DeleteVolume { pool: String, name: String },
}

impl Action {
    /// Name of the resource the action targets.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::DestroyDomain { name }
            | Self::UndefineDomain { name }
            | Self::DeleteVolume { name, .. } => name,
        }
    }

    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::DestroyDomain { .. } => "destroy",
            Self::UndefineDomain { .. } => "undefine",
            Self::DeleteVolume { .. } => "delete",
        }
    }

    #[must_use]
    pub const fn is_domain_action(&self) -> bool {
        !matches!(self, Self::DeleteVolume { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestroyDomain { name } => write!(f, "destroy domain {name}"),
            Self::UndefineDomain { name } => write!(f, "undefine domain {name}"),
            Self::DeleteVolume { pool, name } => write!(f, "delete volume {name} (pool {pool})"),
        }
    }
}

/// An action with its position in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub seq: usize,
    #[serde(flatten)]
    pub action: Action,
}

/// An in-scope resource found in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discovered {
    Domain(Domain),
    Volume(Volume),
}

/// Ordered, immutable list of actions from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    actions: Vec<PlannedAction>,
    discovered: Vec<Discovered>,
    protected: Vec<Volume>,
}

impl Plan {
    #[must_use]
    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    #[must_use]
    pub fn discovered(&self) -> &[Discovered] {
        &self.discovered
    }

    /// Volumes left alone because a protect rule matched (global mode only).
    #[must_use]
    pub fn protected(&self) -> &[Volume] {
        &self.protected
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Distinct targets touched, in plan order.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for planned in &self.actions {
            let target = planned.action.target();
            if !seen.contains(&target) {
                seen.push(target);
            }
        }
        seen
    }
}

/// Combines an inventory with a scope rule.
pub struct PlanBuilder<'a> {
    scope: &'a ScopeRule,
}

impl<'a> PlanBuilder<'a> {
    #[must_use]
    pub fn new(scope: &'a ScopeRule) -> Self {
        Self { scope }
    }

    #[must_use]
    pub fn build(&self, inventory: &Inventory) -> Plan {
        let mut plan = Plan::default();

        for domain in &inventory.domains {
            if !self.scope.matches_domain(&domain.name) {
                continue;
            }
            plan.discovered.push(Discovered::Domain(domain.clone()));
            if domain.state == DomainState::Running {
                push(&mut plan, Action::DestroyDomain {
                    name: domain.name.clone(),
                });
            }
            push(&mut plan, Action::UndefineDomain {
                name: domain.name.clone(),
            });
        }

        for volume in &inventory.volumes {
            if !self.scope.matches_volume(&volume.name) {
                if matches!(self.scope, ScopeRule::GlobalExclusion { .. }) {
                    plan.protected.push(volume.clone());
                }
                continue;
            }
            plan.discovered.push(Discovered::Volume(volume.clone()));
            push(&mut plan, Action::DeleteVolume {
                pool: volume.pool.clone(),
                name: volume.name.clone(),
            });
        }

        plan
    }
}

fn push(plan: &mut Plan, action: Action) {
    let seq = plan.actions.len();
    plan.actions.push(PlannedAction { seq, action });
}
