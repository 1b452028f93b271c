//! Approval workflow states and the pre-transition hook.
//!
//! A transition is decided in two phases: a [`TransitionGuard`] first allows,
//! denies, or asks for confirmation, and only a confirmed
//! [`PendingTransition`] mutates the request.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::currency::{format_amount, LocaleConfig};
use crate::errors::{Result, VirementError};
use crate::ledger::BudgetRequest;
use crate::validation::collect_issues;

/// Totals above this need sign-off outside the organisation.
pub const DEFAULT_EXTERNAL_THRESHOLD: Decimal = dec!(250000);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    #[default]
    Draft,
    #[serde(rename = "Pending Approval", alias = "PendingApproval")]
    PendingApproval,
    #[serde(rename = "External Approval", alias = "ExternalApproval")]
    ExternalApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl WorkflowState {
    /// States a request never leaves.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            WorkflowState::Approved | WorkflowState::Rejected | WorkflowState::Cancelled
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowState::Draft => "Draft",
            WorkflowState::PendingApproval => "Pending Approval",
            WorkflowState::ExternalApproval => "External Approval",
            WorkflowState::Approved => "Approved",
            WorkflowState::Rejected => "Rejected",
            WorkflowState::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalPolicy {
    pub external_threshold: Decimal,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            external_threshold: DEFAULT_EXTERNAL_THRESHOLD,
        }
    }
}

impl ApprovalPolicy {
    pub fn new(external_threshold: Decimal) -> Self {
        Self { external_threshold }
    }

    pub fn requires_external_approval(&self, total: Decimal) -> bool {
        total.abs() > self.external_threshold
    }

    /// State a request with this total should be submitted into.
    pub fn submission_state(&self, total: Decimal) -> WorkflowState {
        if self.requires_external_approval(total) {
            WorkflowState::ExternalApproval
        } else {
            WorkflowState::PendingApproval
        }
    }
}

/// Banner shown on a request whose total crosses the external threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalNotice {
    pub amount: Decimal,
    pub threshold: Decimal,
    pub message: String,
}

/// `None` below the threshold and for requests in a final state.
pub fn approval_notice(
    policy: &ApprovalPolicy,
    request: &BudgetRequest,
    locale: &LocaleConfig,
) -> Option<ApprovalNotice> {
    if request.workflow_state.is_final() {
        return None;
    }
    let amount = request.total_amount().abs();
    if !policy.requires_external_approval(amount) {
        return None;
    }
    Some(ApprovalNotice {
        amount,
        threshold: policy.external_threshold,
        message: format!(
            "Total of {} exceeds {} and requires external approval",
            format_amount(amount, locale),
            format_amount(policy.external_threshold, locale)
        ),
    })
}

/// A transition waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    request_id: Uuid,
    from: WorkflowState,
    to: WorkflowState,
    prompt: String,
}

impl PendingTransition {
    pub fn new(request: &BudgetRequest, to: WorkflowState, prompt: impl Into<String>) -> Self {
        Self {
            request_id: request.id,
            from: request.workflow_state,
            to,
            prompt: prompt.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn from(&self) -> WorkflowState {
        self.from
    }

    pub fn to(&self) -> WorkflowState {
        self.to
    }

    /// Second phase: commits the transition. Fails if the request is not the
    /// one, or no longer in the state, the confirmation was asked for.
    pub fn confirm(self, request: &mut BudgetRequest) -> Result<WorkflowState> {
        if request.id != self.request_id || request.workflow_state != self.from {
            return Err(VirementError::TransitionDenied {
                from: request.workflow_state,
                to: self.to,
                reason: "request changed while awaiting confirmation".into(),
            });
        }
        request.workflow_state = self.to;
        request.touch();
        info!(
            request = %request.id,
            from = %self.from,
            to = %self.to,
            "workflow transition confirmed"
        );
        Ok(self.to)
    }

    /// Abandons the transition; the request keeps its state.
    pub fn cancel(self) -> WorkflowState {
        info!(request = %self.request_id, to = %self.to, "workflow transition cancelled");
        self.from
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    Allow,
    Deny(String),
    Confirm(PendingTransition),
}

/// Veto point consulted before a request changes workflow state.
pub trait TransitionGuard {
    fn before_transition(&self, request: &BudgetRequest, target: WorkflowState)
        -> TransitionDecision;
}

/// Default guard: validates before submission, asks for confirmation before
/// approval, and routes large totals through external approval.
#[derive(Debug, Clone, Default)]
pub struct ApprovalGate {
    pub policy: ApprovalPolicy,
    pub locale: LocaleConfig,
}

impl ApprovalGate {
    pub fn new(policy: ApprovalPolicy, locale: LocaleConfig) -> Self {
        Self { policy, locale }
    }
}

impl TransitionGuard for ApprovalGate {
    fn before_transition(
        &self,
        request: &BudgetRequest,
        target: WorkflowState,
    ) -> TransitionDecision {
        let current = request.workflow_state;
        if current.is_final() {
            return TransitionDecision::Deny(format!("request is already {current}"));
        }
        if current == target {
            return TransitionDecision::Deny(format!("request is already in {target}"));
        }

        let total = request.total_amount();
        let needs_external = self.policy.requires_external_approval(total);
        let needs_valid_request = matches!(
            target,
            WorkflowState::PendingApproval
                | WorkflowState::ExternalApproval
                | WorkflowState::Approved
        );
        if needs_valid_request {
            let issues = collect_issues(request);
            if !issues.is_empty() {
                let reasons: Vec<String> = issues.iter().map(ToString::to_string).collect();
                return TransitionDecision::Deny(reasons.join("; "));
            }
        }

        let amount = format_amount(total, &self.locale);
        match target {
            WorkflowState::ExternalApproval if !needs_external => TransitionDecision::Deny(format!(
                "total {amount} does not exceed the external approval threshold"
            )),
            WorkflowState::ExternalApproval => TransitionDecision::Confirm(PendingTransition::new(
                request,
                target,
                format!(
                    "Send this {} request of {amount} for external approval?",
                    request.virement_type
                ),
            )),
            WorkflowState::Approved
                if needs_external && current != WorkflowState::ExternalApproval =>
            {
                TransitionDecision::Deny(format!(
                    "total {amount} requires external approval before it can be approved"
                ))
            }
            WorkflowState::Approved => TransitionDecision::Confirm(PendingTransition::new(
                request,
                target,
                format!(
                    "Approve {} request of {amount} across {} transfer(s)?",
                    request.virement_type,
                    request.items.len()
                ),
            )),
            _ => TransitionDecision::Allow,
        }
    }
}

/// Runs both phases: consults `guard`, asks `confirm` when the guard wants a
/// confirmation, and applies the outcome. Returns the resulting state.
pub fn apply_transition<G, F>(
    guard: &G,
    request: &mut BudgetRequest,
    target: WorkflowState,
    confirm: F,
) -> Result<WorkflowState>
where
    G: TransitionGuard + ?Sized,
    F: FnOnce(&PendingTransition) -> bool,
{
    match guard.before_transition(request, target) {
        TransitionDecision::Allow => {
            let from = request.workflow_state;
            request.workflow_state = target;
            request.touch();
            info!(request = %request.id, %from, to = %target, "workflow transition");
            Ok(target)
        }
        TransitionDecision::Deny(reason) => Err(VirementError::TransitionDenied {
            from: request.workflow_state,
            to: target,
            reason,
        }),
        TransitionDecision::Confirm(pending) => {
            if confirm(&pending) {
                pending.confirm(request)
            } else {
                Ok(pending.cancel())
            }
        }
    }
}
