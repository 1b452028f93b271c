//! Checks a request must pass before it is saved or submitted.
//!
//! The progressive calculator tolerates half-filled rows; this is where they
//! are finally rejected.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::{Result, VirementError};
use crate::ledger::{BudgetRequest, VirementType};

/// A single problem with a request. Row positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationIssue {
    NoTransfers,
    MissingTargetBudget,
    SameBudget,
    IncompleteRow(usize),
    NonPositiveAmount(usize),
    SameAccount(usize),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoTransfers => f.write_str("at least one transfer item is required"),
            ValidationIssue::MissingTargetBudget => {
                f.write_str("Inter-Budget transfers need a target budget")
            }
            ValidationIssue::SameBudget => f.write_str(
                "target budget must be different from source budget for Inter-Budget transfers",
            ),
            ValidationIssue::IncompleteRow(position) => write!(
                f,
                "transfer item {position}: from account, to account and amount are required"
            ),
            ValidationIssue::NonPositiveAmount(position) => {
                write!(f, "transfer item {position}: amount must be greater than zero")
            }
            ValidationIssue::SameAccount(position) => write!(
                f,
                "transfer item {position}: for Intra-Budget transfers, \
                 from and to accounts must be different"
            ),
        }
    }
}

/// Collects every issue with `request`. An empty list means it is valid.
pub fn collect_issues(request: &BudgetRequest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if request.virement_type == VirementType::InterBudget {
        match request.destination_ledger() {
            None => issues.push(ValidationIssue::MissingTargetBudget),
            Some(target) if target == request.budget.trim() => {
                issues.push(ValidationIssue::SameBudget)
            }
            Some(_) => {}
        }
    }

    if request.items.is_empty() {
        issues.push(ValidationIssue::NoTransfers);
    }

    for (index, item) in request.items.iter().enumerate() {
        let position = index + 1;
        let (Some(from), Some(to), Some(amount)) =
            (item.from_account(), item.to_account(), item.amount)
        else {
            issues.push(ValidationIssue::IncompleteRow(position));
            continue;
        };
        if amount <= Decimal::ZERO {
            issues.push(ValidationIssue::NonPositiveAmount(position));
        }
        // Inter-Budget rows may reuse an account name: the budgets differ.
        if request.virement_type == VirementType::IntraBudget && from == to {
            issues.push(ValidationIssue::SameAccount(position));
        }
    }

    issues
}

/// Like [`collect_issues`] but as a `Result`, for `?` at call sites.
pub fn validate_request(request: &BudgetRequest) -> Result<()> {
    let issues = collect_issues(request);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(VirementError::Validation(issues))
    }
}
