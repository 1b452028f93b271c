use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{TransferItem, TransferOperation};
use crate::errors::{Result, VirementError};
use crate::progressive::{
    compute_progressive_balances, compute_sequence_steps, RunningBalances, SequenceReport,
};
use crate::workflow::WorkflowState;

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Whether a request moves funds inside one budget or across two budgets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VirementType {
    #[default]
    #[serde(rename = "Intra-Budget", alias = "IntraBudget")]
    IntraBudget,
    #[serde(rename = "Inter-Budget", alias = "InterBudget")]
    InterBudget,
}

impl fmt::Display for VirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirementType::IntraBudget => f.write_str("Intra-Budget"),
            VirementType::InterBudget => f.write_str("Inter-Budget"),
        }
    }
}

/// A budget transfer request: an ordered list of transfer rows plus the
/// budgets those rows draw from and pay into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub virement_type: VirementType,
    pub budget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_budget: Option<String>,
    #[serde(default)]
    pub items: Vec<TransferItem>,
    #[serde(default)]
    pub workflow_state: WorkflowState,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "BudgetRequest::schema_version_default")]
    pub schema_version: u8,
}

impl BudgetRequest {
    pub fn new(virement_type: VirementType, budget: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            virement_type,
            budget: budget.into(),
            target_budget: None,
            items: Vec::new(),
            workflow_state: WorkflowState::Draft,
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn intra(budget: impl Into<String>) -> Self {
        Self::new(VirementType::IntraBudget, budget)
    }

    pub fn inter(budget: impl Into<String>, target_budget: impl Into<String>) -> Self {
        let mut request = Self::new(VirementType::InterBudget, budget);
        request.target_budget = Some(target_budget.into());
        request
    }

    /// Budget the from-account of every row is drawn from.
    pub fn source_ledger(&self) -> &str {
        &self.budget
    }

    /// Budget the to-account of every row is paid into.
    ///
    /// `None` for an Inter-Budget request whose target budget is not chosen yet.
    pub fn destination_ledger(&self) -> Option<&str> {
        match self.virement_type {
            VirementType::IntraBudget => Some(&self.budget),
            VirementType::InterBudget => self
                .target_budget
                .as_deref()
                .map(str::trim)
                .filter(|target| !target.is_empty()),
        }
    }

    pub fn add_item(&mut self, item: TransferItem) -> Uuid {
        let id = item.id;
        self.items.push(item);
        self.touch();
        id
    }

    pub fn remove_item(&mut self, row: usize) -> Result<TransferItem> {
        if row >= self.items.len() {
            return Err(VirementError::RowOutOfRange {
                row,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(row);
        self.touch();
        Ok(removed)
    }

    pub fn item(&self, row: usize) -> Option<&TransferItem> {
        self.items.get(row)
    }

    /// Index of the row with the given id, or the row count for a row that
    /// is not in the table yet.
    pub fn row_index(&self, id: Uuid) -> usize {
        self.items
            .iter()
            .position(|item| item.id == id)
            .unwrap_or(self.items.len())
    }

    /// Derives the calculator input, one operation per row in table order.
    pub fn operations(&self) -> Vec<TransferOperation> {
        let destination_ledger = self.destination_ledger();
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| TransferOperation {
                sequence_index: index,
                source_account: item.from_account().map(str::to_string),
                // A row cannot land anywhere until the target budget is known.
                destination_account: destination_ledger
                    .and(item.to_account())
                    .map(str::to_string),
                source_ledger: self.budget.clone(),
                destination_ledger: destination_ledger.unwrap_or_default().to_string(),
                amount: item.amount,
            })
            .collect()
    }

    /// Deltas contributed by every row before `row`, optionally restricted to
    /// one budget. This is what an account picker on `row` should display.
    pub fn progressive_balances_for_row(
        &self,
        row: usize,
        ledger_filter: Option<&str>,
    ) -> RunningBalances {
        compute_progressive_balances(&self.operations(), row, ledger_filter)
    }

    pub fn sequence_report(&self) -> SequenceReport {
        compute_sequence_steps(&self.operations())
    }

    /// Sum of every row amount that has been entered, complete row or not.
    pub fn total_amount(&self) -> Decimal {
        self.items
            .iter()
            .filter_map(|item| item.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
