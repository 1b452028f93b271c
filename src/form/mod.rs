//! Editable request state with explicit mutation entry points.
//!
//! Each mutation re-runs the progressive calculator over the current rows and
//! returns a [`FormView`] listing which rows changed since the previous view.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::balances::{AccountOption, BalanceCache, BalanceLookup, BudgetCheck};
use crate::errors::{Result, VirementError};
use crate::ledger::{AccountKey, BudgetRequest, TransferItem, VirementType};
use crate::progressive::{
    compute_progressive_balances, ProgressionSide, SequenceReport, TransferSummary,
};
use crate::validation::ValidationIssue;
use crate::workflow::ApprovalPolicy;

/// A single field edit on a transfer row. `None` clears the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationField {
    FromAccount(Option<String>),
    ToAccount(Option<String>),
    Amount(Option<Decimal>),
}

/// What a row displays: its inputs plus projected balances on both sides.
///
/// `*_available` is the original balance plus every row above this one;
/// `from_remaining` and `to_new_amount` then apply this row's own amount.
/// `shortfall` is how far the amount exceeds `from_available`, zero when the
/// from-account can fund it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: Uuid,
    pub position: usize,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub amount: Option<Decimal>,
    pub complete: bool,
    pub from_available: Option<Decimal>,
    pub from_remaining: Option<Decimal>,
    pub to_available: Option<Decimal>,
    pub to_new_amount: Option<Decimal>,
    pub shortfall: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub rows: Vec<RowView>,
    /// 0-based indices of rows whose view differs from the previous one.
    pub changed_rows: Vec<usize>,
    pub total_amount: Decimal,
    pub requires_external_approval: bool,
    /// 0-based indices of rows whose from-account cannot fund the amount.
    pub insufficient_rows: Vec<usize>,
    pub summary: TransferSummary,
}

pub struct RequestForm<L> {
    request: BudgetRequest,
    cache: BalanceCache<L>,
    policy: ApprovalPolicy,
    last_rows: Vec<RowView>,
}

impl<L: BalanceLookup> RequestForm<L> {
    pub fn new(request: BudgetRequest, lookup: L, policy: ApprovalPolicy) -> Self {
        let mut form = Self {
            request,
            cache: BalanceCache::new(lookup),
            policy,
            last_rows: Vec::new(),
        };
        form.last_rows = form.build_rows();
        form
    }

    pub fn request(&self) -> &BudgetRequest {
        &self.request
    }

    pub fn into_request(self) -> BudgetRequest {
        self.request
    }

    pub fn cache(&self) -> &BalanceCache<L> {
        &self.cache
    }

    /// Current view; `changed_rows` is empty unless balances moved underneath.
    pub fn view(&mut self) -> FormView {
        self.publish()
    }

    /// Appends a blank row.
    pub fn add_operation(&mut self) -> FormView {
        let id = self.request.add_item(TransferItem::blank());
        debug!(row = %id, rows = self.request.items.len(), "transfer row added");
        self.publish()
    }

    pub fn remove_operation(&mut self, row: usize) -> Result<FormView> {
        let removed = self.request.remove_item(row)?;
        self.invalidate_item_ledgers(&removed);
        debug!(row, "transfer row removed");
        Ok(self.publish())
    }

    /// Applies one field edit. An Intra-Budget row may not name the same
    /// account on both sides; such an edit is refused and nothing changes.
    pub fn set_operation_field(&mut self, row: usize, field: OperationField) -> Result<FormView> {
        let len = self.request.items.len();
        let mut item = self
            .request
            .item(row)
            .cloned()
            .ok_or(VirementError::RowOutOfRange { row, len })?;
        let previous = item.clone();

        match field {
            OperationField::FromAccount(account) => item.from_account = account,
            OperationField::ToAccount(account) => item.to_account = account,
            OperationField::Amount(amount) => item.amount = amount,
        }

        if self.request.virement_type == VirementType::IntraBudget {
            if let (Some(from), Some(to)) = (item.from_account(), item.to_account()) {
                if from == to {
                    return Err(VirementError::InvalidInput(
                        ValidationIssue::SameAccount(row + 1).to_string(),
                    ));
                }
            }
        }

        self.request.items[row] = item.clone();
        self.request.touch();
        self.invalidate_item_ledgers(&previous);
        self.invalidate_item_ledgers(&item);
        Ok(self.publish())
    }

    /// Switching the transfer type re-homes every to-account, so all cached
    /// balances are dropped. Intra-Budget requests have no target budget.
    pub fn set_virement_type(&mut self, virement_type: VirementType) -> FormView {
        self.request.virement_type = virement_type;
        if virement_type == VirementType::IntraBudget {
            self.request.target_budget = None;
        }
        self.request.touch();
        self.cache.invalidate_all();
        self.publish()
    }

    pub fn set_target_budget(&mut self, target_budget: Option<String>) -> FormView {
        self.request.target_budget = target_budget;
        self.request.touch();
        self.cache.invalidate_all();
        self.publish()
    }

    /// Accounts a picker on `row` should offer for `side`, with balances
    /// projected through every row above it, narrowed by the typed `query`.
    pub fn account_options(
        &mut self,
        row: usize,
        side: ProgressionSide,
        query: Option<&str>,
    ) -> Vec<AccountOption> {
        let ledger = match side {
            ProgressionSide::From => Some(self.request.source_ledger().to_string()),
            ProgressionSide::To => self.request.destination_ledger().map(str::to_string),
        };
        let Some(ledger) = ledger else {
            return Vec::new();
        };
        let deltas = self.request.progressive_balances_for_row(row, Some(&ledger));
        let exclude = match (side, self.request.virement_type) {
            (ProgressionSide::To, VirementType::IntraBudget) => self
                .request
                .item(row)
                .and_then(|item| item.from_account())
                .map(str::to_string),
            _ => None,
        };
        self.cache
            .account_options(&ledger, &deltas, exclude.as_deref(), query)
    }

    pub fn sequence_report(&self) -> SequenceReport {
        self.request.sequence_report()
    }

    fn publish(&mut self) -> FormView {
        let rows = self.build_rows();
        let changed_rows: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(index, row)| self.last_rows.get(*index) != Some(*row))
            .map(|(index, _)| index)
            .collect();
        self.last_rows = rows.clone();

        let insufficient_rows: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.shortfall.is_some_and(|shortfall| !shortfall.is_zero()))
            .map(|(index, _)| index)
            .collect();
        if !insufficient_rows.is_empty() {
            debug!(rows = ?insufficient_rows, "rows exceed their available budget");
        }

        let total_amount = self.request.total_amount();
        FormView {
            rows,
            changed_rows,
            total_amount,
            requires_external_approval: self.policy.requires_external_approval(total_amount),
            insufficient_rows,
            summary: self.request.sequence_report().summary,
        }
    }

    fn build_rows(&mut self) -> Vec<RowView> {
        let source_ledger = self.request.source_ledger().to_string();
        let destination_ledger = self.request.destination_ledger().map(str::to_string);
        let operations = self.request.operations();
        let mut rows = Vec::with_capacity(self.request.items.len());

        for (index, item) in self.request.items.iter().enumerate() {
            let deltas = compute_progressive_balances(&operations, index, None);
            let amount = item.amount;

            let from_available = item.from_account().map(|account| {
                self.cache
                    .projected(&AccountKey::new(account, source_ledger.as_str()), &deltas)
            });
            let to_available = match (item.to_account(), destination_ledger.as_deref()) {
                (Some(account), Some(ledger)) => Some(
                    self.cache
                        .projected(&AccountKey::new(account, ledger), &deltas),
                ),
                _ => None,
            };

            rows.push(RowView {
                id: item.id,
                position: index + 1,
                from_account: item.from_account.clone(),
                to_account: item.to_account.clone(),
                amount,
                complete: operations[index].is_complete(),
                from_remaining: from_available
                    .zip(amount)
                    .map(|(available, amount)| available.saturating_sub(amount)),
                to_new_amount: to_available
                    .zip(amount)
                    .map(|(available, amount)| available.saturating_add(amount)),
                shortfall: from_available
                    .zip(amount)
                    .map(|(available, amount)| BudgetCheck::new(available, amount).shortfall),
                from_available,
                to_available,
            });
        }
        rows
    }

    fn invalidate_item_ledgers(&mut self, item: &TransferItem) {
        if item.from_account().is_some() {
            let ledger = self.request.source_ledger().to_string();
            self.cache.invalidate_ledger(&ledger);
        }
        if item.to_account().is_some() {
            if let Some(ledger) = self.request.destination_ledger().map(str::to_string) {
                self.cache.invalidate_ledger(&ledger);
            }
        }
    }
}
