//! Progressive (running) balance computation over an ordered list of
//! transfer operations.
//!
//! Every figure produced here is a signed delta relative to the balances the
//! budgets held before the request, never an absolute balance. Callers add
//! the original balance (see [`crate::balances`]) to display a projection.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ledger::{AccountKey, TransferOperation};

/// Insertion-ordered map of account key to cumulative signed delta.
///
/// Iteration follows the order in which keys were first touched, so summaries
/// built from it are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningBalances {
    entries: Vec<(AccountKey, Decimal)>,
    index: HashMap<AccountKey, usize>,
}

impl RunningBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to `key`, creating it at zero first. Returns the value
    /// before and after the change; the result saturates at the decimal range.
    pub fn apply(&mut self, key: &AccountKey, delta: Decimal) -> (Decimal, Decimal) {
        let slot = self.slot(key);
        let before = self.entries[slot].1;
        let after = before.saturating_add(delta);
        self.entries[slot].1 = after;
        (before, after)
    }

    /// Moves `amount` from `source` to `destination`.
    ///
    /// Returns `None` and leaves every balance untouched when either side
    /// would fall outside the decimal range.
    pub fn transfer(
        &mut self,
        source: &AccountKey,
        destination: &AccountKey,
        amount: Decimal,
    ) -> Option<()> {
        let source_after = self.delta(source).checked_sub(amount)?;
        let destination_after = if source == destination {
            source_after.checked_add(amount)?
        } else {
            self.delta(destination).checked_add(amount)?
        };
        let slot = self.slot(source);
        self.entries[slot].1 = source_after;
        let slot = self.slot(destination);
        self.entries[slot].1 = destination_after;
        Some(())
    }

    /// Current delta for `key`; untouched keys read as zero.
    pub fn delta(&self, key: &AccountKey) -> Decimal {
        self.get(key).unwrap_or(Decimal::ZERO)
    }

    pub fn get(&self, key: &AccountKey) -> Option<Decimal> {
        self.index.get(key).map(|slot| self.entries[*slot].1)
    }

    pub fn contains(&self, key: &AccountKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountKey, Decimal)> + '_ {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &AccountKey> + '_ {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Sum of every delta. Zero whenever only complete transfers were folded.
    pub fn net_total(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |total, (_, value)| total.saturating_add(*value))
    }

    /// Keeps only the keys that belong to `ledger`, preserving order.
    pub fn restricted_to(&self, ledger: &str) -> Self {
        let mut filtered = Self::new();
        for (key, value) in self.iter().filter(|(key, _)| key.belongs_to(ledger)) {
            filtered.apply(key, value);
        }
        filtered
    }

    fn slot(&mut self, key: &AccountKey) -> usize {
        if let Some(slot) = self.index.get(key) {
            return *slot;
        }
        let slot = self.entries.len();
        self.entries.push((key.clone(), Decimal::ZERO));
        self.index.insert(key.clone(), slot);
        slot
    }
}

/// Serializes as `{"account|ledger": delta, ...}` in first-seen order.
impl Serialize for RunningBalances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

/// Before/after deltas for one complete transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub sequence_index: usize,
    /// 1-based label shown to users ("Transfer 3").
    pub position: usize,
    pub source: AccountKey,
    pub destination: AccountKey,
    pub amount: Decimal,
    pub source_before: Decimal,
    pub source_after: Decimal,
    pub destination_before: Decimal,
    pub destination_after: Decimal,
}

impl StepRecord {
    pub fn source_change(&self) -> Decimal {
        self.source_after - self.source_before
    }

    pub fn destination_change(&self) -> Decimal {
        self.destination_after - self.destination_before
    }

    pub fn is_self_transfer(&self) -> bool {
        self.source == self.destination
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressionSide {
    From,
    To,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionEntry {
    pub position: usize,
    pub side: ProgressionSide,
    pub before: Decimal,
    pub after: Decimal,
    pub change: Decimal,
}

/// Every change one account went through, in transfer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProgression {
    pub key: AccountKey,
    pub entries: Vec<ProgressionEntry>,
    pub final_delta: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    /// Sum of every entered amount, including rows that are not complete.
    pub total_amount: Decimal,
    pub complete_transfers: usize,
    pub total_transfers: usize,
    pub affected_accounts: usize,
}

impl TransferSummary {
    pub fn all_complete(&self) -> bool {
        self.complete_transfers == self.total_transfers
    }
}

/// Output of [`compute_sequence_steps`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    pub steps: Vec<StepRecord>,
    pub balances: RunningBalances,
    pub progressions: Vec<AccountProgression>,
    pub summary: TransferSummary,
}

impl SequenceReport {
    pub fn progression(&self, key: &AccountKey) -> Option<&AccountProgression> {
        self.progressions.iter().find(|progression| &progression.key == key)
    }
}

/// Cumulative delta per account contributed by every complete operation with
/// `sequence_index < cutoff_index`.
///
/// With `ledger_filter` only keys of that ledger are returned. Incomplete
/// operations are skipped, and so is an operation whose amount would push a
/// balance outside the decimal range. A transfer from an account to itself
/// nets to zero.
pub fn compute_progressive_balances(
    operations: &[TransferOperation],
    cutoff_index: usize,
    ledger_filter: Option<&str>,
) -> RunningBalances {
    let mut balances = RunningBalances::new();
    for operation in in_sequence(operations) {
        if operation.sequence_index >= cutoff_index {
            break;
        }
        let Some((source, destination, amount)) = operation.complete_parts() else {
            continue;
        };
        if balances.transfer(&source, &destination, amount).is_none() {
            warn!(row = operation.sequence_index, %amount, "transfer overflows, skipped");
        }
    }

    debug!(
        operations = operations.len(),
        cutoff_index,
        accounts = balances.len(),
        "computed progressive balances"
    );

    match ledger_filter {
        Some(ledger) => balances.restricted_to(ledger),
        None => balances,
    }
}

/// Walks the whole list once and records, for each complete operation, the
/// running delta of both accounts before and after it. Rows skipped by
/// [`compute_progressive_balances`] produce no record here either.
pub fn compute_sequence_steps(operations: &[TransferOperation]) -> SequenceReport {
    let mut balances = RunningBalances::new();
    let mut steps = Vec::new();
    let mut progressions: Vec<AccountProgression> = Vec::new();
    let mut total_amount = Decimal::ZERO;

    for operation in in_sequence(operations) {
        total_amount = total_amount.saturating_add(operation.amount.unwrap_or(Decimal::ZERO));
        let Some((source, destination, amount)) = operation.complete_parts() else {
            continue;
        };

        let source_before = balances.delta(&source);
        let destination_before = balances.delta(&destination);
        if balances.transfer(&source, &destination, amount).is_none() {
            warn!(row = operation.sequence_index, %amount, "transfer overflows, skipped");
            continue;
        }
        let step = StepRecord {
            sequence_index: operation.sequence_index,
            position: operation.sequence_index + 1,
            source_before,
            source_after: balances.delta(&source),
            destination_before,
            destination_after: balances.delta(&destination),
            source,
            destination,
            amount,
        };

        record_progression(
            &mut progressions,
            &step.source,
            ProgressionEntry {
                position: step.position,
                side: ProgressionSide::From,
                before: step.source_before,
                after: step.source_after,
                change: -amount,
            },
        );
        record_progression(
            &mut progressions,
            &step.destination,
            ProgressionEntry {
                position: step.position,
                side: ProgressionSide::To,
                before: step.destination_before,
                after: step.destination_after,
                change: amount,
            },
        );
        steps.push(step);
    }

    for progression in &mut progressions {
        progression.final_delta = balances.delta(&progression.key);
    }

    let summary = TransferSummary {
        total_amount,
        complete_transfers: steps.len(),
        total_transfers: operations.len(),
        affected_accounts: progressions.len(),
    };
    debug!(
        steps = summary.complete_transfers,
        rows = summary.total_transfers,
        "computed transfer sequence"
    );

    SequenceReport {
        steps,
        balances,
        progressions,
        summary,
    }
}

fn record_progression(
    progressions: &mut Vec<AccountProgression>,
    key: &AccountKey,
    entry: ProgressionEntry,
) {
    match progressions.iter_mut().find(|progression| &progression.key == key) {
        Some(progression) => progression.entries.push(entry),
        None => progressions.push(AccountProgression {
            key: key.clone(),
            entries: vec![entry],
            final_delta: Decimal::ZERO,
        }),
    }
}

/// Operations in ascending sequence order; ties keep their list order.
fn in_sequence(operations: &[TransferOperation]) -> Vec<&TransferOperation> {
    let mut ordered: Vec<&TransferOperation> = operations.iter().collect();
    ordered.sort_by_key(|operation| operation.sequence_index);
    ordered
}
