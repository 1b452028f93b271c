use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountKey;

/// One transfer row as the calculator sees it.
///
/// Fields stay optional so rows that are still being edited can travel through
/// the calculator; they simply do not contribute until they are complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferOperation {
    pub sequence_index: usize,
    pub source_account: Option<String>,
    pub destination_account: Option<String>,
    pub source_ledger: String,
    pub destination_ledger: String,
    pub amount: Option<Decimal>,
}

impl TransferOperation {
    pub fn new(
        sequence_index: usize,
        source: AccountKey,
        destination: AccountKey,
        amount: Decimal,
    ) -> Self {
        Self {
            sequence_index,
            source_account: Some(source.account),
            destination_account: Some(destination.account),
            source_ledger: source.ledger,
            destination_ledger: destination.ledger,
            amount: Some(amount),
        }
    }

    /// Builds an operation whose two sides live in the same ledger.
    pub fn within(
        sequence_index: usize,
        ledger: impl Into<String>,
        source_account: impl Into<String>,
        destination_account: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        let ledger = ledger.into();
        Self::new(
            sequence_index,
            AccountKey::new(source_account, ledger.clone()),
            AccountKey::new(destination_account, ledger),
            amount,
        )
    }

    /// A placeholder row with nothing filled in yet.
    pub fn blank(sequence_index: usize, ledger: impl Into<String>) -> Self {
        let ledger = ledger.into();
        Self {
            sequence_index,
            source_account: None,
            destination_account: None,
            source_ledger: ledger.clone(),
            destination_ledger: ledger,
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: Option<Decimal>) -> Self {
        self.amount = amount;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.complete_parts().is_some()
    }

    /// Returns `(source, destination, amount)` when the row can contribute.
    pub fn complete_parts(&self) -> Option<(AccountKey, AccountKey, Decimal)> {
        let source = non_empty(self.source_account.as_deref())?;
        let destination = non_empty(self.destination_account.as_deref())?;
        let amount = self.amount.filter(|amount| *amount > Decimal::ZERO)?;
        Some((
            AccountKey::new(source, self.source_ledger.clone()),
            AccountKey::new(destination, self.destination_ledger.clone()),
            amount,
        ))
    }
}

/// A transfer row stored on a budget request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl TransferItem {
    pub fn new(
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account: Some(from_account.into()),
            to_account: Some(to_account.into()),
            amount: Some(amount),
        }
    }

    pub fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account: None,
            to_account: None,
            amount: None,
        }
    }

    pub fn from_account(&self) -> Option<&str> {
        non_empty(self.from_account.as_deref())
    }

    pub fn to_account(&self) -> Option<&str> {
        non_empty(self.to_account.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
