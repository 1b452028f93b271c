use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an account scoped to a specific budget (ledger).
///
/// The same account under two budgets is tracked as two keys, which is what
/// keeps Inter-Budget transfers from netting out across budgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey {
    pub account: String,
    pub ledger: String,
}

impl AccountKey {
    pub fn new(account: impl Into<String>, ledger: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ledger: ledger.into(),
        }
    }

    pub fn belongs_to(&self, ledger: &str) -> bool {
        self.ledger == ledger
    }
}

/// Renders as `account|ledger`, the key format used by account queries.
impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.account, self.ledger)
    }
}
