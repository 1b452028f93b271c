//! Original balance lookups and the cache the form projects balances through.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::errors::Result;
use crate::ledger::AccountKey;
use crate::progressive::RunningBalances;

/// Source of the balances budgets held before a request is applied.
pub trait BalanceLookup {
    /// Balance of `key.account` under budget `key.ledger`, if the budget
    /// carries that account.
    fn original_balance(&self, key: &AccountKey) -> Option<Decimal>;

    /// Accounts carried by `ledger`.
    fn accounts(&self, ledger: &str) -> Vec<String>;
}

impl<L: BalanceLookup + ?Sized> BalanceLookup for &L {
    fn original_balance(&self, key: &AccountKey) -> Option<Decimal> {
        (**self).original_balance(key)
    }

    fn accounts(&self, ledger: &str) -> Vec<String> {
        (**self).accounts(ledger)
    }
}

/// Budget → account → amount table, typically loaded from a JSON snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct InMemoryBalances {
    budgets: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        ledger: impl Into<String>,
        account: impl Into<String>,
        amount: Decimal,
    ) {
        self.budgets
            .entry(ledger.into())
            .or_default()
            .insert(account.into(), amount);
    }

    pub fn with(mut self, ledger: &str, account: &str, amount: Decimal) -> Self {
        self.insert(ledger, account, amount);
        self
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl BalanceLookup for InMemoryBalances {
    fn original_balance(&self, key: &AccountKey) -> Option<Decimal> {
        self.budgets.get(&key.ledger)?.get(&key.account).copied()
    }

    fn accounts(&self, ledger: &str) -> Vec<String> {
        self.budgets
            .get(ledger)
            .map(|accounts| accounts.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Absolute balance once a progressive delta is applied.
pub fn project_balance(original: Decimal, delta: Decimal) -> Decimal {
    original.saturating_add(delta)
}

/// Whether an account can fund a requested amount.
///
/// A shortfall is not an error: approving the request amends the budget by
/// that much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCheck {
    pub available: Decimal,
    pub requested: Decimal,
    pub shortfall: Decimal,
}

impl BudgetCheck {
    /// The sign of `requested` is ignored.
    pub fn new(available: Decimal, requested: Decimal) -> Self {
        let requested = requested.abs();
        Self {
            available,
            requested,
            shortfall: requested.saturating_sub(available).max(Decimal::ZERO),
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.shortfall.is_zero()
    }
}

/// An account offered in a picker, with the balance it would show after the
/// rows above the picker are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOption {
    pub account: String,
    pub projected_balance: Decimal,
}

/// Memoizes original balances per account key.
///
/// Entries are dropped per ledger with [`BalanceCache::invalidate_ledger`]
/// whenever the rows touching that ledger change.
#[derive(Debug)]
pub struct BalanceCache<L> {
    lookup: L,
    entries: HashMap<AccountKey, Decimal>,
}

impl<L: BalanceLookup> BalanceCache<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Original balance for `key`; accounts the budget does not carry read as zero.
    pub fn original(&mut self, key: &AccountKey) -> Decimal {
        if let Some(cached) = self.entries.get(key) {
            return *cached;
        }
        let value = self.lookup.original_balance(key).unwrap_or_else(|| {
            debug!(key = %key, "no original balance, assuming zero");
            Decimal::ZERO
        });
        trace!(key = %key, %value, "cached original balance");
        self.entries.insert(key.clone(), value);
        value
    }

    pub fn projected(&mut self, key: &AccountKey, deltas: &RunningBalances) -> Decimal {
        project_balance(self.original(key), deltas.delta(key))
    }

    /// Checks `key` against `requested` once `deltas` are applied.
    pub fn check_budget(
        &mut self,
        key: &AccountKey,
        deltas: &RunningBalances,
        requested: Decimal,
    ) -> BudgetCheck {
        BudgetCheck::new(self.projected(key, deltas), requested)
    }

    /// Accounts of `ledger` with their projected balances, sorted by account
    /// and without `exclude`. A non-blank `query` keeps only accounts whose
    /// name contains it, ignoring case.
    pub fn account_options(
        &mut self,
        ledger: &str,
        deltas: &RunningBalances,
        exclude: Option<&str>,
        query: Option<&str>,
    ) -> Vec<AccountOption> {
        let needle = query
            .map(|query| query.trim().to_lowercase())
            .filter(|query| !query.is_empty());
        let mut accounts = self.lookup.accounts(ledger);
        accounts.sort();
        accounts
            .into_iter()
            .filter(|account| Some(account.as_str()) != exclude)
            .filter(|account| match &needle {
                Some(needle) => account.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .map(|account| {
                let key = AccountKey::new(account.clone(), ledger);
                AccountOption {
                    projected_balance: self.projected(&key, deltas),
                    account,
                }
            })
            .collect()
    }

    /// Drops every cached entry of `ledger`; returns how many were dropped.
    pub fn invalidate_ledger(&mut self, ledger: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.belongs_to(ledger));
        let dropped = before - self.entries.len();
        debug!(ledger, dropped, "invalidated balance cache");
        dropped
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransferOperation;
    use crate::progressive::compute_progressive_balances;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    struct CountingLookup {
        inner: InMemoryBalances,
        calls: Cell<usize>,
    }

    impl BalanceLookup for CountingLookup {
        fn original_balance(&self, key: &AccountKey) -> Option<Decimal> {
            self.calls.set(self.calls.get() + 1);
            self.inner.original_balance(key)
        }

        fn accounts(&self, ledger: &str) -> Vec<String> {
            self.inner.accounts(ledger)
        }
    }

    fn sample() -> InMemoryBalances {
        InMemoryBalances::new()
            .with("OPS", "Travel", dec!(1000))
            .with("OPS", "Stationery", dec!(200))
            .with("CAPEX", "Vehicles", dec!(5000))
    }

    #[test]
    fn cache_hits_skip_the_lookup() {
        let lookup = CountingLookup {
            inner: sample(),
            calls: Cell::new(0),
        };
        let mut cache = BalanceCache::new(lookup);
        let key = AccountKey::new("Travel", "OPS");
        assert_eq!(cache.original(&key), dec!(1000));
        assert_eq!(cache.original(&key), dec!(1000));
        assert_eq!(cache.lookup().calls.get(), 1);
    }

    #[test]
    fn invalidate_ledger_only_drops_that_ledger() {
        let mut cache = BalanceCache::new(sample());
        cache.original(&AccountKey::new("Travel", "OPS"));
        cache.original(&AccountKey::new("Stationery", "OPS"));
        cache.original(&AccountKey::new("Vehicles", "CAPEX"));
        assert_eq!(cache.invalidate_ledger("OPS"), 2);
        assert_eq!(cache.len(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_accounts_read_as_zero() {
        let mut cache = BalanceCache::new(sample());
        assert_eq!(cache.original(&AccountKey::new("Unknown", "OPS")), Decimal::ZERO);
    }

    #[test]
    fn account_options_apply_deltas_and_exclusion() {
        let ops = vec![TransferOperation::within(0, "OPS", "Travel", "Stationery", dec!(150))];
        let deltas = compute_progressive_balances(&ops, 1, Some("OPS"));
        let balances = sample();
        let mut cache = BalanceCache::new(&balances);
        let options = cache.account_options("OPS", &deltas, Some("Travel"), None);
        assert_eq!(
            options,
            vec![AccountOption {
                account: "Stationery".into(),
                projected_balance: dec!(350),
            }]
        );
    }

    #[test]
    fn account_options_filter_by_search_text() {
        let balances = sample().with("OPS", "Travel Allowance", dec!(80));
        let mut cache = BalanceCache::new(&balances);
        let deltas = RunningBalances::new();

        let names = |options: Vec<AccountOption>| -> Vec<String> {
            options.into_iter().map(|option| option.account).collect()
        };
        assert_eq!(
            names(cache.account_options("OPS", &deltas, None, Some("  travel "))),
            vec!["Travel", "Travel Allowance"]
        );
        assert_eq!(
            names(cache.account_options("OPS", &deltas, Some("Travel"), Some("ALLOW"))),
            vec!["Travel Allowance"]
        );
        assert_eq!(cache.account_options("OPS", &deltas, None, Some("")).len(), 3);
        assert!(cache.account_options("OPS", &deltas, None, Some("fuel")).is_empty());
    }

    #[test]
    fn budget_check_reports_shortfall_after_deltas() {
        let ops = vec![TransferOperation::within(0, "OPS", "Stationery", "Travel", dec!(150))];
        let deltas = compute_progressive_balances(&ops, 1, None);
        let mut cache = BalanceCache::new(sample());
        let key = AccountKey::new("Stationery", "OPS");

        let check = cache.check_budget(&key, &deltas, dec!(80));
        assert_eq!(check.available, dec!(50));
        assert_eq!(check.shortfall, dec!(30));
        assert!(!check.is_sufficient());

        let check = cache.check_budget(&key, &deltas, dec!(-50));
        assert_eq!(check.requested, dec!(50));
        assert!(check.is_sufficient());
        assert_eq!(check.shortfall, Decimal::ZERO);
    }

    #[test]
    fn loads_snapshot_json() {
        let json = r#"{"OPS": {"Travel": 1000.50}, "CAPEX": {"Vehicles": "5000"}}"#;
        let balances: InMemoryBalances = serde_json::from_str(json).expect("parse");
        assert_eq!(
            balances.original_balance(&AccountKey::new("Travel", "OPS")),
            Some(dec!(1000.50))
        );
        assert_eq!(balances.accounts("CAPEX"), vec!["Vehicles".to_string()]);
    }
}
