#![doc(test(attr(deny(warnings))))]

//! Virement Core computes progressive balances for budget transfer requests
//! and provides the form, validation and approval plumbing around them.
//!
//! ```
//! use rust_decimal_macros::dec;
//! use virement_core::ledger::TransferOperation;
//! use virement_core::progressive::compute_progressive_balances;
//!
//! let ops = vec![
//!     TransferOperation::within(0, "OPS", "Travel", "Fuel", dec!(100)),
//!     TransferOperation::within(1, "OPS", "Fuel", "Stationery", dec!(30)),
//! ];
//! let before_second_row = compute_progressive_balances(&ops, 1, None);
//! assert_eq!(before_second_row.len(), 2);
//! ```

pub mod balances;
pub mod config;
pub mod currency;
pub mod errors;
pub mod form;
pub mod ledger;
pub mod progressive;
pub mod utils;
pub mod validation;
pub mod workflow;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Virement Core tracing initialized.");
    });
}
