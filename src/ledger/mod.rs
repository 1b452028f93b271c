//! Budget request domain models: account keys, transfer rows, and requests.

pub mod account;
pub mod request;
pub mod transaction;

pub use account::AccountKey;
pub use request::{BudgetRequest, VirementType};
pub use transaction::{TransferItem, TransferOperation};
