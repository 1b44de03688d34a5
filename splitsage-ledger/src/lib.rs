//! Ledger index deriving per-user money movements from shared expenses.

mod entry;
mod error;
mod index;
mod journal;
mod validation;

pub use entry::{LedgerAccount, LedgerEntry, LedgerKey, LedgerScope, LedgerType};
pub use error::{LedgerError, LedgerResult, Violation};
pub use index::{AffectedKeys, CurrencyPositions, LedgerIndex, LedgerOperation};
pub use journal::{entries_from_expense, reversal_entries};
pub use validation::{split_tolerance, validate_expense};
