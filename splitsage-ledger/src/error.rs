use rust_decimal::Decimal;
use splitsage_core::{Currency, ExpenseId, UserId};
use thiserror::Error;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type surfaced by ledger operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LedgerError {
    /// The expense is malformed and was not applied.
    #[error("invariant violation on expense {expense}: {violation}")]
    InvariantViolation {
        expense: ExpenseId,
        violation: Violation,
    },
}

impl LedgerError {
    pub fn expense(&self) -> &ExpenseId {
        match self {
            LedgerError::InvariantViolation { expense, .. } => expense,
        }
    }
}

/// Specific rule an expense broke.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Violation {
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("split owed by {user} is negative ({amount})")]
    NegativeSplit { user: UserId, amount: Decimal },
    #[error("splits sum to {split_total} but the amount is {amount} (tolerance {tolerance})")]
    SplitMismatch {
        amount: Decimal,
        split_total: Decimal,
        tolerance: Decimal,
    },
    #[error("amounts in {currency} leave the representable range")]
    AmountOverflow { currency: Currency },
}
