use rust_decimal::Decimal;
use splitsage_core::{Currency, Scope};
use thiserror::Error;

/// Result alias for settlement planning.
pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PlanError {
    /// Balances of a scope do not net to zero, which means the ledger is corrupt.
    #[error("balances in {scope} ({currency}) are off by {residual}")]
    Unbalanced {
        scope: Scope,
        currency: Currency,
        residual: Decimal,
    },
}
