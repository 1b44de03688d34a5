use splitsage_balances::PlanError;
use splitsage_ledger::LedgerError;
use splitsage_store::PolicyViolation;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    InvariantViolation(#[from] LedgerError),
    #[error(transparent)]
    Unbalanced(#[from] PlanError),
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),
}
