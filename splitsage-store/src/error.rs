use splitsage_core::{ExpenseId, GroupId, UserId};
use splitsage_ledger::LedgerError;
use thiserror::Error;

/// Result alias for store mutations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A membership change was refused by business rules.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{user} still owes {outstanding} unpaid split(s) in group {group}")]
pub struct PolicyViolation {
    pub group: GroupId,
    pub user: UserId,
    pub outstanding: usize,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    InvariantViolation(#[from] LedgerError),
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),
    #[error("expense {0} already exists")]
    DuplicateExpense(ExpenseId),
    #[error("group {0} must keep at least one member")]
    EmptyGroup(GroupId),
    #[error("group {0} already exists")]
    DuplicateGroup(GroupId),
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("friendship between {0} and {1} already exists")]
    DuplicateFriendship(UserId, UserId),
}
