//! In-memory collaborator stores for expenses, groups and users.
//!
//! Expense and group stores publish every mutation on a shared
//! [`splitsage_events::EventBus`] so the balance engine can follow along.

mod error;
mod expenses;
mod groups;
mod users;

pub use error::{PolicyViolation, StoreError, StoreResult};
pub use expenses::{ExpenseFilter, ExpenseRepository, InMemoryExpenseStore};
pub use groups::{GroupRepository, InMemoryGroupStore, MembershipGuard};
pub use users::{InMemoryUserStore, UserRepository};
