//! Core domain types shared by every SplitSage crate.

mod currency;
mod expense;
mod group;
mod ids;
mod scope;
mod user;

pub use currency::{Currency, CurrencyUnits, MAX_EXPONENT};
pub use expense::{Expense, ExpenseCategory, ExpenseSplit};
pub use group::{Group, GroupMember, GroupRole};
pub use ids::{ExpenseId, FriendshipId, GroupId, UserId};
pub use scope::{ChangeKind, Scope};
pub use user::{Friendship, FriendshipStatus, User, UserPreferences};
