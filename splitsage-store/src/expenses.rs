use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use splitsage_core::{ChangeKind, CurrencyUnits, Expense, ExpenseId, GroupId, UserId};
use splitsage_events::{Event, EventBus, EventFilter, EventStream, ExpenseChange};
use splitsage_ledger::validate_expense;
use tracing::debug;

use crate::{StoreError, StoreResult};

/// Narrows an expense listing to the side of the debt a user is on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExpenseFilter {
    #[default]
    All,
    /// Someone else paid and the user still has an unpaid split.
    IOwe,
    /// The user paid and at least one split is still unpaid.
    ImOwed,
}

impl ExpenseFilter {
    pub fn matches(self, expense: &Expense, user: &UserId) -> bool {
        match self {
            ExpenseFilter::All => true,
            ExpenseFilter::IOwe => {
                &expense.paid_by != user
                    && expense
                        .splits
                        .iter()
                        .any(|split| &split.user_id == user && !split.paid)
            }
            ExpenseFilter::ImOwed => {
                &expense.paid_by == user && expense.splits.iter().any(|split| !split.paid)
            }
        }
    }
}

/// Expense collaborator: CRUD plus change notification.
pub trait ExpenseRepository: Send + Sync {
    fn all(&self) -> Vec<Expense>;

    fn get(&self, id: &ExpenseId) -> Option<Expense>;

    fn by_group(&self, group: &GroupId) -> Vec<Expense> {
        self.matching(&|expense| expense.group_id.as_ref() == Some(group))
    }

    fn by_payer(&self, user: &UserId) -> Vec<Expense> {
        self.matching(&|expense| &expense.paid_by == user)
    }

    /// Expenses the user paid for or owes a share of.
    fn involving_user(&self, user: &UserId) -> Vec<Expense> {
        self.matching(&|expense| expense.involves(user))
    }

    /// Expenses dated within `[from, to]`.
    fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Expense> {
        self.matching(&|expense| expense.date >= from && expense.date <= to)
    }

    fn filtered(&self, filter: ExpenseFilter, user: &UserId) -> Vec<Expense> {
        self.matching(&|expense| filter.matches(expense, user))
    }

    fn matching(&self, predicate: &dyn Fn(&Expense) -> bool) -> Vec<Expense>;

    /// Store a new expense. Malformed expenses are rejected before storage.
    fn add(&self, expense: Expense) -> StoreResult<ExpenseId>;

    /// Replace an existing expense; `Ok(false)` when the id is unknown.
    fn update(&self, expense: Expense) -> StoreResult<bool>;

    fn delete(&self, id: &ExpenseId) -> StoreResult<bool>;

    /// Mark the unpaid split of `user` as settled; `Ok(false)` when there is none.
    fn settle_split(&self, id: &ExpenseId, user: &UserId, at: DateTime<Utc>) -> StoreResult<bool>;

    fn subscribe_changes(&self) -> EventStream;
}

/// Insertion-ordered in-memory expense store.
pub struct InMemoryExpenseStore {
    expenses: RwLock<Vec<Expense>>,
    units: CurrencyUnits,
    bus: EventBus,
}

impl InMemoryExpenseStore {
    pub fn new(bus: EventBus, units: CurrencyUnits) -> Self {
        Self {
            expenses: RwLock::new(Vec::new()),
            units,
            bus,
        }
    }

    fn publish(&self, kind: ChangeKind, expense: Expense, previous: Option<Expense>) {
        debug!(expense = %expense.id, kind = %kind, "publishing expense change");
        self.bus.publish(Event::Expense(ExpenseChange {
            kind,
            expense,
            previous,
        }));
    }
}

impl ExpenseRepository for InMemoryExpenseStore {
    fn all(&self) -> Vec<Expense> {
        self.expenses.read().clone()
    }

    fn get(&self, id: &ExpenseId) -> Option<Expense> {
        self.expenses
            .read()
            .iter()
            .find(|expense| &expense.id == id)
            .cloned()
    }

    fn matching(&self, predicate: &dyn Fn(&Expense) -> bool) -> Vec<Expense> {
        self.expenses
            .read()
            .iter()
            .filter(|expense| predicate(expense))
            .cloned()
            .collect()
    }

    fn add(&self, expense: Expense) -> StoreResult<ExpenseId> {
        validate_expense(&expense, &self.units)?;
        // Publishing under the lock keeps event order identical to mutation order.
        let mut expenses = self.expenses.write();
        if expenses.iter().any(|existing| existing.id == expense.id) {
            return Err(StoreError::DuplicateExpense(expense.id));
        }
        let id = expense.id.clone();
        expenses.push(expense.clone());
        self.publish(ChangeKind::Added, expense, None);
        Ok(id)
    }

    fn update(&self, expense: Expense) -> StoreResult<bool> {
        validate_expense(&expense, &self.units)?;
        let mut expenses = self.expenses.write();
        let Some(slot) = expenses.iter_mut().find(|existing| existing.id == expense.id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(slot, expense.clone());
        self.publish(ChangeKind::Updated, expense, Some(previous));
        Ok(true)
    }

    fn delete(&self, id: &ExpenseId) -> StoreResult<bool> {
        let mut expenses = self.expenses.write();
        let Some(position) = expenses.iter().position(|expense| &expense.id == id) else {
            return Ok(false);
        };
        let removed = expenses.remove(position);
        self.publish(ChangeKind::Removed, removed, None);
        Ok(true)
    }

    fn settle_split(&self, id: &ExpenseId, user: &UserId, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut expenses = self.expenses.write();
        let Some(expense) = expenses.iter_mut().find(|expense| &expense.id == id) else {
            return Ok(false);
        };
        let Some(position) = expense
            .splits
            .iter()
            .position(|split| &split.user_id == user && !split.paid)
        else {
            return Ok(false);
        };
        let previous = expense.clone();
        let split = &mut expense.splits[position];
        split.paid = true;
        split.paid_at = Some(at);
        let updated = expense.clone();
        self.publish(ChangeKind::Updated, updated, Some(previous));
        Ok(true)
    }

    fn subscribe_changes(&self) -> EventStream {
        self.bus.subscribe_filtered(EventFilter::Expenses)
    }
}
