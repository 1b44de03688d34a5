//! Fixtures shared by SplitSage integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use splitsage_core::{
    Currency, CurrencyUnits, Expense, ExpenseId, ExpenseSplit, Group, GroupId, GroupMember, User,
    UserId,
};
use splitsage_events::EventBus;
use splitsage_store::{GroupRepository, InMemoryExpenseStore, InMemoryGroupStore, InMemoryUserStore, UserRepository};

pub fn uid(id: &str) -> UserId {
    UserId::from(id)
}

pub fn gid(id: &str) -> GroupId {
    GroupId::from(id)
}

/// Fluent expense constructor with sensible defaults (USD, no group).
#[derive(Clone, Debug)]
pub struct ExpenseBuilder {
    expense: Expense,
}

impl ExpenseBuilder {
    pub fn new(id: &str, payer: &str, amount: Decimal) -> Self {
        Self {
            expense: Expense::new(id, amount, Currency::usd(), uid(payer)).with_id(ExpenseId::from(id)),
        }
    }

    pub fn currency(mut self, code: &str) -> Self {
        self.expense.currency = Currency::new(code);
        self
    }

    pub fn group(mut self, id: &str) -> Self {
        self.expense.group_id = Some(gid(id));
        self
    }

    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.expense.date = date;
        self
    }

    pub fn split(mut self, user: &str, amount: Decimal) -> Self {
        self.expense.splits.push(ExpenseSplit::new(uid(user), amount));
        self
    }

    pub fn paid_split(mut self, user: &str, amount: Decimal) -> Self {
        self.expense
            .splits
            .push(ExpenseSplit::new(uid(user), amount).settled(Utc::now()));
        self
    }

    /// Split the amount evenly in cents; the first user absorbs the remainder.
    pub fn equal_split(mut self, users: &[&str]) -> Self {
        if users.is_empty() {
            return self;
        }
        let share = (self.expense.amount / Decimal::from(users.len()))
            .round_dp_with_strategy(2, RoundingStrategy::ToZero);
        let remainder = self.expense.amount - share * Decimal::from(users.len());
        for (position, user) in users.iter().enumerate() {
            let amount = if position == 0 { share + remainder } else { share };
            self.expense.splits.push(ExpenseSplit::new(uid(user), amount));
        }
        self
    }

    pub fn build(self) -> Expense {
        self.expense
    }
}

/// Event bus plus the three in-memory stores, wired together.
pub struct StoreHarness {
    pub bus: EventBus,
    pub units: CurrencyUnits,
    pub expenses: Arc<InMemoryExpenseStore>,
    pub groups: Arc<InMemoryGroupStore>,
    pub users: Arc<InMemoryUserStore>,
}

impl Default for StoreHarness {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

impl StoreHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let bus = EventBus::new(capacity);
        let units = CurrencyUnits::new();
        Self {
            expenses: Arc::new(InMemoryExpenseStore::new(bus.clone(), units.clone())),
            groups: Arc::new(InMemoryGroupStore::new(bus.clone())),
            users: Arc::new(InMemoryUserStore::new()),
            bus,
            units,
        }
    }

    /// Register users whose id doubles as their lowercase email prefix.
    pub fn seed_users(&self, names: &[(&str, &str)]) {
        for (id, name) in names {
            let user = User::new(*name, format!("{id}@splitsage.test")).with_id(uid(id));
            if let Err(err) = self.users.create(user) {
                panic!("failed to seed user {id}: {err}");
            }
        }
    }

    /// Create a group whose first member is its creator.
    pub fn create_group(&self, id: &str, members: &[&str]) -> GroupId {
        let Some((creator, rest)) = members.split_first() else {
            panic!("group {id} needs at least one member");
        };
        let group = rest.iter().fold(
            Group::new(id, uid(creator)).with_id(gid(id)),
            |group, member| group.with_member(GroupMember::member(uid(member))),
        );
        match self.groups.create(group) {
            Ok(id) => id,
            Err(err) => panic!("failed to create group {id}: {err}"),
        }
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
