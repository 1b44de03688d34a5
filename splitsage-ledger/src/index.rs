use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use splitsage_core::{Currency, CurrencyUnits, Expense, ExpenseId, GroupId, UserId};

use crate::journal::{entries_from_expense, reversal_entries};
use crate::validation::validate_expense;
use crate::{LedgerAccount, LedgerEntry, LedgerError, LedgerKey, LedgerResult, Violation};

/// Signed positions keyed by currency, then by user.
pub type CurrencyPositions = BTreeMap<Currency, BTreeMap<UserId, Decimal>>;

/// How an expense changed relative to what the index already holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LedgerOperation {
    Add,
    Update,
    Remove,
}

/// Keys whose balance changed while applying one batch.
pub type AffectedKeys = BTreeSet<LedgerKey>;

#[derive(Clone, Debug, Default)]
struct GroupLedger {
    members: BTreeSet<UserId>,
    positions: CurrencyPositions,
    outstanding: HashMap<UserId, usize>,
}

/// In-memory index of every money movement implied by the applied expenses.
///
/// The index keeps the version of each expense it applied so that removals
/// and updates always reverse exactly what was posted. Every mutation is
/// validated before anything is touched, so a failed call leaves the index
/// unchanged.
#[derive(Clone, Debug, Default)]
pub struct LedgerIndex {
    version: u64,
    units: CurrencyUnits,
    expenses: HashMap<ExpenseId, Expense>,
    groups: BTreeMap<GroupId, GroupLedger>,
    /// user -> currency -> counterparty -> position
    personal: BTreeMap<UserId, BTreeMap<Currency, BTreeMap<UserId, Decimal>>>,
}

impl LedgerIndex {
    pub fn new(units: CurrencyUnits) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    /// Build an index from scratch out of a full expense list.
    pub fn rebuild<I>(units: CurrencyUnits, expenses: I) -> LedgerResult<Self>
    where
        I: IntoIterator<Item = Expense>,
    {
        let mut index = Self::new(units);
        for expense in expenses {
            index.apply(&expense, LedgerOperation::Add)?;
        }
        Ok(index)
    }

    /// Monotonic counter bumped once per applied batch.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn units(&self) -> &CurrencyUnits {
        &self.units
    }

    /// Apply one expense change and return the balances it touched.
    ///
    /// `Add` of an expense the index already holds behaves like `Update`, and
    /// `Remove` of an unknown expense is a no-op, which keeps replays safe.
    pub fn apply(&mut self, expense: &Expense, op: LedgerOperation) -> LedgerResult<AffectedKeys> {
        let previous = self.expenses.get(&expense.id).cloned();
        let next = match op {
            LedgerOperation::Add | LedgerOperation::Update => {
                validate_expense(expense, &self.units)?;
                Some(expense.clone())
            }
            LedgerOperation::Remove => None,
        };
        if previous.is_none() && next.is_none() {
            return Ok(AffectedKeys::new());
        }

        let mut entries = Vec::new();
        if let Some(old) = &previous {
            entries.extend(reversal_entries(old));
        }
        if let Some(new) = &next {
            entries.extend(entries_from_expense(new));
        }

        self.check_postings(&expense.id, &entries)?;
        let affected = self.post(&entries);
        if let Some(old) = &previous {
            self.track_outstanding(old, false);
        }
        match next {
            Some(new) => {
                self.track_outstanding(&new, true);
                self.expenses.insert(new.id.clone(), new);
            }
            None => {
                self.expenses.remove(&expense.id);
            }
        }
        self.version += 1;
        Ok(affected)
    }

    /// Record that a user belongs to a group so it reports them even at zero.
    pub fn register_member(&mut self, group: &GroupId, user: &UserId) -> bool {
        let inserted = self
            .groups
            .entry(group.clone())
            .or_default()
            .members
            .insert(user.clone());
        if inserted {
            self.version += 1;
        }
        inserted
    }

    pub fn unregister_member(&mut self, group: &GroupId, user: &UserId) -> bool {
        let removed = self
            .groups
            .get_mut(group)
            .map(|ledger| ledger.members.remove(user))
            .unwrap_or(false);
        if removed {
            self.prune_group(group);
            self.version += 1;
        }
        removed
    }

    pub fn expense(&self, id: &ExpenseId) -> Option<&Expense> {
        self.expenses.get(id)
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Expense> + '_ {
        self.expenses.values()
    }

    pub fn group_ids(&self) -> impl Iterator<Item = &GroupId> + '_ {
        self.groups.keys()
    }

    pub fn group_members(&self, group: &GroupId) -> impl Iterator<Item = &UserId> + '_ {
        self.groups
            .get(group)
            .into_iter()
            .flat_map(|ledger| ledger.members.iter())
    }

    /// Non-zero positions of a group, per currency.
    pub fn group_positions(&self, group: &GroupId) -> Option<&CurrencyPositions> {
        self.groups.get(group).map(|ledger| &ledger.positions)
    }

    /// Personal positions of `user` against each counterparty, per currency.
    pub fn personal_positions(
        &self,
        user: &UserId,
    ) -> Option<&BTreeMap<Currency, BTreeMap<UserId, Decimal>>> {
        self.personal.get(user)
    }

    pub fn personal_users(&self) -> impl Iterator<Item = &UserId> + '_ {
        self.personal.keys()
    }

    /// Number of unpaid splits `user` still owes inside `group`.
    pub fn outstanding_splits(&self, group: &GroupId, user: &UserId) -> usize {
        self.groups
            .get(group)
            .and_then(|ledger| ledger.outstanding.get(user))
            .copied()
            .unwrap_or(0)
    }

    fn position(&self, account: &LedgerAccount, currency: &Currency) -> Decimal {
        let position = match account {
            LedgerAccount::Group { group, user } => self
                .groups
                .get(group)
                .and_then(|ledger| ledger.positions.get(currency))
                .and_then(|positions| positions.get(user)),
            LedgerAccount::Pairwise { user, counterparty } => self
                .personal
                .get(user)
                .and_then(|by_currency| by_currency.get(currency))
                .and_then(|positions| positions.get(counterparty)),
        };
        position.copied().unwrap_or_default()
    }

    /// Replay `entries` against the current positions without touching them.
    fn check_postings(&self, expense: &ExpenseId, entries: &[LedgerEntry]) -> LedgerResult<()> {
        let mut staged: HashMap<(&LedgerAccount, &Currency), Decimal> = HashMap::new();
        for entry in entries {
            let slot = staged
                .entry((&entry.account, &entry.currency))
                .or_insert_with(|| self.position(&entry.account, &entry.currency));
            *slot = slot
                .checked_add(entry.amount)
                .ok_or_else(|| LedgerError::InvariantViolation {
                    expense: expense.clone(),
                    violation: Violation::AmountOverflow {
                        currency: entry.currency.clone(),
                    },
                })?;
        }
        Ok(())
    }

    fn post(&mut self, entries: &[LedgerEntry]) -> AffectedKeys {
        let mut affected = AffectedKeys::new();
        for entry in entries {
            match &entry.account {
                LedgerAccount::Group { group, user } => {
                    let ledger = self.groups.entry(group.clone()).or_default();
                    adjust(
                        ledger.positions.entry(entry.currency.clone()).or_default(),
                        user,
                        entry.amount,
                    );
                    if ledger.positions.get(&entry.currency).is_some_and(BTreeMap::is_empty) {
                        ledger.positions.remove(&entry.currency);
                    }
                }
                LedgerAccount::Pairwise { user, counterparty } => {
                    let by_currency = self.personal.entry(user.clone()).or_default();
                    adjust(
                        by_currency.entry(entry.currency.clone()).or_default(),
                        counterparty,
                        entry.amount,
                    );
                    if by_currency.get(&entry.currency).is_some_and(BTreeMap::is_empty) {
                        by_currency.remove(&entry.currency);
                    }
                    if by_currency.is_empty() {
                        self.personal.remove(user);
                    }
                }
            }
            affected.insert(entry.key());
        }
        let touched: BTreeSet<GroupId> = entries
            .iter()
            .filter_map(|entry| match &entry.account {
                LedgerAccount::Group { group, .. } => Some(group.clone()),
                LedgerAccount::Pairwise { .. } => None,
            })
            .collect();
        for group in touched {
            self.prune_group(&group);
        }
        affected
    }

    fn track_outstanding(&mut self, expense: &Expense, add: bool) {
        let Some(group) = &expense.group_id else {
            return;
        };
        let ledger = self.groups.entry(group.clone()).or_default();
        for split in expense.outstanding_splits() {
            if add {
                *ledger.outstanding.entry(split.user_id.clone()).or_default() += 1;
            } else if let Some(count) = ledger.outstanding.get_mut(&split.user_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ledger.outstanding.remove(&split.user_id);
                }
            }
        }
        self.prune_group(group);
    }

    fn prune_group(&mut self, group: &GroupId) {
        let empty = self.groups.get(group).is_some_and(|ledger| {
            ledger.members.is_empty() && ledger.positions.is_empty() && ledger.outstanding.is_empty()
        });
        if empty {
            self.groups.remove(group);
        }
    }
}

fn adjust(positions: &mut BTreeMap<UserId, Decimal>, user: &UserId, delta: Decimal) {
    let slot = positions.entry(user.clone()).or_default();
    *slot += delta;
    if slot.is_zero() {
        positions.remove(user);
    }
}
