use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitsage_core::{Currency, GroupId, Scope, UserId};
use splitsage_ledger::LedgerIndex;

use crate::Transfer;

/// Net position of one user in one scope, partitioned by currency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    amounts: BTreeMap<Currency, Decimal>,
}

impl Balance {
    /// Signed amount in `currency`; zero when the user has no activity in it.
    pub fn get(&self, currency: &Currency) -> Decimal {
        self.amounts.get(currency).copied().unwrap_or_default()
    }

    pub fn is_settled(&self) -> bool {
        self.amounts.values().all(Decimal::is_zero)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> + '_ {
        self.amounts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Currency, &Decimal)> + '_ {
        self.amounts.iter()
    }

    fn add(&mut self, currency: &Currency, delta: Decimal) {
        if delta.is_zero() {
            return;
        }
        let slot = self.amounts.entry(currency.clone()).or_default();
        *slot = slot.saturating_add(delta);
        if slot.is_zero() {
            self.amounts.remove(currency);
        }
    }
}

/// Every balance of a scope, per currency, plus the users the scope knows about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub scope: Scope,
    balances: BTreeMap<Currency, BTreeMap<UserId, Decimal>>,
    participants: BTreeSet<UserId>,
}

impl BalanceSheet {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            balances: BTreeMap::new(),
            participants: BTreeSet::new(),
        }
    }

    /// Seed a balance directly, e.g. to preview a plan for hand-entered positions.
    pub fn with_balance(mut self, user: UserId, currency: Currency, amount: Decimal) -> Self {
        self.adjust(&user, &currency, amount);
        self
    }

    pub fn balance(&self, user: &UserId, currency: &Currency) -> Decimal {
        self.balances
            .get(currency)
            .and_then(|by_user| by_user.get(user))
            .copied()
            .unwrap_or_default()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> + '_ {
        self.balances.keys()
    }

    /// Non-zero balances in one currency, ordered by user id.
    pub fn in_currency(&self, currency: &Currency) -> Option<&BTreeMap<UserId, Decimal>> {
        self.balances.get(currency)
    }

    /// Members and every user holding a position, including settled members.
    pub fn participants(&self) -> impl Iterator<Item = &UserId> + '_ {
        self.participants.iter()
    }

    /// Sum of all balances in one currency. Zero for a consistent ledger.
    pub fn residual(&self, currency: &Currency) -> Decimal {
        self.balances
            .get(currency)
            .map(|by_user| sum_saturating(by_user.values()))
            .unwrap_or_default()
    }

    pub fn is_settled(&self) -> bool {
        self.balances.is_empty()
    }

    /// Reflect a payment from `transfer.from` to `transfer.to`.
    pub fn apply_transfer(&mut self, transfer: &Transfer) {
        self.adjust(&transfer.from, &transfer.currency, transfer.amount);
        self.adjust(&transfer.to, &transfer.currency, -transfer.amount);
    }

    fn adjust(&mut self, user: &UserId, currency: &Currency, delta: Decimal) {
        self.participants.insert(user.clone());
        if delta.is_zero() {
            return;
        }
        let by_user = self.balances.entry(currency.clone()).or_default();
        let slot = by_user.entry(user.clone()).or_default();
        *slot = slot.saturating_add(delta);
        if slot.is_zero() {
            by_user.remove(user);
        }
        if by_user.is_empty() {
            self.balances.remove(currency);
        }
    }
}

/// Aggregates across scopes may exceed what a single position can hold; they clamp.
fn sum_saturating<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |total, amount| total.saturating_add(*amount))
}

/// Pure reduction of a [`LedgerIndex`] into per-scope net balances.
pub struct NetBalanceCalculator<'a> {
    index: &'a LedgerIndex,
}

impl<'a> NetBalanceCalculator<'a> {
    pub fn new(index: &'a LedgerIndex) -> Self {
        Self { index }
    }

    /// Net position of `user` in `scope`. Unknown users and scopes yield zero.
    pub fn balance_for(&self, scope: &Scope, user: &UserId) -> Balance {
        let mut balance = Balance::default();
        match scope {
            Scope::Group(group) => self.add_group_position(&mut balance, group, user),
            Scope::Global => {
                for group in self.index.group_ids() {
                    self.add_group_position(&mut balance, group, user);
                }
                for (currency, counterparties) in
                    self.index.personal_positions(user).into_iter().flatten()
                {
                    balance.add(currency, sum_saturating(counterparties.values()));
                }
            }
        }
        balance
    }

    /// Balances of every participant of `scope`.
    pub fn all_balances(&self, scope: &Scope) -> BalanceSheet {
        let mut sheet = BalanceSheet::new(scope.clone());
        match scope {
            Scope::Group(group) => self.add_group(&mut sheet, group),
            Scope::Global => {
                for group in self.index.group_ids() {
                    self.add_group(&mut sheet, group);
                }
                for user in self.index.personal_users() {
                    for (currency, counterparties) in
                        self.index.personal_positions(user).into_iter().flatten()
                    {
                        sheet.adjust(user, currency, sum_saturating(counterparties.values()));
                    }
                }
            }
        }
        sheet
    }

    /// Personal position of `user` against `counterparty`, outside any group.
    pub fn pairwise_balance(&self, user: &UserId, counterparty: &UserId) -> Balance {
        let mut balance = Balance::default();
        for (currency, counterparties) in self.index.personal_positions(user).into_iter().flatten()
        {
            if let Some(amount) = counterparties.get(counterparty) {
                balance.add(currency, *amount);
            }
        }
        balance
    }

    fn add_group_position(&self, balance: &mut Balance, group: &GroupId, user: &UserId) {
        for (currency, positions) in self.index.group_positions(group).into_iter().flatten() {
            if let Some(amount) = positions.get(user) {
                balance.add(currency, *amount);
            }
        }
    }

    fn add_group(&self, sheet: &mut BalanceSheet, group: &GroupId) {
        for member in self.index.group_members(group) {
            sheet.participants.insert(member.clone());
        }
        for (currency, positions) in self.index.group_positions(group).into_iter().flatten() {
            for (user, amount) in positions {
                sheet.adjust(user, currency, *amount);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use splitsage_core::{Expense, ExpenseSplit};
    use splitsage_ledger::LedgerOperation;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn index() -> LedgerIndex {
        let mut index = LedgerIndex::default();
        let trip = Expense::new("hotel", dec!(90), Currency::usd(), user("a"))
            .in_group(GroupId::from("trip"))
            .with_splits([
                ExpenseSplit::new(user("a"), dec!(30)),
                ExpenseSplit::new(user("b"), dec!(30)),
                ExpenseSplit::new(user("c"), dec!(30)),
            ]);
        let flat = Expense::new("internet", dec!(40), Currency::usd(), user("b"))
            .in_group(GroupId::from("flat"))
            .with_splits([
                ExpenseSplit::new(user("a"), dec!(20)),
                ExpenseSplit::new(user("b"), dec!(20)),
            ]);
        let coffee = Expense::new("coffee", dec!(5), Currency::new("EUR"), user("c"))
            .with_split(ExpenseSplit::new(user("a"), dec!(5)));
        for expense in [trip, flat, coffee] {
            index.apply(&expense, LedgerOperation::Add).unwrap();
        }
        index.register_member(&GroupId::from("trip"), &user("d"));
        index
    }

    #[test]
    fn group_scope_reports_only_that_group() {
        let index = index();
        let calc = NetBalanceCalculator::new(&index);
        let scope = Scope::group("trip");
        assert_eq!(calc.balance_for(&scope, &user("a")).get(&Currency::usd()), dec!(60));
        assert_eq!(calc.balance_for(&scope, &user("b")).get(&Currency::usd()), dec!(-30));
        let sheet = calc.all_balances(&scope);
        assert_eq!(sheet.residual(&Currency::usd()), Decimal::ZERO);
        assert!(sheet.participants().any(|member| member == &user("d")));
        assert_eq!(sheet.balance(&user("d"), &Currency::usd()), Decimal::ZERO);
        assert!(sheet.in_currency(&Currency::new("EUR")).is_none());
    }

    #[test]
    fn global_scope_sums_groups_and_personal_ledgers() {
        let index = index();
        let calc = NetBalanceCalculator::new(&index);
        let a = calc.balance_for(&Scope::Global, &user("a"));
        assert_eq!(a.get(&Currency::usd()), dec!(40));
        assert_eq!(a.get(&Currency::new("EUR")), dec!(-5));
        let sheet = calc.all_balances(&Scope::Global);
        for currency in sheet.currencies() {
            assert_eq!(sheet.residual(currency), Decimal::ZERO);
        }
        assert_eq!(sheet.balance(&user("c"), &Currency::new("EUR")), dec!(5));
    }

    #[test]
    fn pairwise_balance_is_antisymmetric() {
        let index = index();
        let calc = NetBalanceCalculator::new(&index);
        let eur = Currency::new("EUR");
        assert_eq!(calc.pairwise_balance(&user("c"), &user("a")).get(&eur), dec!(5));
        assert_eq!(calc.pairwise_balance(&user("a"), &user("c")).get(&eur), dec!(-5));
        assert!(calc.pairwise_balance(&user("a"), &user("b")).is_settled());
    }

    #[test]
    fn unknown_user_and_scope_yield_zero() {
        let index = index();
        let calc = NetBalanceCalculator::new(&index);
        assert!(calc.balance_for(&Scope::group("nope"), &user("a")).is_settled());
        assert!(calc.balance_for(&Scope::Global, &user("zed")).is_settled());
        assert!(calc.all_balances(&Scope::group("nope")).is_settled());
    }

    #[test]
    fn global_totals_clamp_instead_of_overflowing() {
        let mut index = LedgerIndex::default();
        for group in ["north", "south"] {
            let charter = Expense::new("charter", Decimal::MAX, Currency::usd(), user("a"))
                .in_group(GroupId::from(group))
                .with_split(ExpenseSplit::new(user("b"), Decimal::MAX));
            index.apply(&charter, LedgerOperation::Add).unwrap();
        }
        let calc = NetBalanceCalculator::new(&index);
        let global = calc.balance_for(&Scope::Global, &user("a"));
        assert_eq!(global.get(&Currency::usd()), Decimal::MAX);
        let sheet = calc.all_balances(&Scope::Global);
        assert_eq!(sheet.balance(&user("b"), &Currency::usd()), Decimal::MIN);
    }
}
