use std::collections::BTreeMap;

use rust_decimal::Decimal;
use splitsage_core::{Expense, GroupId, UserId};

use crate::{LedgerAccount, LedgerEntry, LedgerType};

/// Build the ledger entries representing the money movements of an expense.
///
/// Only outstanding splits move money: the payer's own share and splits that
/// were already settled contribute nothing. Every debit is matched by an
/// equal credit, so the entries of one expense always sum to zero.
pub fn entries_from_expense(expense: &Expense) -> Vec<LedgerEntry> {
    match &expense.group_id {
        Some(group) => group_entries(expense, group),
        None => personal_entries(expense),
    }
}

/// Entries cancelling [`entries_from_expense`] for the same expense.
pub fn reversal_entries(expense: &Expense) -> Vec<LedgerEntry> {
    entries_from_expense(expense)
        .iter()
        .map(LedgerEntry::reversed)
        .collect()
}

fn group_entries(expense: &Expense, group: &GroupId) -> Vec<LedgerEntry> {
    // Several splits for the same user are folded into one debit.
    let mut debits: BTreeMap<&UserId, Decimal> = BTreeMap::new();
    for split in expense.outstanding_splits() {
        *debits.entry(&split.user_id).or_default() += split.amount;
    }
    let credit: Decimal = debits.values().copied().sum();
    let mut entries = Vec::with_capacity(debits.len() + 1);
    if !credit.is_zero() {
        entries.push(build_entry(
            expense,
            LedgerAccount::Group {
                group: group.clone(),
                user: expense.paid_by.clone(),
            },
            credit,
            LedgerType::PayerCredit,
        ));
    }
    for (user, amount) in debits {
        if amount.is_zero() {
            continue;
        }
        entries.push(build_entry(
            expense,
            LedgerAccount::Group {
                group: group.clone(),
                user: user.clone(),
            },
            -amount,
            LedgerType::SplitDebit,
        ));
    }
    entries
}

fn personal_entries(expense: &Expense) -> Vec<LedgerEntry> {
    let mut entries = Vec::new();
    for split in expense.outstanding_splits() {
        if split.amount.is_zero() {
            continue;
        }
        entries.push(build_entry(
            expense,
            LedgerAccount::Pairwise {
                user: expense.paid_by.clone(),
                counterparty: split.user_id.clone(),
            },
            split.amount,
            LedgerType::PayerCredit,
        ));
        entries.push(build_entry(
            expense,
            LedgerAccount::Pairwise {
                user: split.user_id.clone(),
                counterparty: expense.paid_by.clone(),
            },
            -split.amount,
            LedgerType::SplitDebit,
        ));
    }
    entries
}

fn build_entry(
    expense: &Expense,
    account: LedgerAccount,
    amount: Decimal,
    entry_type: LedgerType,
) -> LedgerEntry {
    LedgerEntry::new(
        expense.id.clone(),
        account,
        expense.currency.clone(),
        amount,
        entry_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use splitsage_core::{Currency, ExpenseSplit};

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn group_expense_credits_payer_with_others_shares() {
        let expense = Expense::new("groceries", dec!(90), Currency::usd(), user("a"))
            .in_group(GroupId::from("g"))
            .with_splits([
                ExpenseSplit::new(user("a"), dec!(30)),
                ExpenseSplit::new(user("b"), dec!(30)),
                ExpenseSplit::new(user("c"), dec!(30)),
            ]);
        let entries = entries_from_expense(&expense);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].entry_type, LedgerType::PayerCredit);
        assert_eq!(entries[0].amount, dec!(60));
        let total: Decimal = entries.iter().map(|entry| entry.amount).sum();
        assert!(total.is_zero());
    }

    #[test]
    fn paid_splits_do_not_move_money() {
        let expense = Expense::new("taxi", dec!(40), Currency::usd(), user("a"))
            .in_group(GroupId::from("g"))
            .with_splits([
                ExpenseSplit::new(user("b"), dec!(20)).settled(Utc::now()),
                ExpenseSplit::new(user("c"), dec!(20)),
            ]);
        let entries = entries_from_expense(&expense);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, dec!(20));
        assert_eq!(
            entries[1].account,
            LedgerAccount::Group {
                group: GroupId::from("g"),
                user: user("c"),
            }
        );
    }

    #[test]
    fn personal_expense_posts_both_sides_of_the_pair() {
        let expense = Expense::new("concert", dec!(50), Currency::usd(), user("a"))
            .with_split(ExpenseSplit::new(user("b"), dec!(50)));
        let entries = entries_from_expense(&expense);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].account,
            LedgerAccount::Pairwise {
                user: user("a"),
                counterparty: user("b"),
            }
        );
        assert_eq!(entries[0].amount, dec!(50));
        assert_eq!(entries[1].amount, dec!(-50));
    }

    #[test]
    fn reversal_negates_every_entry() {
        let expense = Expense::new("rent", dec!(100), Currency::usd(), user("a"))
            .in_group(GroupId::from("g"))
            .with_split(ExpenseSplit::new(user("b"), dec!(100)));
        let forward = entries_from_expense(&expense);
        let backward = reversal_entries(&expense);
        for (lhs, rhs) in forward.iter().zip(&backward) {
            assert_eq!(lhs.amount, -rhs.amount);
            assert_eq!(rhs.entry_type, LedgerType::Reversal);
        }
    }
}
