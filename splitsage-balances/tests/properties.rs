use std::collections::BTreeMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use splitsage_balances::{NetBalanceCalculator, SettlementPlanner};
use splitsage_core::{
    Currency, CurrencyUnits, Expense, ExpenseId, ExpenseSplit, GroupId, Scope, UserId,
};
use splitsage_ledger::{LedgerIndex, LedgerOperation};

#[derive(Clone, Debug)]
struct Step {
    kind: u8,
    slot: u8,
    payer: u8,
    shares: Vec<(u8, u64, bool)>,
    group: Option<u8>,
}

fn step() -> impl Strategy<Value = Step> {
    (
        0u8..3,
        0u8..6,
        0u8..5,
        prop::collection::vec((0u8..5, 1u64..10_000, any::<bool>()), 1..5),
        prop::option::of(0u8..2),
    )
        .prop_map(|(kind, slot, payer, shares, group)| Step {
            kind,
            slot,
            payer,
            shares,
            group,
        })
}

fn build(step: &Step) -> Expense {
    let splits: Vec<ExpenseSplit> = step
        .shares
        .iter()
        .map(|(user, cents, paid)| {
            let split = ExpenseSplit::new(
                UserId::new(format!("u{user}")),
                Decimal::new(*cents as i64, 2),
            );
            if *paid {
                split.settled(chrono::Utc::now())
            } else {
                split
            }
        })
        .collect();
    let amount: Decimal = splits.iter().map(|split| split.amount).sum();
    let payer = UserId::new(format!("u{}", step.payer));
    let mut expense = Expense::new("generated", amount, Currency::usd(), payer)
        .with_id(ExpenseId::new(format!("e{}", step.slot)))
        .with_splits(splits);
    if let Some(group) = step.group {
        expense = expense.in_group(GroupId::new(format!("g{group}")));
    }
    expense
}

fn scopes() -> Vec<Scope> {
    vec![Scope::group("g0"), Scope::group("g1"), Scope::Global]
}

proptest! {
    #[test]
    fn incremental_matches_rebuild_and_conserves(steps in prop::collection::vec(step(), 0..40)) {
        let mut index = LedgerIndex::default();
        let mut live: BTreeMap<u8, Expense> = BTreeMap::new();

        for step in &steps {
            let expense = build(step);
            match step.kind {
                0 => {
                    index.apply(&expense, LedgerOperation::Add).unwrap();
                    live.insert(step.slot, expense);
                }
                1 if live.contains_key(&step.slot) => {
                    index.apply(&expense, LedgerOperation::Update).unwrap();
                    live.insert(step.slot, expense);
                }
                _ => {
                    index.apply(&expense, LedgerOperation::Remove).unwrap();
                    live.remove(&step.slot);
                }
            }

            let calc = NetBalanceCalculator::new(&index);
            for scope in scopes() {
                let sheet = calc.all_balances(&scope);
                for currency in sheet.currencies() {
                    prop_assert_eq!(sheet.residual(currency), Decimal::ZERO);
                }
            }
        }

        let rebuilt = LedgerIndex::rebuild(CurrencyUnits::new(), live.into_values()).unwrap();
        let incremental = NetBalanceCalculator::new(&index);
        let fresh = NetBalanceCalculator::new(&rebuilt);
        for scope in scopes() {
            prop_assert_eq!(incremental.all_balances(&scope), fresh.all_balances(&scope));
        }
    }

    #[test]
    fn executing_a_plan_settles_the_scope(steps in prop::collection::vec(step(), 1..25)) {
        let mut index = LedgerIndex::default();
        for step in &steps {
            index.apply(&build(step), LedgerOperation::Add).unwrap();
        }
        let calc = NetBalanceCalculator::new(&index);
        let planner = SettlementPlanner::default();
        for scope in scopes() {
            let mut sheet = calc.all_balances(&scope);
            let plan = planner.plan(&sheet).unwrap();
            prop_assert_eq!(&plan, &planner.plan(&sheet).unwrap());
            for transfer in &plan.transfers {
                prop_assert!(transfer.amount > Decimal::ZERO);
                sheet.apply_transfer(transfer);
            }
            prop_assert!(sheet.is_settled());
        }
    }
}
