use std::sync::Arc;

use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use splitsage_balances::Transfer;
use splitsage_core::{Currency, Scope};
use splitsage_engine::{BalanceEngine, EngineError};
use splitsage_store::{ExpenseRepository, GroupRepository, StoreError};
use splitsage_test_utils::{eventually, gid, uid, ExpenseBuilder, StoreHarness};

fn usd() -> Currency {
    Currency::usd()
}

fn trio() -> StoreHarness {
    let harness = StoreHarness::new();
    harness.seed_users(&[("a", "Ana"), ("b", "Ben"), ("c", "Cai")]);
    harness.create_group("g", &["a", "b", "c"]);
    harness
}

fn engine_for(harness: &StoreHarness) -> Arc<BalanceEngine> {
    let engine = Arc::new(BalanceEngine::new(
        harness.units.clone(),
        harness.expenses.clone(),
        harness.groups.clone(),
        harness.users.clone(),
    ));
    harness.groups.set_guard(engine.removal_policy());
    engine
}

fn residual(engine: &BalanceEngine, scope: &Scope) -> Decimal {
    engine.all_balances(scope).residual(&usd())
}

#[tokio::test]
async fn equal_group_split_settles_towards_the_payer() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();

    harness
        .expenses
        .add(
            ExpenseBuilder::new("dinner", "a", dec!(90))
                .group("g")
                .split("a", dec!(30))
                .split("b", dec!(30))
                .split("c", dec!(30))
                .build(),
        )
        .unwrap();

    let group = Scope::group("g");
    assert!(eventually(|| engine.balance_for(&group, &uid("a")).get(&usd()) == dec!(60)).await);
    assert_eq!(engine.balance_for(&group, &uid("b")).get(&usd()), dec!(-30));
    assert_eq!(engine.balance_for(&group, &uid("c")).get(&usd()), dec!(-30));
    assert_eq!(residual(&engine, &group), Decimal::ZERO);

    let plan = engine.settlement_plan(&group).unwrap();
    assert_eq!(
        plan.transfers,
        vec![
            Transfer {
                from: uid("b"),
                to: uid("a"),
                amount: dec!(30),
                currency: usd(),
            },
            Transfer {
                from: uid("c"),
                to: uid("a"),
                amount: dec!(30),
                currency: usd(),
            },
        ]
    );

    let view = engine.settlement_view(&group).unwrap();
    assert_eq!(view.title, "g");
    let names: Vec<_> = view
        .transfers
        .iter()
        .map(|transfer| (transfer.from_name.as_str(), transfer.to_name.as_str()))
        .collect();
    assert_eq!(names, [("Ben", "Ana"), ("Cai", "Ana")]);

    feed.stop().await;
}

#[tokio::test]
async fn personal_expenses_stay_out_of_groups() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();

    harness
        .expenses
        .add(ExpenseBuilder::new("taxi", "a", dec!(50)).split("b", dec!(50)).build())
        .unwrap();

    assert!(eventually(|| engine.pairwise_balance(&uid("a"), &uid("b")).get(&usd()) == dec!(50)).await);
    assert_eq!(engine.pairwise_balance(&uid("b"), &uid("a")).get(&usd()), dec!(-50));
    assert!(engine.balance_for(&Scope::group("g"), &uid("a")).is_settled());
    assert_eq!(engine.balance_for(&Scope::Global, &uid("a")).get(&usd()), dec!(50));
    assert_eq!(engine.balance_for(&Scope::Global, &uid("b")).get(&usd()), dec!(-50));
    assert!(engine.settlement_plan(&Scope::group("g")).unwrap().is_empty());
    assert_eq!(engine.settlement_plan(&Scope::Global).unwrap().len(), 1);

    feed.stop().await;
}

#[rstest]
#[case::within_tolerance(dec!(33.33), true)]
#[case::beyond_tolerance(dec!(33.32), false)]
fn rounding_tolerance_scales_with_participants(#[case] share: Decimal, #[case] accepted: bool) {
    let harness = trio();
    let expense = ExpenseBuilder::new("groceries", "a", dec!(100))
        .group("g")
        .split("a", share)
        .split("b", share)
        .split("c", share)
        .build();

    let outcome = harness.expenses.add(expense);
    assert_eq!(outcome.is_ok(), accepted);
    if !accepted {
        assert!(matches!(outcome, Err(StoreError::InvariantViolation(_))));
    }

    let engine = engine_for(&harness);
    engine.rebuild();
    assert_eq!(residual(&engine, &Scope::group("g")), Decimal::ZERO);
}

#[tokio::test]
async fn edits_and_deletes_flow_through() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();
    let group = Scope::group("g");

    harness
        .expenses
        .add(ExpenseBuilder::new("hotel", "b", dec!(120)).group("g").equal_split(&["a", "b", "c"]).build())
        .unwrap();
    assert!(eventually(|| engine.balance_for(&group, &uid("b")).get(&usd()) == dec!(80)).await);

    harness
        .expenses
        .update(ExpenseBuilder::new("hotel", "b", dec!(60)).group("g").equal_split(&["a", "b", "c"]).build())
        .unwrap();
    assert!(eventually(|| engine.balance_for(&group, &uid("b")).get(&usd()) == dec!(40)).await);
    assert_eq!(residual(&engine, &group), Decimal::ZERO);

    harness.expenses.delete(&"hotel".into()).unwrap();
    assert!(eventually(|| engine.balance_for(&group, &uid("b")).is_settled()).await);
    assert!(engine.settlement_plan(&group).unwrap().is_empty());

    feed.stop().await;
}

#[tokio::test]
async fn paid_splits_leave_the_balance_and_unlock_leaving() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();
    let group = gid("g");

    harness
        .expenses
        .add(
            ExpenseBuilder::new("tickets", "a", dec!(40))
                .group("g")
                .split("a", dec!(20))
                .split("b", dec!(20))
                .build(),
        )
        .unwrap();

    let refused = harness.groups.remove_member(&group, &uid("b")).unwrap_err();
    assert!(matches!(refused, StoreError::PolicyViolation(ref violation) if violation.outstanding == 1));
    assert!(matches!(
        engine.check_member_removal(&group, &uid("b")),
        Err(EngineError::PolicyViolation(_))
    ));
    assert!(engine.check_member_removal(&group, &uid("c")).is_ok());

    harness
        .expenses
        .settle_split(&"tickets".into(), &uid("b"), chrono::Utc::now())
        .unwrap();
    assert!(eventually(|| engine.outstanding_splits(&group, &uid("b")) == 0).await);
    assert!(engine.balance_for(&Scope::Group(group.clone()), &uid("a")).is_settled());

    assert!(harness.groups.remove_member(&group, &uid("b")).unwrap());
    assert!(
        eventually(|| !engine
            .all_balances(&Scope::Group(group.clone()))
            .participants()
            .any(|user| user == &uid("b")))
        .await
    );

    feed.stop().await;
}

#[tokio::test]
async fn splits_recorded_as_paid_never_reach_the_balances() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();

    harness
        .expenses
        .add(
            ExpenseBuilder::new("cabin", "a", dec!(90))
                .group("g")
                .split("a", dec!(30))
                .paid_split("b", dec!(30))
                .split("c", dec!(30))
                .build(),
        )
        .unwrap();

    let group = Scope::group("g");
    assert!(eventually(|| engine.balance_for(&group, &uid("c")).get(&usd()) == dec!(-30)).await);
    assert_eq!(engine.balance_for(&group, &uid("a")).get(&usd()), dec!(30));
    assert!(engine.balance_for(&group, &uid("b")).is_settled());
    assert_eq!(engine.outstanding_splits(&gid("g"), &uid("b")), 0);
    assert_eq!(engine.outstanding_splits(&gid("g"), &uid("c")), 1);
    assert!(engine.check_member_removal(&gid("g"), &uid("b")).is_ok());
    assert_eq!(residual(&engine, &group), Decimal::ZERO);

    let plan = engine.settlement_plan(&group).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.transfers[0].from, uid("c"));

    feed.stop().await;
}

#[tokio::test]
async fn currencies_are_settled_independently() {
    let harness = trio();
    let engine = engine_for(&harness);
    let feed = engine.start();

    harness
        .expenses
        .add(ExpenseBuilder::new("museum", "a", dec!(30)).group("g").split("b", dec!(30)).build())
        .unwrap();
    harness
        .expenses
        .add(
            ExpenseBuilder::new("ramen", "b", dec!(3000))
                .currency("JPY")
                .group("g")
                .split("a", dec!(3000))
                .build(),
        )
        .unwrap();

    let group = Scope::group("g");
    assert!(eventually(|| engine.all_balances(&group).currencies().count() == 2).await);
    let plan = engine.settlement_plan(&group).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.transfers[0].currency, Currency::new("JPY"));
    assert_eq!(plan.transfers[0].from, uid("a"));
    assert_eq!(plan.transfers[1].currency, usd());
    assert_eq!(plan.transfers[1].from, uid("b"));

    feed.stop().await;
}
