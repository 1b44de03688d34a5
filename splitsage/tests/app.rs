use rust_decimal_macros::dec;
use splitsage::config::from_toml_str;
use splitsage::store::{ExpenseRepository, GroupRepository, StoreError, UserRepository};
use splitsage::{App, Currency, Group, GroupMember, Scope, User};
use splitsage_test_utils::{eventually, uid, ExpenseBuilder};

#[tokio::test]
async fn configured_app_follows_its_stores() {
    let config = from_toml_str("event_bus_capacity = 32\n[currencies]\nCRD = 0\n").unwrap();
    let app = App::new(&config);
    app.users
        .create(User::new("Ana", "ana@splitsage.test").with_id(uid("a")))
        .unwrap();
    app.users
        .create(User::new("Ben", "ben@splitsage.test").with_id(uid("b")))
        .unwrap();
    app.groups
        .create(
            Group::new("Cabin", uid("a"))
                .with_id("cabin".into())
                .with_member(GroupMember::member(uid("b"))),
        )
        .unwrap();
    let feed = app.start();

    // CRD has no minor unit, so each split may be off by one whole credit.
    let rejected = app.expenses.add(
        ExpenseBuilder::new("credits", "a", dec!(10))
            .currency("CRD")
            .group("cabin")
            .split("a", dec!(3))
            .split("b", dec!(4))
            .build(),
    );
    assert!(matches!(rejected, Err(StoreError::InvariantViolation(_))));

    app.expenses
        .add(
            ExpenseBuilder::new("firewood", "a", dec!(10))
                .currency("CRD")
                .group("cabin")
                .split("a", dec!(5))
                .split("b", dec!(4))
                .build(),
        )
        .unwrap();

    let cabin = Scope::group("cabin");
    let crd = Currency::new("CRD");
    assert!(eventually(|| app.engine.balance_for(&cabin, &uid("b")).get(&crd) == dec!(-4)).await);

    let view = app.engine.settlement_view(&cabin).unwrap();
    assert_eq!(view.title, "Cabin");
    assert_eq!(view.transfers.len(), 1);
    assert_eq!(view.transfers[0].to_string(), "Ben pays Ana 4 CRD");

    assert!(app.groups.remove_member(&"cabin".into(), &uid("b")).is_err());
    feed.stop().await;
}
