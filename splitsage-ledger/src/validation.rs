use rust_decimal::Decimal;
use splitsage_core::{CurrencyUnits, Expense};

use crate::{LedgerError, LedgerResult, Violation};

/// Largest accepted gap between split total and amount: one minor unit per split.
pub fn split_tolerance(expense: &Expense, units: &CurrencyUnits) -> Decimal {
    units.minor_unit(&expense.currency) * Decimal::from(expense.splits.len())
}

/// Reject expenses that would break the zero-sum ledger.
pub fn validate_expense(expense: &Expense, units: &CurrencyUnits) -> LedgerResult<()> {
    let fail = |violation| LedgerError::InvariantViolation {
        expense: expense.id.clone(),
        violation,
    };
    if expense.amount <= Decimal::ZERO {
        return Err(fail(Violation::NonPositiveAmount {
            amount: expense.amount,
        }));
    }
    if let Some(split) = expense.splits.iter().find(|split| split.amount < Decimal::ZERO) {
        return Err(fail(Violation::NegativeSplit {
            user: split.user_id.clone(),
            amount: split.amount,
        }));
    }
    let Some(split_total) = expense.checked_split_total() else {
        return Err(fail(Violation::AmountOverflow {
            currency: expense.currency.clone(),
        }));
    };
    let tolerance = split_tolerance(expense, units);
    if (split_total - expense.amount).abs() > tolerance {
        return Err(fail(Violation::SplitMismatch {
            amount: expense.amount,
            split_total,
            tolerance,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use splitsage_core::{Currency, ExpenseSplit, UserId};

    fn expense(amount: Decimal, splits: &[(&str, Decimal)]) -> Expense {
        Expense::new("test", amount, Currency::usd(), UserId::from("a")).with_splits(
            splits
                .iter()
                .map(|(user, amount)| ExpenseSplit::new(UserId::from(*user), *amount)),
        )
    }

    #[test]
    fn accepts_rounding_within_one_unit_per_split() {
        let expense = expense(
            dec!(100.00),
            &[("a", dec!(33.33)), ("b", dec!(33.33)), ("c", dec!(33.33))],
        );
        assert_eq!(split_tolerance(&expense, &CurrencyUnits::new()), dec!(0.03));
        assert!(validate_expense(&expense, &CurrencyUnits::new()).is_ok());
    }

    #[test]
    fn rejects_split_sum_outside_tolerance() {
        let expense = expense(dec!(100), &[("a", dec!(50)), ("b", dec!(49.90))]);
        let err = validate_expense(&expense, &CurrencyUnits::new()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvariantViolation {
                violation: Violation::SplitMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_positive_amounts_and_negative_splits() {
        let zero = expense(dec!(0), &[]);
        assert!(validate_expense(&zero, &CurrencyUnits::new()).is_err());

        let negative = expense(dec!(10), &[("a", dec!(20)), ("b", dec!(-10))]);
        let err = validate_expense(&negative, &CurrencyUnits::new()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvariantViolation {
                violation: Violation::NegativeSplit { .. },
                ..
            }
        ));
    }

    #[test]
    fn split_sums_beyond_the_decimal_range_are_rejected() {
        let huge = expense(Decimal::MAX, &[("a", Decimal::MAX), ("b", Decimal::MAX)]);
        let err = validate_expense(&huge, &CurrencyUnits::new()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvariantViolation {
                violation: Violation::AmountOverflow { .. },
                ..
            }
        ));
    }

    #[test]
    fn expense_without_splits_is_rejected() {
        let lonely = expense(dec!(12), &[]);
        assert!(validate_expense(&lonely, &CurrencyUnits::new()).is_err());
    }

    #[test]
    fn zero_decimal_currencies_use_whole_units() {
        let mut expense = expense(
            dec!(1000),
            &[("a", dec!(333)), ("b", dec!(333)), ("c", dec!(333))],
        );
        expense.currency = Currency::new("JPY");
        assert!(validate_expense(&expense, &CurrencyUnits::new()).is_ok());
    }
}
