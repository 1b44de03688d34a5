use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitsage_core::{Currency, CurrencyUnits, Scope, UserId};
use tracing::error;

use crate::{BalanceSheet, PlanError, PlanResult};

/// Suggested payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: UserId,
    pub to: UserId,
    pub amount: Decimal,
    pub currency: Currency,
}

/// Ordered transfers that bring every balance of a scope to zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub scope: Scope,
    pub transfers: Vec<Transfer>,
}

impl SettlementPlan {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    /// Transfers the user has to send or will receive.
    pub fn involving<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a Transfer> + 'a {
        self.transfers
            .iter()
            .filter(move |transfer| &transfer.from == user || &transfer.to == user)
    }
}

/// Greedy settle-up planner.
///
/// For each currency it repeatedly pairs the largest creditor with the
/// largest debtor and moves the smaller of the two magnitudes. This keeps the
/// transfer count low (at most one less than the number of non-zero
/// balances) but is a heuristic: finding the true minimum number of
/// transfers is NP-hard and is not attempted. Equal magnitudes are taken in
/// ascending user id order so identical input always yields identical plans.
#[derive(Clone, Debug, Default)]
pub struct SettlementPlanner {
    units: CurrencyUnits,
}

type Side = BinaryHeap<(Decimal, Reverse<UserId>)>;

impl SettlementPlanner {
    pub fn new(units: CurrencyUnits) -> Self {
        Self { units }
    }

    pub fn plan(&self, sheet: &BalanceSheet) -> PlanResult<SettlementPlan> {
        let mut transfers = Vec::new();
        for currency in sheet.currencies() {
            let unit = self.units.minor_unit(currency);
            let residual = sheet.residual(currency);
            if residual.abs() > unit {
                error!(
                    scope = %sheet.scope,
                    currency = %currency,
                    %residual,
                    "balances do not net to zero; ledger is inconsistent"
                );
                return Err(PlanError::Unbalanced {
                    scope: sheet.scope.clone(),
                    currency: currency.clone(),
                    residual,
                });
            }
            let Some(balances) = sheet.in_currency(currency) else {
                continue;
            };
            let mut creditors = Side::new();
            let mut debtors = Side::new();
            for (user, amount) in balances {
                if amount.abs() < unit {
                    continue;
                }
                if amount.is_sign_positive() {
                    creditors.push((*amount, Reverse(user.clone())));
                } else {
                    debtors.push((-*amount, Reverse(user.clone())));
                }
            }
            settle_currency(currency, unit, &mut creditors, &mut debtors, &mut transfers);
        }
        Ok(SettlementPlan {
            scope: sheet.scope.clone(),
            transfers,
        })
    }
}

fn settle_currency(
    currency: &Currency,
    unit: Decimal,
    creditors: &mut Side,
    debtors: &mut Side,
    transfers: &mut Vec<Transfer>,
) {
    while let (Some((owed, Reverse(creditor))), Some((owing, Reverse(debtor)))) =
        (creditors.pop(), debtors.pop())
    {
        let amount = owed.min(owing);
        transfers.push(Transfer {
            from: debtor.clone(),
            to: creditor.clone(),
            amount,
            currency: currency.clone(),
        });
        let owed = owed - amount;
        let owing = owing - amount;
        if owed >= unit {
            creditors.push((owed, Reverse(creditor)));
        }
        if owing >= unit {
            debtors.push((owing, Reverse(debtor)));
        }
    }
}
