use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use splitsage_balances::{SettlementPlan, Transfer};
use splitsage_core::{Currency, Scope, UserId};
use splitsage_store::UserRepository;

/// A transfer with both parties resolved to display names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferView {
    pub from: UserId,
    pub from_name: String,
    pub to: UserId,
    pub to_name: String,
    pub amount: Decimal,
    pub currency: Currency,
}

impl TransferView {
    fn resolve(transfer: &Transfer, users: &dyn UserRepository) -> Self {
        Self {
            from: transfer.from.clone(),
            from_name: users.display_name(&transfer.from),
            to: transfer.to.clone(),
            to_name: users.display_name(&transfer.to),
            amount: transfer.amount,
            currency: transfer.currency.clone(),
        }
    }
}

impl fmt::Display for TransferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pays {} {} {}",
            self.from_name, self.to_name, self.amount, self.currency
        )
    }
}

/// Settlement plan ready for presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementView {
    pub scope: Scope,
    /// Group name, or a generic heading for the global scope.
    pub title: String,
    pub version: u64,
    pub transfers: Vec<TransferView>,
}

impl SettlementView {
    pub(crate) fn new(
        plan: &SettlementPlan,
        title: String,
        version: u64,
        users: &dyn UserRepository,
    ) -> Self {
        Self {
            scope: plan.scope.clone(),
            title,
            version,
            transfers: plan
                .transfers
                .iter()
                .map(|transfer| TransferView::resolve(transfer, users))
                .collect(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }
}
