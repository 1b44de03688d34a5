use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitsage_core::{Currency, ExpenseId, GroupId, UserId};

/// Canonical ledger record describing a single balance delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub expense_id: ExpenseId,
    pub account: LedgerAccount,
    pub currency: Currency,
    pub amount: Decimal,
    pub entry_type: LedgerType,
}

impl LedgerEntry {
    pub fn new(
        expense_id: ExpenseId,
        account: LedgerAccount,
        currency: Currency,
        amount: Decimal,
        entry_type: LedgerType,
    ) -> Self {
        Self {
            expense_id,
            account,
            currency,
            amount,
            entry_type,
        }
    }

    /// Entry cancelling this one.
    pub fn reversed(&self) -> Self {
        Self {
            expense_id: self.expense_id.clone(),
            account: self.account.clone(),
            currency: self.currency.clone(),
            amount: -self.amount,
            entry_type: LedgerType::Reversal,
        }
    }

    /// Key under which the delta accumulates.
    pub fn key(&self) -> LedgerKey {
        match &self.account {
            LedgerAccount::Group { group, user } => LedgerKey {
                scope: LedgerScope::Group(group.clone()),
                user: user.clone(),
                currency: self.currency.clone(),
            },
            LedgerAccount::Pairwise { user, .. } => LedgerKey {
                scope: LedgerScope::Personal,
                user: user.clone(),
                currency: self.currency.clone(),
            },
        }
    }
}

/// Position an entry is posted against.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAccount {
    /// A member's position inside a group.
    Group { group: GroupId, user: UserId },
    /// `user`'s personal position against `counterparty`, outside any group.
    Pairwise { user: UserId, counterparty: UserId },
}

/// Enumerates the supported ledger line item categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerType {
    PayerCredit,
    SplitDebit,
    Reversal,
}

impl LedgerType {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerType::PayerCredit => "payer_credit",
            LedgerType::SplitDebit => "split_debit",
            LedgerType::Reversal => "reversal",
        }
    }
}

impl fmt::Display for LedgerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payer_credit" => Ok(LedgerType::PayerCredit),
            "split_debit" => Ok(LedgerType::SplitDebit),
            "reversal" => Ok(LedgerType::Reversal),
            other => Err(format!("unknown ledger type: {other}")),
        }
    }
}

/// Where a position lives: inside a group or in the personal pairwise ledger.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    Group(GroupId),
    Personal,
}

/// Identifies one balance touched by an applied batch.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub scope: LedgerScope,
    pub user: UserId,
    pub currency: Currency,
}
