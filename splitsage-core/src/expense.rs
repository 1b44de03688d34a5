use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, ExpenseId, GroupId, UserId};

/// Immutable record of money spent by one user on behalf of others.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    pub date: DateTime<Utc>,
    pub paid_by: UserId,
    /// `None` marks a personal expense that belongs to no group.
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(default)]
    pub splits: Vec<ExpenseSplit>,
    pub receipt: Option<String>,
}

impl Expense {
    /// Creates a personal expense with a fresh id and no splits.
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        currency: Currency,
        paid_by: UserId,
    ) -> Self {
        Self {
            id: ExpenseId::generate(),
            title: title.into(),
            description: String::new(),
            amount,
            currency,
            date: Utc::now(),
            paid_by,
            group_id: None,
            category: ExpenseCategory::default(),
            splits: Vec::new(),
            receipt: None,
        }
    }

    pub fn with_id(mut self, id: ExpenseId) -> Self {
        self.id = id;
        self
    }

    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group_id = Some(group);
        self
    }

    pub fn with_category(mut self, category: ExpenseCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_split(mut self, split: ExpenseSplit) -> Self {
        self.splits.push(split);
        self
    }

    pub fn with_splits(mut self, splits: impl IntoIterator<Item = ExpenseSplit>) -> Self {
        self.splits.extend(splits);
        self
    }

    pub fn is_personal(&self) -> bool {
        self.group_id.is_none()
    }

    /// Sum of every split amount, paid or not. Saturates at the decimal range.
    pub fn split_total(&self) -> Decimal {
        self.splits
            .iter()
            .fold(Decimal::ZERO, |total, split| total.saturating_add(split.amount))
    }

    /// Sum of every split amount, or `None` when it leaves the decimal range.
    pub fn checked_split_total(&self) -> Option<Decimal> {
        self.splits
            .iter()
            .try_fold(Decimal::ZERO, |total, split| total.checked_add(split.amount))
    }

    pub fn split_for(&self, user: &UserId) -> Option<&ExpenseSplit> {
        self.splits.iter().find(|split| &split.user_id == user)
    }

    /// True when the user paid for the expense or owes a share of it.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.paid_by == user || self.splits.iter().any(|split| &split.user_id == user)
    }

    /// Splits that still move money: owed by someone other than the payer and not yet paid.
    pub fn outstanding_splits(&self) -> impl Iterator<Item = &ExpenseSplit> + '_ {
        self.splits
            .iter()
            .filter(move |split| !split.paid && split.user_id != self.paid_by)
    }
}

/// Share of an expense owed by one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub user_id: UserId,
    pub amount: Decimal,
    #[serde(default)]
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl ExpenseSplit {
    pub fn new(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            amount,
            paid: false,
            paid_at: None,
        }
    }

    /// Marks the split as settled at the provided instant.
    pub fn settled(mut self, at: DateTime<Utc>) -> Self {
        self.paid = true;
        self.paid_at = Some(at);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    #[default]
    General,
    Food,
    Transport,
    Shopping,
    Entertainment,
    Housing,
    Utilities,
    Travel,
    Personal,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::General => "general",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Housing => "housing",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Travel => "travel",
            ExpenseCategory::Personal => "personal",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(ExpenseCategory::General),
            "food" => Ok(ExpenseCategory::Food),
            "transport" => Ok(ExpenseCategory::Transport),
            "shopping" => Ok(ExpenseCategory::Shopping),
            "entertainment" => Ok(ExpenseCategory::Entertainment),
            "housing" => Ok(ExpenseCategory::Housing),
            "utilities" => Ok(ExpenseCategory::Utilities),
            "travel" => Ok(ExpenseCategory::Travel),
            "personal" => Ok(ExpenseCategory::Personal),
            "other" => Ok(ExpenseCategory::Other),
            other => Err(format!("unknown expense category: {other}")),
        }
    }
}
