use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GroupId;

/// View over which balances are reported.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Positions accumulated inside one group.
    Group(GroupId),
    /// Every group plus every personal pairwise ledger.
    Global,
}

impl Scope {
    pub fn group(id: impl Into<GroupId>) -> Self {
        Scope::Group(id.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Group(id) => write!(f, "group:{id}"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// Kind of mutation reported by a collaborator store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Updated => "updated",
            ChangeKind::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
