use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Currency, GroupId, UserId};

/// Users sharing expenses under a common currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub currency: Currency,
    pub image: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl Group {
    /// Creates a group whose creator is its first admin.
    pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: GroupId::generate(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            created_by: created_by.clone(),
            members: vec![GroupMember {
                user_id: created_by,
                joined_at: now,
                role: GroupRole::Admin,
            }],
            currency: Currency::default(),
            image: None,
            archived: false,
        }
    }

    pub fn with_id(mut self, id: GroupId) -> Self {
        self.id = id;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_member(mut self, member: GroupMember) -> Self {
        if !self.is_member(&member.user_id) {
            self.members.push(member);
        }
        self
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|member| &member.user_id == user)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &UserId> + '_ {
        self.members.iter().map(|member| &member.user_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub role: GroupRole,
}

impl GroupMember {
    pub fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            joined_at: Utc::now(),
            role: GroupRole::Member,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Admin,
    #[default]
    Member,
}
