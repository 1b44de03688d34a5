use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Currency, FriendshipId, UserId};

/// Display identity of a participant. Balances only ever reference the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
    #[serde(default)]
    pub default_currency: Currency,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub preferences: UserPreferences,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            name: name.into(),
            email: email.into(),
            phone_number: None,
            profile_image: None,
            default_currency: Currency::default(),
            created_at: now,
            last_active: now,
            preferences: UserPreferences::default(),
        }
    }

    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub dark_mode: bool,
    pub notifications_enabled: bool,
    pub email_notifications_enabled: bool,
    /// ISO 639-1 language code.
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            notifications_enabled: true,
            email_notifications_enabled: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: FriendshipId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub created_at: DateTime<Utc>,
    pub status: FriendshipStatus,
}

impl Friendship {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.user_a == user || &self.user_b == user
    }

    /// Returns the other side of the link, if `user` is part of it.
    pub fn counterpart(&self, user: &UserId) -> Option<&UserId> {
        if &self.user_a == user {
            Some(&self.user_b)
        } else if &self.user_b == user {
            Some(&self.user_a)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Blocked,
}
