use chrono::Utc;
use parking_lot::RwLock;
use splitsage_core::{Friendship, FriendshipId, FriendshipStatus, User, UserId, UserPreferences};

use crate::{StoreError, StoreResult};

/// User directory and friendship graph.
pub trait UserRepository: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// `Ok(false)` when the id is unknown.
    fn set_current_user(&self, id: &UserId) -> StoreResult<bool>;

    fn get(&self, id: &UserId) -> Option<User>;

    /// Case-insensitive email lookup.
    fn by_email(&self, email: &str) -> Option<User>;

    /// Register a user. The first user registered becomes the current user.
    fn create(&self, user: User) -> StoreResult<UserId>;

    fn update(&self, user: User) -> StoreResult<bool>;

    fn update_preferences(&self, id: &UserId, preferences: UserPreferences) -> StoreResult<bool>;

    /// Case-insensitive substring match on name or email.
    fn search(&self, query: &str) -> Vec<User>;

    fn friendships_of(&self, id: &UserId) -> Vec<Friendship>;

    /// Users linked to `id` through an accepted friendship.
    fn friends_of(&self, id: &UserId) -> Vec<User>;

    fn create_friendship(&self, a: &UserId, b: &UserId) -> StoreResult<FriendshipId>;

    fn update_friendship_status(&self, id: &FriendshipId, status: FriendshipStatus) -> bool;

    /// Display name for a user, falling back to the raw id.
    fn display_name(&self, id: &UserId) -> String {
        self.get(id)
            .map(|user| user.name)
            .unwrap_or_else(|| id.to_string())
    }
}

#[derive(Default)]
struct Directory {
    users: Vec<User>,
    friendships: Vec<Friendship>,
    current: Option<UserId>,
}

impl Directory {
    fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<&UserId>) -> bool {
        self.users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(email) && Some(&user.id) != except)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Directory>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserStore {
    fn current_user(&self) -> Option<User> {
        let inner = self.inner.read();
        inner
            .current
            .as_ref()
            .and_then(|id| inner.user(id))
            .cloned()
    }

    fn set_current_user(&self, id: &UserId) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        if inner.user(id).is_none() {
            return Ok(false);
        }
        inner.current = Some(id.clone());
        Ok(true)
    }

    fn get(&self, id: &UserId) -> Option<User> {
        self.inner.read().user(id).cloned()
    }

    fn by_email(&self, email: &str) -> Option<User> {
        self.inner
            .read()
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn create(&self, user: User) -> StoreResult<UserId> {
        let mut inner = self.inner.write();
        if inner.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        let id = user.id.clone();
        if inner.current.is_none() {
            inner.current = Some(id.clone());
        }
        inner.users.push(user);
        Ok(id)
    }

    fn update(&self, user: User) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        if inner.email_taken(&user.email, Some(&user.id)) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        let Some(slot) = inner.users.iter_mut().find(|existing| existing.id == user.id) else {
            return Ok(false);
        };
        *slot = user;
        Ok(true)
    }

    fn update_preferences(&self, id: &UserId, preferences: UserPreferences) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        let Some(user) = inner.users.iter_mut().find(|user| &user.id == id) else {
            return Ok(false);
        };
        user.preferences = preferences;
        Ok(true)
    }

    fn search(&self, query: &str) -> Vec<User> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.inner
            .read()
            .users
            .iter()
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    fn friendships_of(&self, id: &UserId) -> Vec<Friendship> {
        self.inner
            .read()
            .friendships
            .iter()
            .filter(|friendship| friendship.involves(id))
            .cloned()
            .collect()
    }

    fn friends_of(&self, id: &UserId) -> Vec<User> {
        let inner = self.inner.read();
        inner
            .friendships
            .iter()
            .filter(|friendship| friendship.status == FriendshipStatus::Accepted)
            .filter_map(|friendship| friendship.counterpart(id))
            .filter_map(|friend| inner.user(friend))
            .cloned()
            .collect()
    }

    fn create_friendship(&self, a: &UserId, b: &UserId) -> StoreResult<FriendshipId> {
        let mut inner = self.inner.write();
        for user in [a, b] {
            if inner.user(user).is_none() {
                return Err(StoreError::UnknownUser(user.clone()));
            }
        }
        if inner
            .friendships
            .iter()
            .any(|friendship| friendship.involves(a) && friendship.counterpart(a) == Some(b))
        {
            return Err(StoreError::DuplicateFriendship(a.clone(), b.clone()));
        }
        let friendship = Friendship {
            id: FriendshipId::generate(),
            user_a: a.clone(),
            user_b: b.clone(),
            created_at: Utc::now(),
            status: FriendshipStatus::Pending,
        };
        let id = friendship.id.clone();
        inner.friendships.push(friendship);
        Ok(id)
    }

    fn update_friendship_status(&self, id: &FriendshipId, status: FriendshipStatus) -> bool {
        let mut inner = self.inner.write();
        match inner.friendships.iter_mut().find(|friendship| &friendship.id == id) {
            Some(friendship) => {
                friendship.status = status;
                true
            }
            None => false,
        }
    }
}
