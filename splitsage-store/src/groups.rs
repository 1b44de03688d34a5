use std::sync::Arc;

use parking_lot::RwLock;
use splitsage_core::{ChangeKind, Group, GroupId, GroupMember, UserId};
use splitsage_events::{Event, EventBus, EventFilter, EventStream, MembershipChange};
use tracing::{debug, warn};

use crate::{PolicyViolation, StoreError, StoreResult};

/// Decides whether a user may leave a group.
///
/// The group store consults the guard before every removal, including the
/// implicit removals caused by [`GroupRepository::update`] and
/// [`GroupRepository::delete`].
pub trait MembershipGuard: Send + Sync {
    fn check_member_removal(&self, group: &GroupId, user: &UserId) -> Result<(), PolicyViolation>;
}

/// Group collaborator: CRUD over groups and their rosters.
pub trait GroupRepository: Send + Sync {
    fn all(&self) -> Vec<Group>;

    /// Groups the user belongs to.
    fn by_user(&self, user: &UserId) -> Vec<Group>;

    fn get(&self, id: &GroupId) -> Option<Group>;

    fn create(&self, group: Group) -> StoreResult<GroupId>;

    /// Replace a group; `Ok(false)` when the id is unknown.
    fn update(&self, group: Group) -> StoreResult<bool>;

    fn delete(&self, id: &GroupId) -> StoreResult<bool>;

    /// `Ok(false)` when the group is unknown or the user already belongs to it.
    fn add_member(&self, group: &GroupId, member: GroupMember) -> StoreResult<bool>;

    /// `Ok(false)` when the group is unknown or the user is not a member.
    fn remove_member(&self, group: &GroupId, user: &UserId) -> StoreResult<bool>;

    fn subscribe_changes(&self) -> EventStream;
}

pub struct InMemoryGroupStore {
    groups: RwLock<Vec<Group>>,
    guard: RwLock<Option<Arc<dyn MembershipGuard>>>,
    bus: EventBus,
}

impl InMemoryGroupStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            groups: RwLock::new(Vec::new()),
            guard: RwLock::new(None),
            bus,
        }
    }

    /// Install the removal policy. Without a guard every removal is allowed.
    pub fn set_guard(&self, guard: Arc<dyn MembershipGuard>) {
        *self.guard.write() = Some(guard);
    }

    fn check_removal(&self, group: &GroupId, user: &UserId) -> StoreResult<()> {
        if let Some(guard) = self.guard.read().as_ref() {
            if let Err(violation) = guard.check_member_removal(group, user) {
                warn!(
                    group = %group,
                    user = %user,
                    outstanding = violation.outstanding,
                    "membership removal refused"
                );
                return Err(violation.into());
            }
        }
        Ok(())
    }

    fn publish(&self, kind: ChangeKind, group: &GroupId, user: &UserId) {
        debug!(group = %group, user = %user, kind = %kind, "publishing membership change");
        self.bus.publish(Event::Membership(MembershipChange {
            kind,
            group: group.clone(),
            user: user.clone(),
        }));
    }
}

impl GroupRepository for InMemoryGroupStore {
    fn all(&self) -> Vec<Group> {
        self.groups.read().clone()
    }

    fn by_user(&self, user: &UserId) -> Vec<Group> {
        self.groups
            .read()
            .iter()
            .filter(|group| group.is_member(user))
            .cloned()
            .collect()
    }

    fn get(&self, id: &GroupId) -> Option<Group> {
        self.groups.read().iter().find(|group| &group.id == id).cloned()
    }

    fn create(&self, group: Group) -> StoreResult<GroupId> {
        if group.members.is_empty() {
            return Err(StoreError::EmptyGroup(group.id));
        }
        let mut groups = self.groups.write();
        if groups.iter().any(|existing| existing.id == group.id) {
            return Err(StoreError::DuplicateGroup(group.id));
        }
        for user in group.member_ids() {
            self.publish(ChangeKind::Added, &group.id, user);
        }
        let id = group.id.clone();
        groups.push(group);
        Ok(id)
    }

    fn update(&self, group: Group) -> StoreResult<bool> {
        if group.members.is_empty() {
            return Err(StoreError::EmptyGroup(group.id));
        }
        let mut groups = self.groups.write();
        let Some(slot) = groups.iter_mut().find(|existing| existing.id == group.id) else {
            return Ok(false);
        };
        let departed: Vec<UserId> = slot
            .member_ids()
            .filter(|user| !group.is_member(user))
            .cloned()
            .collect();
        for user in &departed {
            self.check_removal(&group.id, user)?;
        }
        let joined: Vec<UserId> = group
            .member_ids()
            .filter(|user| !slot.is_member(user))
            .cloned()
            .collect();
        *slot = group;
        for user in &departed {
            self.publish(ChangeKind::Removed, &slot.id, user);
        }
        for user in &joined {
            self.publish(ChangeKind::Added, &slot.id, user);
        }
        Ok(true)
    }

    fn delete(&self, id: &GroupId) -> StoreResult<bool> {
        let mut groups = self.groups.write();
        let Some(position) = groups.iter().position(|group| &group.id == id) else {
            return Ok(false);
        };
        for user in groups[position].member_ids() {
            self.check_removal(id, user)?;
        }
        let removed = groups.remove(position);
        for user in removed.member_ids() {
            self.publish(ChangeKind::Removed, id, user);
        }
        Ok(true)
    }

    fn add_member(&self, group: &GroupId, member: GroupMember) -> StoreResult<bool> {
        let mut groups = self.groups.write();
        let Some(slot) = groups.iter_mut().find(|existing| &existing.id == group) else {
            return Ok(false);
        };
        if slot.is_member(&member.user_id) {
            return Ok(false);
        }
        self.publish(ChangeKind::Added, group, &member.user_id);
        slot.members.push(member);
        Ok(true)
    }

    fn remove_member(&self, group: &GroupId, user: &UserId) -> StoreResult<bool> {
        let mut groups = self.groups.write();
        let Some(slot) = groups.iter_mut().find(|existing| &existing.id == group) else {
            return Ok(false);
        };
        if !slot.is_member(user) {
            return Ok(false);
        }
        if slot.members.len() == 1 {
            return Err(StoreError::EmptyGroup(group.clone()));
        }
        self.check_removal(group, user)?;
        slot.members.retain(|member| &member.user_id != user);
        self.publish(ChangeKind::Removed, group, user);
        Ok(true)
    }

    fn subscribe_changes(&self) -> EventStream {
        self.bus.subscribe_filtered(EventFilter::Memberships)
    }
}
