use std::sync::Arc;

use splitsage_core::{GroupId, UserId};
use splitsage_store::{ExpenseRepository, MembershipGuard, PolicyViolation};

/// Refuses to let a member leave while they still owe unpaid splits.
///
/// Counts against the expense store rather than the engine snapshot so that
/// an expense still queued on the bus cannot slip past the check.
pub struct OutstandingSplitsPolicy {
    expenses: Arc<dyn ExpenseRepository>,
}

impl OutstandingSplitsPolicy {
    pub fn new(expenses: Arc<dyn ExpenseRepository>) -> Self {
        Self { expenses }
    }

    pub fn outstanding(&self, group: &GroupId, user: &UserId) -> usize {
        self.expenses
            .by_group(group)
            .iter()
            .flat_map(|expense| expense.outstanding_splits())
            .filter(|split| &split.user_id == user)
            .count()
    }
}

impl MembershipGuard for OutstandingSplitsPolicy {
    fn check_member_removal(&self, group: &GroupId, user: &UserId) -> Result<(), PolicyViolation> {
        match self.outstanding(group, user) {
            0 => Ok(()),
            outstanding => Err(PolicyViolation {
                group: group.clone(),
                user: user.clone(),
                outstanding,
            }),
        }
    }
}
