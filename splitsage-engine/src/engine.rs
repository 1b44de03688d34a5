use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use splitsage_balances::{Balance, BalanceSheet, SettlementPlan, SettlementPlanner};
use splitsage_core::{ChangeKind, CurrencyUnits, GroupId, Scope, UserId};
use splitsage_events::Event;
use splitsage_ledger::{LedgerIndex, LedgerOperation, LedgerResult};
use splitsage_store::{ExpenseRepository, GroupRepository, MembershipGuard, UserRepository};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::feed::{self, FeedHandle};
use crate::policy::OutstandingSplitsPolicy;
use crate::snapshot::{scopes_of, BalanceSnapshot, BalanceUpdate};
use crate::view::SettlementView;
use crate::EngineResult;

/// Keeps net balances in sync with the collaborator stores.
///
/// There is a single writer (the change feed, or a caller driving
/// [`BalanceEngine::apply_batch`] directly) and any number of readers.
/// Readers take a [`BalanceSnapshot`] and never observe a half-applied
/// batch.
pub struct BalanceEngine {
    state: RwLock<BalanceSnapshot>,
    updates: watch::Sender<BalanceUpdate>,
    planner: SettlementPlanner,
    units: CurrencyUnits,
    expenses: Arc<dyn ExpenseRepository>,
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    policy: Arc<OutstandingSplitsPolicy>,
}

impl BalanceEngine {
    pub fn new(
        units: CurrencyUnits,
        expenses: Arc<dyn ExpenseRepository>,
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let initial = BalanceSnapshot::new(0, Arc::new(LedgerIndex::new(units.clone())));
        let (updates, _) =
            watch::channel(BalanceUpdate::new(initial.clone(), BTreeSet::new(), false));
        Self {
            state: RwLock::new(initial),
            updates,
            planner: SettlementPlanner::new(units.clone()),
            units,
            policy: Arc::new(OutstandingSplitsPolicy::new(expenses.clone())),
            expenses,
            groups,
            users,
        }
    }

    /// Subscribe to both stores, load their current contents and follow
    /// their changes on a background task.
    ///
    /// Subscribing before loading means an event raced with the load is
    /// applied twice, which the ledger treats as a no-op.
    pub fn start(self: &Arc<Self>) -> FeedHandle {
        let expenses = self.expenses.subscribe_changes();
        let memberships = self.groups.subscribe_changes();
        self.rebuild();
        feed::spawn(self.clone(), expenses, memberships)
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        self.state.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Receiver that yields once per batch that changed the ledger, carrying
    /// the snapshot it produced. Only the latest update is retained, so slow
    /// readers skip straight to the newest state.
    pub fn subscribe(&self) -> watch::Receiver<BalanceUpdate> {
        self.updates.subscribe()
    }

    pub fn balance_for(&self, scope: &Scope, user: &UserId) -> Balance {
        self.snapshot().balance_for(scope, user)
    }

    pub fn all_balances(&self, scope: &Scope) -> BalanceSheet {
        self.snapshot().all_balances(scope)
    }

    pub fn pairwise_balance(&self, user: &UserId, counterparty: &UserId) -> Balance {
        self.snapshot().pairwise_balance(user, counterparty)
    }

    pub fn outstanding_splits(&self, group: &GroupId, user: &UserId) -> usize {
        self.snapshot().outstanding_splits(group, user)
    }

    pub fn settlement_plan(&self, scope: &Scope) -> EngineResult<SettlementPlan> {
        let sheet = self.all_balances(scope);
        Ok(self.planner.plan(&sheet)?)
    }

    /// Settlement plan with participants and the group resolved to names.
    pub fn settlement_view(&self, scope: &Scope) -> EngineResult<SettlementView> {
        let snapshot = self.snapshot();
        let plan = self.planner.plan(&snapshot.all_balances(scope))?;
        let title = match scope {
            Scope::Group(group) => self
                .groups
                .get(group)
                .map(|group| group.name)
                .unwrap_or_else(|| group.to_string()),
            Scope::Global => "All balances".to_string(),
        };
        Ok(SettlementView::new(
            &plan,
            title,
            snapshot.version(),
            self.users.as_ref(),
        ))
    }

    pub fn check_member_removal(&self, group: &GroupId, user: &UserId) -> EngineResult<()> {
        Ok(self.policy.check_member_removal(group, user)?)
    }

    /// Guard to install on the group store.
    pub fn removal_policy(&self) -> Arc<dyn MembershipGuard> {
        self.policy.clone()
    }

    /// Apply a batch of change events and publish exactly one update.
    ///
    /// Malformed expenses are logged and skipped; the rest of the batch
    /// still applies. A batch that leaves the ledger as it was publishes
    /// nothing, keeps the version and returns `None`.
    pub fn apply_batch<I>(&self, events: I) -> Option<BalanceUpdate>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut scopes = BTreeSet::new();
        let mut applied = 0usize;
        let mut skipped = 0usize;
        let update = {
            let mut state = self.state.write();
            let index = Arc::make_mut(&mut state.index);
            let before = index.version();
            for event in events {
                match apply_event(index, &event, &mut scopes) {
                    Ok(()) => applied += 1,
                    Err(err) => {
                        warn!(
                            expense = %err.expense(),
                            error = %err,
                            "skipping change that violates ledger invariants"
                        );
                        skipped += 1;
                    }
                }
            }
            if index.version() == before {
                None
            } else {
                state.version += 1;
                Some(BalanceUpdate::new(state.clone(), scopes, false))
            }
        };
        let Some(update) = update else {
            debug!(applied, skipped, "change batch left the ledger unchanged");
            return None;
        };
        debug!(
            version = update.version,
            applied,
            skipped,
            scopes = update.scopes.len(),
            "applied change batch"
        );
        self.updates.send_replace(update.clone());
        Some(update)
    }

    /// Recompute the index from the stores and publish the result.
    pub fn rebuild(&self) -> BalanceUpdate {
        let mut index = LedgerIndex::new(self.units.clone());
        let mut skipped = 0usize;
        let expenses = self.expenses.all();
        for expense in &expenses {
            if let Err(err) = index.apply(expense, LedgerOperation::Add) {
                warn!(expense = %expense.id, error = %err, "skipping stored expense during rebuild");
                skipped += 1;
            }
        }
        let groups = self.groups.all();
        for group in &groups {
            for user in group.member_ids() {
                index.register_member(&group.id, user);
            }
        }
        let mut scopes: BTreeSet<Scope> = index.group_ids().cloned().map(Scope::Group).collect();
        scopes.insert(Scope::Global);

        let update = {
            let mut state = self.state.write();
            state.index = Arc::new(index);
            state.version += 1;
            BalanceUpdate::new(state.clone(), scopes, true)
        };
        info!(
            version = update.version,
            expenses = expenses.len(),
            groups = groups.len(),
            skipped,
            "rebuilt balance index"
        );
        self.updates.send_replace(update.clone());
        update
    }
}

fn apply_event(
    index: &mut LedgerIndex,
    event: &Event,
    scopes: &mut BTreeSet<Scope>,
) -> LedgerResult<()> {
    match event {
        Event::Expense(change) => {
            let op = match change.kind {
                ChangeKind::Added => LedgerOperation::Add,
                ChangeKind::Updated => LedgerOperation::Update,
                ChangeKind::Removed => LedgerOperation::Remove,
            };
            let affected = index.apply(&change.expense, op)?;
            scopes_of(&affected, scopes);
        }
        Event::Membership(change) => {
            let changed = match change.kind {
                ChangeKind::Added => index.register_member(&change.group, &change.user),
                ChangeKind::Removed => index.unregister_member(&change.group, &change.user),
                ChangeKind::Updated => false,
            };
            if changed {
                scopes.insert(Scope::Group(change.group.clone()));
                scopes.insert(Scope::Global);
            }
        }
    }
    Ok(())
}
