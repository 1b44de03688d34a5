use std::collections::BTreeSet;
use std::sync::Arc;

use splitsage_balances::{Balance, BalanceSheet, NetBalanceCalculator};
use splitsage_core::{GroupId, Scope, UserId};
use splitsage_ledger::{AffectedKeys, LedgerIndex, LedgerScope};

/// Immutable, versioned view of the ledger.
///
/// Cloning is cheap. A held snapshot never changes; the engine copies the
/// index on its next write instead.
#[derive(Clone, Debug, Default)]
pub struct BalanceSnapshot {
    pub(crate) version: u64,
    pub(crate) index: Arc<LedgerIndex>,
}

impl BalanceSnapshot {
    pub(crate) fn new(version: u64, index: Arc<LedgerIndex>) -> Self {
        Self { version, index }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self) -> &LedgerIndex {
        &self.index
    }

    pub fn calculator(&self) -> NetBalanceCalculator<'_> {
        NetBalanceCalculator::new(&self.index)
    }

    pub fn balance_for(&self, scope: &Scope, user: &UserId) -> Balance {
        self.calculator().balance_for(scope, user)
    }

    pub fn all_balances(&self, scope: &Scope) -> BalanceSheet {
        self.calculator().all_balances(scope)
    }

    pub fn pairwise_balance(&self, user: &UserId, counterparty: &UserId) -> Balance {
        self.calculator().pairwise_balance(user, counterparty)
    }

    pub fn outstanding_splits(&self, group: &GroupId, user: &UserId) -> usize {
        self.index.outstanding_splits(group, user)
    }
}

/// Two snapshots are equal when they share both version and index.
impl PartialEq for BalanceSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && Arc::ptr_eq(&self.index, &other.index)
    }
}

impl Eq for BalanceSnapshot {}

/// Notification published once per batch that changed the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub version: u64,
    /// Scopes whose balances or rosters changed.
    pub scopes: BTreeSet<Scope>,
    /// The index was recomputed from the stores; every scope may have changed.
    pub rebuilt: bool,
    /// Balances as they stood right after this update.
    pub snapshot: BalanceSnapshot,
}

impl BalanceUpdate {
    pub(crate) fn new(snapshot: BalanceSnapshot, scopes: BTreeSet<Scope>, rebuilt: bool) -> Self {
        Self {
            version: snapshot.version,
            scopes,
            rebuilt,
            snapshot,
        }
    }

    pub fn touches(&self, scope: &Scope) -> bool {
        self.rebuilt || self.scopes.contains(scope)
    }
}

pub(crate) fn scopes_of(affected: &AffectedKeys, scopes: &mut BTreeSet<Scope>) {
    for key in affected {
        if let LedgerScope::Group(group) = &key.scope {
            scopes.insert(Scope::Group(group.clone()));
        }
        scopes.insert(Scope::Global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitsage_core::Currency;
    use splitsage_ledger::LedgerKey;

    #[test]
    fn personal_keys_only_touch_global() {
        let mut affected = AffectedKeys::new();
        affected.insert(LedgerKey {
            scope: LedgerScope::Personal,
            user: UserId::from("a"),
            currency: Currency::usd(),
        });
        affected.insert(LedgerKey {
            scope: LedgerScope::Group(GroupId::from("g")),
            user: UserId::from("a"),
            currency: Currency::usd(),
        });
        let mut scopes = BTreeSet::new();
        scopes_of(&affected, &mut scopes);
        let update = BalanceUpdate::new(BalanceSnapshot::default(), scopes, false);
        assert!(update.touches(&Scope::Global));
        assert!(update.touches(&Scope::group("g")));
        assert!(!update.touches(&Scope::group("other")));
    }

    #[test]
    fn snapshots_compare_by_shared_index() {
        let index = Arc::new(LedgerIndex::default());
        let held = BalanceSnapshot::new(3, index.clone());
        assert_eq!(held, BalanceSnapshot::new(3, index.clone()));
        assert_ne!(held, BalanceSnapshot::new(4, index));
        assert_ne!(held, BalanceSnapshot::new(3, Arc::new(LedgerIndex::default())));
    }
}
