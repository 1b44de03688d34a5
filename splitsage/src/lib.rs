//! SplitSage: shared-expense balances and settle-up plans.
//!
//! Re-exports every workspace crate and offers [`App`], which wires the
//! event bus, the in-memory stores and the balance engine from an
//! [`EngineConfig`].

use std::sync::Arc;

pub use splitsage_balances as balances;
pub use splitsage_config as config;
pub use splitsage_core as domain;
pub use splitsage_engine as engine;
pub use splitsage_events as events;
pub use splitsage_ledger as ledger;
pub use splitsage_store as store;

pub use splitsage_balances::{Balance, BalanceSheet, SettlementPlan, Transfer};
pub use splitsage_config::{EngineConfig, LogConfig};
pub use splitsage_core::{
    Currency, Expense, ExpenseSplit, Group, GroupId, GroupMember, Scope, User, UserId,
};
pub use splitsage_engine::{BalanceEngine, EngineError, EngineResult, FeedHandle, SettlementView};

use splitsage_events::EventBus;
use splitsage_store::{InMemoryExpenseStore, InMemoryGroupStore, InMemoryUserStore};
use tracing::info;

/// Fully wired in-memory deployment.
pub struct App {
    pub bus: EventBus,
    pub expenses: Arc<InMemoryExpenseStore>,
    pub groups: Arc<InMemoryGroupStore>,
    pub users: Arc<InMemoryUserStore>,
    pub engine: Arc<BalanceEngine>,
}

impl App {
    pub fn new(config: &EngineConfig) -> Self {
        let units = config.currency_units();
        let bus = EventBus::new(config.event_bus_capacity);
        let expenses = Arc::new(InMemoryExpenseStore::new(bus.clone(), units.clone()));
        let groups = Arc::new(InMemoryGroupStore::new(bus.clone()));
        let users = Arc::new(InMemoryUserStore::new());
        let engine = Arc::new(BalanceEngine::new(
            units,
            expenses.clone(),
            groups.clone(),
            users.clone(),
        ));
        groups.set_guard(engine.removal_policy());
        info!(
            capacity = config.event_bus_capacity,
            currency_overrides = config.currencies.len(),
            "splitsage app assembled"
        );
        Self {
            bus,
            expenses,
            groups,
            users,
            engine,
        }
    }

    /// Start following the stores. Must be called inside a Tokio runtime.
    pub fn start(&self) -> FeedHandle {
        self.engine.start()
    }
}
