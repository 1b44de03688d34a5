//! Incremental balance engine for SplitSage.
//!
//! [`BalanceEngine`] follows the expense and group stores through the
//! shared event bus, keeps a versioned [`splitsage_ledger::LedgerIndex`]
//! snapshot up to date and answers balance and settlement queries against
//! it.

mod engine;
mod error;
mod feed;
mod policy;
mod snapshot;
pub mod telemetry;
mod view;

pub use engine::BalanceEngine;
pub use error::{EngineError, EngineResult};
pub use feed::{FeedHandle, ShutdownSignal};
pub use policy::OutstandingSplitsPolicy;
pub use snapshot::{BalanceSnapshot, BalanceUpdate};
pub use telemetry::init_tracing;
pub use view::{SettlementView, TransferView};
