//! Net balance reduction and settle-up planning over the SplitSage ledger index.

mod calculator;
mod error;
mod planner;

pub use calculator::{Balance, BalanceSheet, NetBalanceCalculator};
pub use error::{PlanError, PlanResult};
pub use planner::{SettlementPlan, SettlementPlanner, Transfer};
