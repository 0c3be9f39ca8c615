pub mod engine;
pub mod scheduled;

pub use engine::{
    run_cashflow, run_cashflow_with_curves, CashflowAssumptions, CashflowInput, CashflowPeriod,
    CashflowProjection, CashflowSummary, SeveritySpec,
};
pub use scheduled::{run_scheduled_cashflow, ScheduledCashflow, ScheduledPeriod};
