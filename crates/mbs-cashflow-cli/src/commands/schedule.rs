use clap::Args;
use serde_json::Value;

use mbs_cashflow_core::cashflows::run_scheduled_cashflow;
use mbs_cashflow_core::types::LoanTerms;

use crate::commands::LoanArgs;
use crate::input;

/// Arguments for the scheduled amortization projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub loan: LoanArgs,

    /// Path to JSON/YAML input file with loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        args.loan.to_loan_terms()?
    };

    let result = run_scheduled_cashflow(&loan)?;
    Ok(serde_json::to_value(result)?)
}
