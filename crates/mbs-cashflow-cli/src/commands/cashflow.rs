use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use mbs_cashflow_core::cashflows::{
    self, CashflowAssumptions, CashflowInput, SeveritySpec,
};

use crate::commands::LoanArgs;
use crate::commands::curves::{DefaultFamily, PrepayFamily};
use crate::input;

/// Arguments for the full cash flow projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CashflowArgs {
    #[command(flatten)]
    pub loan: LoanArgs,

    /// Prepayment curve family
    #[arg(long, value_enum, default_value = "psa")]
    pub prepay_family: PrepayFamily,

    /// Prepayment speed (convention depends on the family)
    #[arg(long, default_value = "100")]
    pub prepay_speed: Decimal,

    /// Default curve family
    #[arg(long, value_enum, default_value = "sda")]
    pub default_family: DefaultFamily,

    /// Default speed (convention depends on the family)
    #[arg(long, default_value = "100")]
    pub default_speed: Decimal,

    /// Flat loss severity as a fraction (0.35 = 35% loss given default)
    #[arg(long, default_value = "0.35")]
    pub severity: Decimal,

    /// Months from first missed payment to liquidation
    #[arg(long, default_value = "12")]
    pub recovery_lag: u32,

    /// Do not model servicer advances of uncollected P&I
    #[arg(long)]
    pub no_advance: bool,

    /// Path to JSON/YAML input file with the full projection input
    /// (overrides individual flags; supports severity curves)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cashflow(args: CashflowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cf_input: CashflowInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        if args.severity < Decimal::ZERO || args.severity > dec!(1) {
            return Err("--severity must be a fraction between 0 and 1".into());
        }
        CashflowInput {
            loan: args.loan.to_loan_terms()?,
            assumptions: CashflowAssumptions {
                prepayment: args.prepay_family.to_assumption(args.prepay_speed),
                default: args.default_family.to_assumption(args.default_speed),
                severity: SeveritySpec::Flat(args.severity),
                recovery_lag_months: args.recovery_lag,
                servicer_advance: !args.no_advance,
            },
        }
    };

    let result = cashflows::run_cashflow(&cf_input)?;
    Ok(serde_json::to_value(result)?)
}
