use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use mbs_cashflow_core::curves::{
    generate_default_curve, generate_prepayment_curve, DefaultAssumption, PrepaymentAssumption,
};
use mbs_cashflow_core::types::MonthIndex;

/// Prepayment curve families
#[derive(Debug, Clone, ValueEnum)]
pub enum PrepayFamily {
    /// Constant annual rate (speed is a fraction, 0.06 = 6% CPR)
    Cpr,
    /// Standard prepayment curve (speed in percent, 100 = 100% PSA)
    Psa,
    /// Absolute prepayment speed (percent of original pool per month)
    Abs,
    /// Constant monthly rate (speed is a fraction, 0.005 = 0.5% SMM)
    Smm,
}

/// Default curve families
#[derive(Debug, Clone, ValueEnum)]
pub enum DefaultFamily {
    /// Constant annual rate (speed is a fraction, 0.02 = 2% CDR)
    Cdr,
    /// Standard default curve (speed in percent, 100 = 100% SDA)
    Sda,
    /// Constant monthly rate (speed is a fraction)
    Mdr,
    /// No defaults
    None,
}

/// Arguments for prepayment curve generation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PrepayCurveArgs {
    /// Curve family
    #[arg(long, value_enum)]
    pub family: PrepayFamily,

    /// Speed parameter (convention depends on the family)
    #[arg(long, default_value = "0")]
    pub speed: Decimal,

    /// Number of months to cover
    #[arg(long)]
    pub term: u32,

    /// Loan-age month of the first projection period (1 for a new loan)
    #[arg(long, default_value = "1")]
    pub start_month: u32,
}

/// Arguments for default curve generation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DefaultCurveArgs {
    /// Curve family
    #[arg(long, value_enum)]
    pub family: DefaultFamily,

    /// Speed parameter (convention depends on the family)
    #[arg(long, default_value = "0")]
    pub speed: Decimal,

    /// Number of months to cover
    #[arg(long)]
    pub term: u32,

    /// Loan-age month of the first projection period (1 for a new loan)
    #[arg(long, default_value = "1")]
    pub start_month: u32,

    /// Recovery lag: the final N months of the curve are forced to zero
    #[arg(long, default_value = "12")]
    pub recovery_lag: u32,
}

impl PrepayFamily {
    pub fn to_assumption(&self, speed: Decimal) -> PrepaymentAssumption {
        match self {
            PrepayFamily::Cpr => PrepaymentAssumption::Cpr(speed),
            PrepayFamily::Psa => PrepaymentAssumption::Psa(speed),
            PrepayFamily::Abs => PrepaymentAssumption::Abs(speed),
            PrepayFamily::Smm => PrepaymentAssumption::Smm(speed),
        }
    }
}

impl DefaultFamily {
    pub fn to_assumption(&self, speed: Decimal) -> DefaultAssumption {
        match self {
            DefaultFamily::Cdr => DefaultAssumption::Cdr(speed),
            DefaultFamily::Sda => DefaultAssumption::Sda(speed),
            DefaultFamily::Mdr => DefaultAssumption::Mdr(speed),
            DefaultFamily::None => DefaultAssumption::None,
        }
    }
}

pub fn run_prepay_curve(args: PrepayCurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.family.to_assumption(args.speed);
    let curve = generate_prepayment_curve(&model, args.term, MonthIndex(args.start_month))?;
    Ok(serde_json::to_value(curve)?)
}

pub fn run_default_curve(args: DefaultCurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.family.to_assumption(args.speed);
    let curve = generate_default_curve(
        &model,
        args.term,
        MonthIndex(args.start_month),
        args.recovery_lag,
    )?;
    Ok(serde_json::to_value(curve)?)
}
