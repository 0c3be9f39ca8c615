pub mod cashflow;
pub mod curves;
pub mod schedule;

use clap::Args;
use rust_decimal::Decimal;

use mbs_cashflow_core::types::LoanTerms;

/// Loan term flags shared by the schedule and cashflow commands.
#[derive(Args)]
pub struct LoanArgs {
    /// Gross weighted-average coupon, annual % (e.g. 9.5)
    #[arg(long)]
    pub gross_coupon: Option<Decimal>,

    /// Net pass-through coupon, annual % (defaults to the gross coupon)
    #[arg(long)]
    pub net_coupon: Option<Decimal>,

    /// Original term in months
    #[arg(long)]
    pub original_term: Option<u32>,

    /// Remaining term in months (defaults to the original term)
    #[arg(long)]
    pub remaining_term: Option<u32>,

    /// Original face amount
    #[arg(long)]
    pub original_balance: Option<Decimal>,

    /// Current outstanding balance (defaults to the original balance)
    #[arg(long)]
    pub current_balance: Option<Decimal>,
}

impl LoanArgs {
    pub fn to_loan_terms(&self) -> Result<LoanTerms, Box<dyn std::error::Error>> {
        let gross_coupon = self
            .gross_coupon
            .ok_or("--gross-coupon is required (or provide --input)")?;
        let original_term = self
            .original_term
            .ok_or("--original-term is required (or provide --input)")?;
        let original_balance = self
            .original_balance
            .ok_or("--original-balance is required (or provide --input)")?;
        Ok(LoanTerms {
            gross_coupon,
            net_coupon: self.net_coupon.unwrap_or(gross_coupon),
            original_term_months: original_term,
            remaining_term_months: self.remaining_term.unwrap_or(original_term),
            original_balance,
            current_balance: self.current_balance.unwrap_or(original_balance),
            origination_date: None,
            asof_date: None,
        })
    }
}
