use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CashflowError;
use crate::CashflowResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Per-period and annualized rates (SMM, MDR, CPR, CDR, severity) expressed as
/// decimal fractions (0.06 = 6%). Coupons and PSA/SDA/ABS speeds are the
/// exception: those follow the mortgage-market percent convention (9.5 = 9.5%,
/// 150 = 150% of the standard curve) and are documented as such at each use.
pub type Rate = Decimal;

/// A point in time measured in months since loan origination. `Age(0)` is
/// origination itself. Balance vectors are indexed by age.
///
/// Age and [`MonthIndex`] are deliberately non-interchangeable: an age is a
/// point, a month is a span, and mixing the two shifts every rate lookup by
/// one period.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Age(pub u32);

/// A 1-indexed month span: `MonthIndex(m)` is the period running from age
/// `m-1` to age `m`. Rate vectors (SMM/MDR curves) are indexed by month.
/// `MonthIndex(0)` denotes origination, where no span has elapsed and every
/// rate is zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MonthIndex(pub u32);

impl Age {
    /// The month span that ends at this age. Returns None at origination.
    pub fn month_ending_here(self) -> Option<MonthIndex> {
        if self.0 == 0 {
            None
        } else {
            Some(MonthIndex(self.0))
        }
    }

    /// The first projection month for a loan observed at this age.
    pub fn next_month(self) -> MonthIndex {
        MonthIndex(self.0 + 1)
    }
}

impl MonthIndex {
    /// The age point at the end of this month span.
    pub fn end_age(self) -> Age {
        Age(self.0)
    }

    /// The age point at the start of this month span.
    pub fn start_age(self) -> Age {
        Age(self.0.saturating_sub(1))
    }
}

/// Loan (or pool weighted-average) terms consumed by the schedule and cash
/// flow engines.
///
/// Rate convention: `gross_coupon` and `net_coupon` are annual percentages
/// (9.5 = 9.5%). The net coupon is the rate passed through to investors after
/// servicing and guarantee fees; amortization runs on the gross coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Gross weighted-average coupon, annual % (e.g. 9.5 for 9.5%).
    pub gross_coupon: Decimal,
    /// Net pass-through coupon, annual % (e.g. 9.0 for 9.0%).
    pub net_coupon: Decimal,
    /// Original term in months.
    pub original_term_months: u32,
    /// Remaining term in months as of the observation date.
    pub remaining_term_months: u32,
    /// Original face amount.
    pub original_balance: Money,
    /// Current outstanding balance.
    pub current_balance: Money,
    /// Origination date, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origination_date: Option<NaiveDate>,
    /// Observation (as-of) date, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asof_date: Option<NaiveDate>,
}

impl LoanTerms {
    /// Loan age in months: original term minus remaining term.
    pub fn age(&self) -> Age {
        Age(self.original_term_months - self.remaining_term_months)
    }

    /// Monthly gross rate as a decimal fraction (coupon% / 1200).
    pub fn gross_monthly_rate(&self) -> Rate {
        self.gross_coupon / dec!(1200)
    }

    /// Monthly net rate as a decimal fraction (coupon% / 1200).
    pub fn net_monthly_rate(&self) -> Rate {
        self.net_coupon / dec!(1200)
    }

    pub fn validate(&self) -> CashflowResult<()> {
        if self.gross_coupon < Decimal::ZERO {
            return Err(CashflowError::InvalidInput {
                field: "gross_coupon".into(),
                reason: "Coupon cannot be negative".into(),
            });
        }
        if self.net_coupon < Decimal::ZERO {
            return Err(CashflowError::InvalidInput {
                field: "net_coupon".into(),
                reason: "Coupon cannot be negative".into(),
            });
        }
        if self.original_term_months == 0 {
            return Err(CashflowError::InvalidInput {
                field: "original_term_months".into(),
                reason: "Original term must be greater than zero".into(),
            });
        }
        if self.remaining_term_months > self.original_term_months {
            return Err(CashflowError::InvalidInput {
                field: "remaining_term_months".into(),
                reason: format!(
                    "Remaining term ({}) cannot exceed original term ({})",
                    self.remaining_term_months, self.original_term_months
                ),
            });
        }
        if self.original_balance < Decimal::ZERO {
            return Err(CashflowError::InvalidInput {
                field: "original_balance".into(),
                reason: "Original balance cannot be negative".into(),
            });
        }
        if self.current_balance > self.original_balance {
            return Err(CashflowError::InvalidInput {
                field: "current_balance".into(),
                reason: format!(
                    "Current balance ({}) cannot exceed original balance ({})",
                    self.current_balance, self.original_balance
                ),
            });
        }
        if let (Some(orig), Some(asof)) = (self.origination_date, self.asof_date) {
            if asof < orig {
                return Err(CashflowError::InvalidInput {
                    field: "asof_date".into(),
                    reason: "As-of date cannot precede origination date".into(),
                });
            }
        }
        Ok(())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
