//! Month-indexed rate curve generation from named speed assumptions.
//!
//! A generated [`RateVector`] covers one projection period per remaining
//! month of the loan, entry `k` carrying the rate for loan-age month
//! `start_month + k - 1`. The engine consumes these vectors as-is: every
//! policy that shapes a curve (ramps, exhaustion, the zero tail before
//! maturity on default curves) is applied here, never re-derived downstream.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::curves::conversions::{abs_to_smm, cdr_to_mdr, cpr_to_smm, psa_to_smm, sda_to_cdr};
use crate::error::CashflowError;
use crate::types::{MonthIndex, Rate};
use crate::CashflowResult;

/// Prepayment speed assumption. One curve family per variant; the set is
/// fixed by the standard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PrepaymentAssumption {
    /// Constant annual prepayment rate as a fraction (0.06 = 6% CPR).
    Cpr(Rate),
    /// PSA speed in percent (100 = 100% PSA).
    Psa(Decimal),
    /// Absolute prepayment speed in percent of original pool per month.
    Abs(Decimal),
    /// Constant monthly rate as a fraction (0.005 = 0.5% SMM).
    Smm(Rate),
}

/// Default speed assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DefaultAssumption {
    /// Constant annual default rate as a fraction (0.02 = 2% CDR).
    Cdr(Rate),
    /// SDA speed in percent (100 = 100% SDA).
    Sda(Decimal),
    /// Constant monthly default rate as a fraction.
    Mdr(Rate),
    /// No defaults.
    None,
}

/// Per-month rates for a projection window, 1-indexed by projection period.
///
/// Entry for period `i` (1-based) is the rate applied over the month ending
/// at age `start_month.0 + i - 1`. The distinction from the age-indexed
/// scheduled balance vector is deliberate: reusing one where the other is
/// expected shifts every lookup by a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateVector {
    start_month: MonthIndex,
    rates: Vec<Rate>,
}

impl RateVector {
    pub fn new(start_month: MonthIndex, rates: Vec<Rate>) -> Self {
        RateVector { start_month, rates }
    }

    /// Rate for projection period `period` (1-indexed).
    pub fn rate_for_period(&self, period: u32) -> Option<Rate> {
        if period == 0 {
            return None;
        }
        self.rates.get(period as usize - 1).copied()
    }

    /// Loan-age month covered by projection period `period`.
    pub fn month_for_period(&self, period: u32) -> MonthIndex {
        MonthIndex(self.start_month.0 + period.saturating_sub(1))
    }

    pub fn start_month(&self) -> MonthIndex {
        self.start_month
    }

    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Generate a monthly SMM curve for `remaining_term` periods starting at
/// loan-age month `start_month`.
///
/// The ABS family fails with [`CashflowError::CurveExhaustion`] if the speed
/// implies the whole pool prepays before the remaining term is covered.
pub fn generate_prepayment_curve(
    model: &PrepaymentAssumption,
    remaining_term: u32,
    start_month: MonthIndex,
) -> CashflowResult<RateVector> {
    validate_window(remaining_term, start_month)?;
    validate_prepayment_model(model)?;

    let mut rates = Vec::with_capacity(remaining_term as usize);
    for k in 1..=remaining_term {
        let month = MonthIndex(start_month.0 + k - 1);
        let smm = match model {
            PrepaymentAssumption::Cpr(cpr) => cpr_to_smm(*cpr),
            PrepaymentAssumption::Psa(speed) => psa_to_smm(*speed, month),
            PrepaymentAssumption::Abs(speed) => {
                let denominator =
                    dec!(100) - *speed * Decimal::from(month.0.saturating_sub(1));
                if denominator <= Decimal::ZERO {
                    return Err(CashflowError::CurveExhaustion {
                        family: "ABS".into(),
                        month: month.0,
                        covered: k - 1,
                        required: remaining_term,
                    });
                }
                abs_to_smm(*speed, month)
            }
            PrepaymentAssumption::Smm(smm) => *smm,
        };
        rates.push(smm);
    }

    Ok(RateVector::new(start_month, rates))
}

/// Generate a monthly MDR curve for `remaining_term` periods starting at
/// loan-age month `start_month`.
///
/// The final `recovery_lag_months` entries are forced to zero for every
/// family: a loan defaulting inside that window could not reach liquidation
/// before the pool's scheduled maturity, so the standard disallows the
/// default outright.
pub fn generate_default_curve(
    model: &DefaultAssumption,
    remaining_term: u32,
    start_month: MonthIndex,
    recovery_lag_months: u32,
) -> CashflowResult<RateVector> {
    validate_window(remaining_term, start_month)?;
    validate_default_model(model)?;

    let mut rates = Vec::with_capacity(remaining_term as usize);
    for k in 1..=remaining_term {
        let month = MonthIndex(start_month.0 + k - 1);
        let mdr = match model {
            DefaultAssumption::Cdr(cdr) => cdr_to_mdr(*cdr),
            DefaultAssumption::Sda(speed) => cdr_to_mdr(sda_to_cdr(*speed, month)),
            DefaultAssumption::Mdr(mdr) => *mdr,
            DefaultAssumption::None => Decimal::ZERO,
        };
        rates.push(mdr);
    }

    // Zero tail: defaults within `recovery_lag_months` of maturity cannot
    // liquidate in time.
    let tail = recovery_lag_months.min(remaining_term) as usize;
    let len = rates.len();
    for rate in rates.iter_mut().skip(len - tail) {
        *rate = Decimal::ZERO;
    }

    Ok(RateVector::new(start_month, rates))
}

fn validate_window(remaining_term: u32, start_month: MonthIndex) -> CashflowResult<()> {
    if remaining_term == 0 {
        return Err(CashflowError::InvalidInput {
            field: "remaining_term".into(),
            reason: "Curve must cover at least one month".into(),
        });
    }
    if start_month.0 == 0 {
        return Err(CashflowError::InvalidInput {
            field: "start_month".into(),
            reason: "Months are 1-indexed; month 0 is origination, a point, not a span".into(),
        });
    }
    Ok(())
}

fn validate_prepayment_model(model: &PrepaymentAssumption) -> CashflowResult<()> {
    match model {
        PrepaymentAssumption::Cpr(rate) => validate_fraction("prepayment.Cpr", *rate),
        PrepaymentAssumption::Smm(rate) => validate_fraction("prepayment.Smm", *rate),
        PrepaymentAssumption::Psa(speed) => validate_speed("prepayment.Psa", *speed),
        PrepaymentAssumption::Abs(speed) => validate_speed("prepayment.Abs", *speed),
    }
}

fn validate_default_model(model: &DefaultAssumption) -> CashflowResult<()> {
    match model {
        DefaultAssumption::Cdr(rate) => validate_fraction("default.Cdr", *rate),
        DefaultAssumption::Mdr(rate) => validate_fraction("default.Mdr", *rate),
        DefaultAssumption::Sda(speed) => validate_speed("default.Sda", *speed),
        DefaultAssumption::None => Ok(()),
    }
}

fn validate_fraction(field: &str, rate: Rate) -> CashflowResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(CashflowError::InvalidInput {
            field: field.into(),
            reason: "Rate must be between 0 and 1".into(),
        });
    }
    Ok(())
}

fn validate_speed(field: &str, speed: Decimal) -> CashflowResult<()> {
    if speed < Decimal::ZERO {
        return Err(CashflowError::InvalidInput {
            field: field.into(),
            reason: "Speed must be non-negative".into(),
        });
    }
    Ok(())
}
