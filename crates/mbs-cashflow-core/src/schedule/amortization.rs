//! Scheduled (zero-prepayment, zero-default) amortization for level-payment
//! fixed-rate loans.
//!
//! The central quantity is the scheduled balance factor BAL(M): outstanding
//! principal as a fraction of par when M months remain on an original term of
//! M0 months,
//!
//!     BAL(M) = [1 - (1+r)^-M] / [1 - (1+r)^-M0],   r = coupon% / 1200
//!
//! the ratio of present-value annuity factors for the remaining and original
//! payment streams. All math in `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CashflowError;
use crate::math::iterative_pow_recip;
use crate::types::{Age, MonthIndex};
use crate::CashflowResult;

/// Coupons at or below this level (in annual %) amortize straight-line. The
/// closed form degenerates to (M - n)/M as the coupon approaches zero and the
/// 1 - (1+r)^-M terms cancel catastrophically.
const COUPON_EPSILON: Decimal = dec!(0.0000001);

/// Scheduled balance factor BAL(M) as a fraction of par.
///
/// `coupon` is the gross annual coupon in percent (9.5 = 9.5%). At
/// `remaining_term == 0` the loan is fully amortized and the factor is an
/// explicit zero, not a floating-point residue.
pub fn balance_factor(
    coupon: Decimal,
    original_term: u32,
    remaining_term: u32,
) -> CashflowResult<Decimal> {
    validate_terms(coupon, original_term, remaining_term)?;

    if remaining_term == 0 {
        return Ok(Decimal::ZERO);
    }
    if coupon <= COUPON_EPSILON {
        return Ok(Decimal::from(remaining_term) / Decimal::from(original_term));
    }

    let r = coupon / dec!(1200);
    let numerator = Decimal::ONE - iterative_pow_recip(Decimal::ONE + r, remaining_term);
    let denominator = Decimal::ONE - iterative_pow_recip(Decimal::ONE + r, original_term);
    if denominator.is_zero() {
        return Err(CashflowError::DivisionByZero {
            context: format!("balance factor annuity denominator (term {original_term})"),
        });
    }
    Ok(numerator / denominator)
}

/// Scheduled balance factor at a given age (months since origination).
/// `balance_factor_at_age(c, M0, Age(0)) == 1` and
/// `balance_factor_at_age(c, M0, Age(M0)) == 0`.
pub fn balance_factor_at_age(
    coupon: Decimal,
    original_term: u32,
    age: Age,
) -> CashflowResult<Decimal> {
    if age.0 > original_term {
        return Err(CashflowError::InvalidInput {
            field: "age".into(),
            reason: format!("Age ({}) cannot exceed original term ({original_term})", age.0),
        });
    }
    balance_factor(coupon, original_term, original_term - age.0)
}

/// Annuity (payment) factor AF(M) = r / [1 - (1+r)^-M]: the level payment per
/// dollar of balance that amortizes the loan over M months at rate r.
pub fn payment_factor(coupon: Decimal, remaining_term: u32) -> CashflowResult<Decimal> {
    if coupon < Decimal::ZERO {
        return Err(CashflowError::InvalidInput {
            field: "coupon".into(),
            reason: "Coupon cannot be negative".into(),
        });
    }
    if remaining_term == 0 {
        return Ok(Decimal::ZERO);
    }
    if coupon <= COUPON_EPSILON {
        return Ok(Decimal::ONE / Decimal::from(remaining_term));
    }
    let r = coupon / dec!(1200);
    let denom = Decimal::ONE - iterative_pow_recip(Decimal::ONE + r, remaining_term);
    if denom.is_zero() {
        return Err(CashflowError::DivisionByZero {
            context: format!("annuity factor (remaining term {remaining_term})"),
        });
    }
    Ok(r / denom)
}

/// Single-period amortization factor: the fraction of the beginning balance
/// paid as scheduled principal over one month, AF(M) - r. Works against any
/// balance, scheduled or actual.
pub fn am_factor(coupon: Decimal, remaining_term: u32) -> CashflowResult<Decimal> {
    if remaining_term == 0 {
        return Ok(Decimal::ZERO);
    }
    if coupon <= COUPON_EPSILON {
        return payment_factor(coupon, remaining_term);
    }
    let r = coupon / dec!(1200);
    Ok(payment_factor(coupon, remaining_term)? - r)
}

/// Age-indexed scheduled balance factors for a full loan life.
///
/// `factors[age] = BAL(M0 - age)`; the vector starts at 1.0, is strictly
/// non-increasing, and ends at exactly 0.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBalanceVector {
    /// Gross annual coupon in percent.
    coupon: Decimal,
    original_term: u32,
    factors: Vec<Decimal>,
}

impl ScheduledBalanceVector {
    /// Balance factor at an age point. None once past the original term.
    pub fn at(&self, age: Age) -> Option<Decimal> {
        self.factors.get(age.0 as usize).copied()
    }

    /// Single-month survival ratio BAL(end of month) / BAL(start of month).
    /// Zero once the starting balance has amortized away.
    pub fn survival_ratio(&self, month: MonthIndex) -> Option<Decimal> {
        let end = self.at(month.end_age())?;
        let start = self.at(month.start_age())?;
        if start.is_zero() {
            Some(Decimal::ZERO)
        } else {
            Some(end / start)
        }
    }

    pub fn original_term(&self) -> u32 {
        self.original_term
    }

    pub fn coupon(&self) -> Decimal {
        self.coupon
    }

    pub fn as_slice(&self) -> &[Decimal] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Build the full age-indexed scheduled balance vector by repeated
/// application of the single-period survival ratio:
///
///     factors[0] = 1
///     factors[k] = factors[k-1] * (1 - am_factor(M0 - k + 1))
///
/// The terminal element is forced to the exact zero limit rather than left to
/// accumulated rounding.
pub fn schedule_vector(
    coupon: Decimal,
    original_term: u32,
) -> CashflowResult<ScheduledBalanceVector> {
    validate_terms(coupon, original_term, original_term)?;

    let mut factors = Vec::with_capacity(original_term as usize + 1);
    factors.push(Decimal::ONE);

    let mut balance = Decimal::ONE;
    for age in 1..=original_term {
        let remaining_at_start = original_term - age + 1;
        if age == original_term {
            balance = Decimal::ZERO;
        } else {
            balance *= Decimal::ONE - am_factor(coupon, remaining_at_start)?;
        }
        factors.push(balance);
    }

    Ok(ScheduledBalanceVector {
        coupon,
        original_term,
        factors,
    })
}

fn validate_terms(coupon: Decimal, original_term: u32, remaining_term: u32) -> CashflowResult<()> {
    if original_term == 0 {
        return Err(CashflowError::InvalidInput {
            field: "original_term".into(),
            reason: "Original term must be greater than zero".into(),
        });
    }
    if remaining_term > original_term {
        return Err(CashflowError::InvalidInput {
            field: "remaining_term".into(),
            reason: format!(
                "Remaining term ({remaining_term}) cannot exceed original term ({original_term})"
            ),
        });
    }
    if coupon < Decimal::ZERO {
        return Err(CashflowError::InvalidInput {
            field: "coupon".into(),
            reason: "Coupon cannot be negative".into(),
        });
    }
    Ok(())
}
