//! Pairwise conversions between prepayment/default rate quotations, and
//! historical speed recovery from observed pool factors.
//!
//! Conventions: SMM/MDR/CPR/CDR are decimal fractions (0.06 = 6%); PSA, SDA
//! and ABS speeds are percent (100 = 100% of the standard curve). Month
//! arguments are [`MonthIndex`] spans: month m runs from age m-1 to age m, and
//! `MonthIndex(0)` (origination, no elapsed span) always maps to rate zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::CashflowError;
use crate::math::{iterative_pow, nth_root};
use crate::schedule::balance_factor;
use crate::types::{Age, MonthIndex, Rate};
use crate::CashflowResult;

/// PSA plateau CPR from month 30 onward (6% annual).
const PSA_PLATEAU_CPR: Decimal = dec!(0.06);

/// SDA peak CDR over months 30-60 (0.6% annual).
const SDA_PEAK_CDR: Decimal = dec!(0.006);

/// SDA tail CDR from month 121 onward (0.03% annual).
const SDA_TAIL_CDR: Decimal = dec!(0.0003);

/// Convert single monthly mortality to the annually compounded CPR.
/// CPR = 1 - (1 - SMM)^12
pub fn smm_to_cpr(smm: Rate) -> Rate {
    if smm <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if smm >= Decimal::ONE {
        return Decimal::ONE;
    }
    Decimal::ONE - iterative_pow(Decimal::ONE - smm, 12)
}

/// Convert annual CPR to single monthly mortality.
/// SMM = 1 - (1 - CPR)^(1/12)
pub fn cpr_to_smm(cpr: Rate) -> Rate {
    if cpr <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if cpr >= Decimal::ONE {
        return Decimal::ONE;
    }
    Decimal::ONE - nth_root(Decimal::ONE - cpr, 12)
}

/// CPR implied by a PSA speed at a given month.
///
/// The standard 100% curve ramps 0.2% CPR per month through month 30, then
/// plateaus at 6%. `psa_speed` scales the curve (150 = 150% PSA).
pub fn psa_to_cpr(psa_speed: Decimal, month: MonthIndex) -> Rate {
    if month.0 == 0 {
        return Decimal::ZERO;
    }
    let ramp_month = Decimal::from(month.0.min(30));
    let cpr = psa_speed / dec!(100) * dec!(0.002) * ramp_month;
    cpr.min(Decimal::ONE)
}

/// PSA speed that produces a given CPR at a given month. Inverse of
/// [`psa_to_cpr`]. Returns zero at origination.
pub fn cpr_to_psa(cpr: Rate, month: MonthIndex) -> Decimal {
    if month.0 == 0 {
        return Decimal::ZERO;
    }
    let ramp_month = Decimal::from(month.0.min(30));
    // CPR = speed/100 * 0.002 * month  =>  speed = CPR / (0.002 * month) * 100
    cpr / (dec!(0.002) * ramp_month) * dec!(100)
}

/// SMM implied by a PSA speed at a given month (CPR step folded in).
pub fn psa_to_smm(psa_speed: Decimal, month: MonthIndex) -> Rate {
    cpr_to_smm(psa_to_cpr(psa_speed, month))
}

/// SMM implied by an ABS (absolute prepayment) speed at a given month.
///
/// The ABS model holds the dollar level of prepayments constant, so the
/// monthly rate rises as the pool shrinks:
///
///     SMM(m) = ABS / (100 - ABS * (m - 1))
///
/// Once the denominator reaches zero the whole remaining pool has prepaid;
/// this returns 1.0 there (curve generation reports the exhaustion as an
/// error before that point is consumed).
pub fn abs_to_smm(abs_speed: Decimal, month: MonthIndex) -> Rate {
    if month.0 == 0 || abs_speed <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let denominator = dec!(100) - abs_speed * Decimal::from(month.0 - 1);
    if denominator <= Decimal::ZERO {
        return Decimal::ONE;
    }
    (abs_speed / denominator).min(Decimal::ONE)
}

/// CDR implied by an SDA speed at a given month.
///
/// The standard 100% curve: 0.02% CDR per month through month 30, flat 0.6%
/// through month 60, linear decline to 0.03% at month 120, flat thereafter.
pub fn sda_to_cdr(sda_speed: Decimal, month: MonthIndex) -> Rate {
    if month.0 == 0 {
        return Decimal::ZERO;
    }
    let base_cdr = if month.0 <= 30 {
        SDA_PEAK_CDR * Decimal::from(month.0) / dec!(30)
    } else if month.0 <= 60 {
        SDA_PEAK_CDR
    } else if month.0 <= 120 {
        let decline_range = SDA_PEAK_CDR - SDA_TAIL_CDR;
        SDA_PEAK_CDR - decline_range * Decimal::from(month.0 - 60) / dec!(60)
    } else {
        SDA_TAIL_CDR
    };
    base_cdr * sda_speed / dec!(100)
}

/// Convert annual CDR to monthly default rate. Same compounding transform as
/// CPR to SMM.
pub fn cdr_to_mdr(cdr: Rate) -> Rate {
    cpr_to_smm(cdr)
}

// ---------------------------------------------------------------------------
// Historical speed recovery (single pool)
// ---------------------------------------------------------------------------

/// Average single-month SMM over a window, from actual and scheduled balance
/// factors at the window boundaries. The scheduled ratio strips out scheduled
/// amortization so only unscheduled principal is counted:
///
///     F_sched = act_beg * (sch_end / sch_beg)
///     SMM_avg = 1 - (act_end / F_sched)^(1/window_months)
pub fn smm_from_factors(
    act_beg_factor: Decimal,
    act_end_factor: Decimal,
    sch_beg_factor: Decimal,
    sch_end_factor: Decimal,
    window_months: u32,
) -> CashflowResult<Rate> {
    if window_months == 0 {
        return Err(CashflowError::InvalidInput {
            field: "window_months".into(),
            reason: "Observation window must cover at least one month".into(),
        });
    }
    if act_beg_factor <= Decimal::ZERO || sch_beg_factor <= Decimal::ZERO {
        return Err(CashflowError::DivisionByZero {
            context: "beginning balance factor in SMM back-calculation".into(),
        });
    }

    let f_sched = act_beg_factor * (sch_end_factor / sch_beg_factor);
    if f_sched <= Decimal::ZERO {
        return Err(CashflowError::DivisionByZero {
            context: "scheduled ending factor in SMM back-calculation".into(),
        });
    }
    let survival_ratio = act_end_factor / f_sched;
    let avg_monthly_survival = nth_root(survival_ratio, window_months);
    Ok(Decimal::ONE - avg_monthly_survival)
}

/// Average historical SMM for a fixed-rate pool between two observed factor
/// points. `coupon` is the gross annual coupon in percent; scheduled balances
/// come from the closed-form factor.
pub fn historical_smm(
    coupon: Decimal,
    original_term: u32,
    act_beg_factor: Decimal,
    beginning_age: Age,
    act_end_factor: Decimal,
    ending_age: Age,
) -> CashflowResult<Rate> {
    if ending_age <= beginning_age {
        return Err(CashflowError::InvalidInput {
            field: "ending_age".into(),
            reason: format!(
                "Ending age ({}) must be after beginning age ({})",
                ending_age.0, beginning_age.0
            ),
        });
    }
    let months = ending_age.0 - beginning_age.0;
    let sch_beg = balance_factor(coupon, original_term, original_term - beginning_age.0)?;
    let sch_end = balance_factor(coupon, original_term, original_term - ending_age.0)?;
    smm_from_factors(act_beg_factor, act_end_factor, sch_beg, sch_end, months)
}

/// Average historical CPR for a fixed-rate pool between two observed factor
/// points. Annualized form of [`historical_smm`].
pub fn historical_cpr(
    coupon: Decimal,
    original_term: u32,
    act_beg_factor: Decimal,
    beginning_age: Age,
    act_end_factor: Decimal,
    ending_age: Age,
) -> CashflowResult<Rate> {
    let smm = historical_smm(
        coupon,
        original_term,
        act_beg_factor,
        beginning_age,
        act_end_factor,
        ending_age,
    )?;
    Ok(smm_to_cpr(smm))
}

/// Historical ABS speed (percent) implied by factor and scheduled-balance
/// observations at two ages:
///
///     ABS = 100 * [(F2/F1) - (BAL2/BAL1)] / [AGE1*(F2/F1) - AGE2*(BAL2/BAL1)]
///
/// The denominator is a difference of near-equal products; when it is inside
/// the cancellation noise implied by the accuracy of the input balances
/// (relative error ~1e-4 after a full amortization pipeline with rounding to
/// cents), the speed is reported as zero rather than an artifact of noise.
pub fn historical_abs(
    age1: Age,
    f1: Decimal,
    bal1: Decimal,
    age2: Age,
    f2: Decimal,
    bal2: Decimal,
) -> CashflowResult<Decimal> {
    if f1 <= Decimal::ZERO || bal1 <= Decimal::ZERO {
        return Err(CashflowError::DivisionByZero {
            context: "beginning factor in ABS back-calculation".into(),
        });
    }
    let f_ratio = f2 / f1;
    let bal_ratio = bal2 / bal1;
    let num = f_ratio - bal_ratio;
    let den = Decimal::from(age1.0) * f_ratio - Decimal::from(age2.0) * bal_ratio;

    let eps_in = dec!(0.0001);
    let t1 = Decimal::from(age1.0) * f_ratio.abs();
    let t2 = Decimal::from(age2.0) * bal_ratio.abs();
    let err_den = (t1 + t2) * dec!(2) * eps_in;
    if den.abs() < dec!(2) * err_den {
        return Ok(Decimal::ZERO);
    }
    Ok(dec!(100) * num / den)
}

/// Project an ending pool factor from a beginning factor and a per-month SMM
/// path: scheduled amortization times prepayment survival.
pub fn project_end_factor(
    act_beg_factor: Decimal,
    smm_path: &[Rate],
    coupon: Decimal,
    original_term: u32,
    beginning_age: Age,
) -> CashflowResult<Decimal> {
    let months = smm_path.len() as u32;
    if beginning_age.0 + months > original_term {
        return Err(CashflowError::InvalidInput {
            field: "smm_path".into(),
            reason: format!(
                "Projection window ({} months from age {}) runs past the original term ({})",
                months, beginning_age.0, original_term
            ),
        });
    }
    let sch_beg = balance_factor(coupon, original_term, original_term - beginning_age.0)?;
    let sch_end = balance_factor(
        coupon,
        original_term,
        original_term - beginning_age.0 - months,
    )?;
    if sch_beg.is_zero() {
        return Err(CashflowError::DivisionByZero {
            context: "scheduled beginning factor in factor projection".into(),
        });
    }
    let mut prepay_survival = Decimal::ONE;
    for smm in smm_path {
        prepay_survival *= Decimal::ONE - *smm;
    }
    Ok(act_beg_factor * (sch_end / sch_beg) * prepay_survival)
}

const PSA_SOLVER_MAX_ITERATIONS: u32 = 100;
const PSA_SOLVER_TOLERANCE: Decimal = dec!(0.000001);

/// Historical PSA speed (percent) that reproduces the observed factor move.
///
/// PSA recovery needs iteration because the model's CPR varies month by
/// month. `beginning_month` is the loan-age month of the first observation
/// period (it can differ from pool age when the loans predate the pool).
/// Solved by bisection on [0, 2000].
pub fn historical_psa(
    coupon: Decimal,
    original_term: u32,
    act_beg_factor: Decimal,
    beginning_age: Age,
    act_end_factor: Decimal,
    ending_age: Age,
    beginning_month: MonthIndex,
) -> CashflowResult<Decimal> {
    if ending_age <= beginning_age {
        return Err(CashflowError::InvalidInput {
            field: "ending_age".into(),
            reason: format!(
                "Ending age ({}) must be after beginning age ({})",
                ending_age.0, beginning_age.0
            ),
        });
    }
    let months = ending_age.0 - beginning_age.0;

    let objective = |psa_speed: Decimal| -> CashflowResult<Decimal> {
        let smm_path: Vec<Rate> = (0..months)
            .map(|k| psa_to_smm(psa_speed, MonthIndex(beginning_month.0 + k)))
            .collect();
        let projected = project_end_factor(
            act_beg_factor,
            &smm_path,
            coupon,
            original_term,
            beginning_age,
        )?;
        Ok(projected - act_end_factor)
    };

    // Projected factor falls monotonically as the speed rises, so the
    // objective brackets a single root when it changes sign over [0, 2000].
    let mut lo = Decimal::ZERO;
    let mut hi = dec!(2000);
    let f_lo = objective(lo)?;
    let f_hi = objective(hi)?;
    if f_lo < Decimal::ZERO || f_hi > Decimal::ZERO {
        return Err(CashflowError::InvalidInput {
            field: "act_end_factor".into(),
            reason: format!(
                "No PSA speed in [0, 2000] reproduces the observed factor move \
                 {act_beg_factor} -> {act_end_factor}"
            ),
        });
    }

    for _ in 0..PSA_SOLVER_MAX_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = objective(mid)?;
        if f_mid.abs() < dec!(0.000000001) || (hi - lo) < PSA_SOLVER_TOLERANCE {
            return Ok(mid);
        }
        if f_mid > Decimal::ZERO {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Err(CashflowError::ConvergenceFailure {
        function: "historical_psa".into(),
        iterations: PSA_SOLVER_MAX_ITERATIONS,
        last_delta: hi - lo,
    })
}
