//! Actual cash flow recursion with prepayments and defaults.
//!
//! Walks a pool forward one month at a time, carrying a performing balance, a
//! foreclosure balance, and the history of new-default amounts. Recoveries
//! and losses on a defaulted cohort surface `recovery_lag_months` after the
//! default; the lagged lookup runs against a flat history array keyed by
//! absolute period number.
//!
//! Variable naming follows the standard cash flow terminology:
//! PERF BAL (performing balance), NEW DEF (new defaults), FCL (foreclosure
//! pipeline), SCH AM (scheduled balance), EXP/ACT AM (expected/actual
//! amortization), AM DEF (amortization from defaults when P&I is advanced),
//! ADB (amortized default balance reaching liquidation), VOL PREPAY,
//! EXP/LOST/ACT INT, PRIN RECOV, PRIN LOSS.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cashflows::scheduled::{compute_scheduled, ScheduledCashflow};
use crate::curves::{
    generate_default_curve, generate_prepayment_curve, DefaultAssumption, PrepaymentAssumption,
    RateVector,
};
use crate::error::CashflowError;
use crate::types::{with_metadata, ComputationOutput, LoanTerms, Money, Rate};
use crate::CashflowResult;

/// Balances closer to zero than this are treated as accumulated rounding and
/// clamped silently; anything beyond it is flagged as numeric drift.
const DRIFT_TOLERANCE: Decimal = dec!(0.00000001);

/// Loss severity applied at liquidation: a single flat rate, or a curve keyed
/// by the month the cohort defaulted in (1-indexed projection period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SeveritySpec {
    Flat(Rate),
    Curve(Vec<Rate>),
}

impl SeveritySpec {
    /// Severity for a cohort that defaulted in projection period `period`.
    /// A curve shorter than the projection extends with its last value.
    fn at_period(&self, period: u32) -> Rate {
        match self {
            SeveritySpec::Flat(rate) => *rate,
            SeveritySpec::Curve(rates) => rates
                .get(period as usize - 1)
                .or_else(|| rates.last())
                .copied()
                .unwrap_or(Decimal::ZERO),
        }
    }

    fn validate(&self) -> CashflowResult<()> {
        let rates: &[Rate] = match self {
            SeveritySpec::Flat(rate) => std::slice::from_ref(rate),
            SeveritySpec::Curve(rates) => {
                if rates.is_empty() {
                    return Err(CashflowError::InvalidInput {
                        field: "severity".into(),
                        reason: "Severity curve cannot be empty".into(),
                    });
                }
                rates
            }
        };
        for rate in rates {
            if *rate < Decimal::ZERO || *rate > Decimal::ONE {
                return Err(CashflowError::InvalidInput {
                    field: "severity".into(),
                    reason: "Severity must be between 0 and 1".into(),
                });
            }
        }
        Ok(())
    }
}

/// Scenario assumptions for one cash flow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowAssumptions {
    pub prepayment: PrepaymentAssumption,
    pub default: DefaultAssumption,
    pub severity: SeveritySpec,
    /// Months from first missed payment to liquidation.
    pub recovery_lag_months: u32,
    /// Whether the servicer advances uncollected P&I to investors pending
    /// liquidation.
    pub servicer_advance: bool,
}

/// Top-level cash flow projection input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowInput {
    pub loan: LoanTerms,
    pub assumptions: CashflowAssumptions,
}

/// One month of the projection. All balances are end-of-period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowPeriod {
    pub period: u32,
    pub scheduled_balance: Money,
    pub new_defaults: Money,
    pub voluntary_prepayments: Money,
    pub expected_amortization: Money,
    pub actual_amortization: Money,
    pub amortization_from_defaults: Money,
    pub expected_interest: Money,
    pub lost_interest: Money,
    pub actual_interest: Money,
    pub amortized_default_balance: Money,
    pub principal_recovery: Money,
    pub principal_loss: Money,
    pub foreclosure_balance: Money,
    pub performing_balance: Money,
    pub smm: Rate,
    pub mdr: Rate,
    pub cumulative_defaults: Money,
    pub cumulative_losses: Money,
}

/// Run-level accumulators as of the final period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub total_defaults: Money,
    pub total_losses: Money,
    pub total_recoveries: Money,
    pub total_prepayments: Money,
    pub total_actual_amortization: Money,
    pub total_actual_interest: Money,
    pub ending_performing_balance: Money,
    pub ending_foreclosure_balance: Money,
    /// Total losses over the starting balance.
    pub cumulative_loss_rate: Rate,
}

/// Complete projection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowProjection {
    pub periods: Vec<CashflowPeriod>,
    pub summary: CashflowSummary,
}

/// Project actual cash flows for a loan under the given assumptions.
///
/// Builds the scheduled amortization path and the monthly SMM/MDR curves,
/// then runs the recursion. Each invocation evaluates one deterministic
/// scenario; independent runs share no state.
pub fn run_cashflow(input: &CashflowInput) -> CashflowResult<ComputationOutput<CashflowProjection>> {
    let start = Instant::now();
    let loan = &input.loan;
    let assumptions = &input.assumptions;

    loan.validate()?;
    validate_assumptions(loan, assumptions.recovery_lag_months, &assumptions.severity)?;

    let (scheduled, mut warnings) = compute_scheduled(loan)?;
    let start_month = loan.age().next_month();
    let smm_curve = generate_prepayment_curve(
        &assumptions.prepayment,
        loan.remaining_term_months,
        start_month,
    )?;
    let mdr_curve = generate_default_curve(
        &assumptions.default,
        loan.remaining_term_months,
        start_month,
        assumptions.recovery_lag_months,
    )?;

    let (projection, run_warnings) = project(
        loan,
        &scheduled,
        &smm_curve,
        &mdr_curve,
        &assumptions.severity,
        assumptions.recovery_lag_months,
        assumptions.servicer_advance,
    )?;
    warnings.extend(run_warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pool Cash Flow Projection — performing/foreclosure recursion with lagged recovery",
        input,
        warnings,
        elapsed,
        projection,
    ))
}

/// Project actual cash flows against pre-built schedule and rate curves.
///
/// The engine trusts its inputs: in particular the default curve must already
/// carry zeros for the final `recovery_lag_months` (the generator enforces
/// this; a hand-built curve that does not is the caller's modeling choice).
pub fn run_cashflow_with_curves(
    loan: &LoanTerms,
    scheduled: &ScheduledCashflow,
    smm_curve: &RateVector,
    mdr_curve: &RateVector,
    severity: &SeveritySpec,
    recovery_lag_months: u32,
    servicer_advance: bool,
) -> CashflowResult<ComputationOutput<CashflowProjection>> {
    let start = Instant::now();

    loan.validate()?;
    validate_assumptions(loan, recovery_lag_months, severity)?;

    let (projection, warnings) = project(
        loan,
        scheduled,
        smm_curve,
        mdr_curve,
        severity,
        recovery_lag_months,
        servicer_advance,
    )?;

    #[derive(Serialize)]
    struct CurveRunEcho<'a> {
        loan: &'a LoanTerms,
        recovery_lag_months: u32,
        servicer_advance: bool,
        severity: &'a SeveritySpec,
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pool Cash Flow Projection — performing/foreclosure recursion, caller-supplied curves",
        &CurveRunEcho {
            loan,
            recovery_lag_months,
            servicer_advance,
            severity,
        },
        warnings,
        elapsed,
        projection,
    ))
}

fn validate_assumptions(
    loan: &LoanTerms,
    recovery_lag_months: u32,
    severity: &SeveritySpec,
) -> CashflowResult<()> {
    if recovery_lag_months >= loan.remaining_term_months {
        return Err(CashflowError::InvalidInput {
            field: "recovery_lag_months".into(),
            reason: format!(
                "Recovery lag ({recovery_lag_months}) must be shorter than the remaining term ({})",
                loan.remaining_term_months
            ),
        });
    }
    severity.validate()
}

fn project(
    loan: &LoanTerms,
    scheduled: &ScheduledCashflow,
    smm_curve: &RateVector,
    mdr_curve: &RateVector,
    severity: &SeveritySpec,
    recovery_lag_months: u32,
    servicer_advance: bool,
) -> CashflowResult<(CashflowProjection, Vec<String>)> {
    let n = loan.remaining_term_months as usize;
    let sch = scheduled.balance_path();
    if sch.len() != n + 1 {
        return Err(CashflowError::InvalidInput {
            field: "scheduled".into(),
            reason: format!(
                "Scheduled path covers {} periods but the loan has {n} months remaining",
                sch.len().saturating_sub(1)
            ),
        });
    }
    for (name, curve) in [("smm_curve", smm_curve), ("mdr_curve", mdr_curve)] {
        if curve.len() < n {
            return Err(CashflowError::InvalidInput {
                field: name.into(),
                reason: format!(
                    "Curve covers {} months but the loan has {n} months remaining",
                    curve.len()
                ),
            });
        }
    }

    let net_rate = loan.net_monthly_rate();
    let lag = recovery_lag_months as usize;

    // New-default history keyed by absolute period number; the ADB lookup for
    // period i reads entry i - lag.
    let mut new_def_hist: Vec<Money> = vec![Decimal::ZERO; n + 1];

    let mut perf_prev = sch[0];
    let mut fcl_prev = Decimal::ZERO;

    let mut warnings: Vec<String> = Vec::new();
    let mut periods: Vec<CashflowPeriod> = Vec::with_capacity(n);

    let mut cumulative_defaults = Decimal::ZERO;
    let mut cumulative_losses = Decimal::ZERO;
    let mut total_recoveries = Decimal::ZERO;
    let mut total_prepayments = Decimal::ZERO;
    let mut total_actual_amortization = Decimal::ZERO;
    let mut total_actual_interest = Decimal::ZERO;

    for i in 1..=n {
        let survival_ratio = if sch[i - 1] > Decimal::ZERO {
            sch[i] / sch[i - 1]
        } else {
            Decimal::ZERO
        };
        let one_minus_af = Decimal::ONE - survival_ratio;

        let mdr = mdr_curve.rate_for_period(i as u32).unwrap_or(Decimal::ZERO);
        let smm = smm_curve.rate_for_period(i as u32).unwrap_or(Decimal::ZERO);

        let new_defaults = perf_prev * mdr;
        let mut voluntary_prepayments = perf_prev * survival_ratio * smm;
        let mut actual_amortization = (perf_prev - new_defaults) * one_minus_af;

        // The pool cannot shed more than it holds: trim prepayments first,
        // then amortization, so defaults are honored in full.
        let total_unscheduled = new_defaults + voluntary_prepayments + actual_amortization;
        if total_unscheduled > perf_prev && perf_prev > Decimal::ZERO {
            let mut excess = total_unscheduled - perf_prev;
            let prepay_reduction = voluntary_prepayments.min(excess);
            voluntary_prepayments -= prepay_reduction;
            excess -= prepay_reduction;
            if excess > Decimal::ZERO {
                actual_amortization = (actual_amortization - excess).max(Decimal::ZERO);
            }
        }

        new_def_hist[i] = new_defaults;

        let mut performing_balance =
            perf_prev - new_defaults - voluntary_prepayments - actual_amortization;
        if performing_balance < Decimal::ZERO {
            if performing_balance < -DRIFT_TOLERANCE {
                warnings.push(format!(
                    "Period {i}: performing balance drifted negative ({performing_balance}) — clamped to zero"
                ));
            }
            performing_balance = Decimal::ZERO;
        }

        // The cohort that defaulted `lag` months ago reaches liquidation this
        // period. With P&I advanced, its balance amortized on schedule while
        // in the pipeline.
        let liquidating_period = if i >= lag && i - lag >= 1 {
            Some(i - lag)
        } else {
            None
        };
        let amortized_default_balance = match liquidating_period {
            Some(dp) if servicer_advance => {
                if sch[dp - 1] > Decimal::ZERO {
                    new_def_hist[dp] * (sch[i - 1] / sch[dp - 1])
                } else {
                    new_def_hist[dp]
                }
            }
            Some(dp) => new_def_hist[dp],
            None => Decimal::ZERO,
        };

        // A liquidating cohort does not also amortize this period; it leaves
        // the foreclosure pipeline before AM DEF and EXP AM are taken.
        let amortization_from_defaults = if servicer_advance {
            (new_defaults + fcl_prev - amortized_default_balance) * one_minus_af
        } else {
            Decimal::ZERO
        };

        let mut foreclosure_balance =
            new_defaults + fcl_prev - amortized_default_balance - amortization_from_defaults;
        if foreclosure_balance < Decimal::ZERO {
            if foreclosure_balance < -DRIFT_TOLERANCE {
                warnings.push(format!(
                    "Period {i}: foreclosure balance drifted negative ({foreclosure_balance}) — clamped to zero"
                ));
            }
            foreclosure_balance = Decimal::ZERO;
        }

        let expected_amortization =
            (perf_prev + fcl_prev - amortized_default_balance) * one_minus_af;

        let (principal_loss, principal_recovery) = match liquidating_period {
            Some(dp) => {
                let loss = (new_def_hist[dp] * severity.at_period(dp as u32))
                    .min(amortized_default_balance);
                let recovery = (amortized_default_balance - loss).max(Decimal::ZERO);
                (loss, recovery)
            }
            None => (Decimal::ZERO, Decimal::ZERO),
        };

        let expected_interest = (perf_prev + fcl_prev) * net_rate;
        let lost_interest = (new_defaults + fcl_prev) * net_rate;
        let actual_interest = expected_interest - lost_interest;

        cumulative_defaults += new_defaults;
        cumulative_losses += principal_loss;
        total_recoveries += principal_recovery;
        total_prepayments += voluntary_prepayments;
        total_actual_amortization += actual_amortization;
        total_actual_interest += actual_interest;

        periods.push(CashflowPeriod {
            period: i as u32,
            scheduled_balance: sch[i],
            new_defaults,
            voluntary_prepayments,
            expected_amortization,
            actual_amortization,
            amortization_from_defaults,
            expected_interest,
            lost_interest,
            actual_interest,
            amortized_default_balance,
            principal_recovery,
            principal_loss,
            foreclosure_balance,
            performing_balance,
            smm,
            mdr,
            cumulative_defaults,
            cumulative_losses,
        });

        perf_prev = performing_balance;
        fcl_prev = foreclosure_balance;
    }

    let cumulative_loss_rate = if sch[0] > Decimal::ZERO {
        cumulative_losses / sch[0]
    } else {
        Decimal::ZERO
    };

    let summary = CashflowSummary {
        total_defaults: cumulative_defaults,
        total_losses: cumulative_losses,
        total_recoveries,
        total_prepayments,
        total_actual_amortization,
        total_actual_interest,
        ending_performing_balance: perf_prev,
        ending_foreclosure_balance: fcl_prev,
        cumulative_loss_rate,
    };

    Ok((CashflowProjection { periods, summary }, warnings))
}
