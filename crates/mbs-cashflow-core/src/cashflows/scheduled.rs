//! Dollar-level scheduled cash flows: the amortization path a loan follows
//! with zero prepayment and zero default. The ending-balance path is the
//! SCH AM input of the actual cash flow recursion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::schedule::payment_factor;
use crate::types::{with_metadata, ComputationOutput, LoanTerms, Money, Rate};
use crate::CashflowResult;

/// One period of the scheduled projection. Period 0 is the initial state:
/// only `ending_balance` and `pool_factor` carry values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPeriod {
    pub period: u32,
    pub beginning_balance: Money,
    pub scheduled_payment: Money,
    pub interest_billed: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub ending_balance: Money,
    /// Ending balance as a fraction of original face.
    pub pool_factor: Rate,
}

/// Full scheduled projection, one row per period 0..=remaining_term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCashflow {
    pub periods: Vec<ScheduledPeriod>,
}

impl ScheduledCashflow {
    /// Number of projected months (excludes the period-0 row).
    pub fn remaining_term(&self) -> u32 {
        self.periods.len() as u32 - 1
    }

    /// Scheduled ending balance at a period index (0 = initial state).
    pub fn ending_balance(&self, period: usize) -> Option<Money> {
        self.periods.get(period).map(|p| p.ending_balance)
    }

    /// The SCH AM path: scheduled ending balance per period, index 0 first.
    pub fn balance_path(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.ending_balance).collect()
    }
}

/// Project the scheduled amortization of a loan in dollars.
pub fn run_scheduled_cashflow(
    loan: &LoanTerms,
) -> CashflowResult<ComputationOutput<ScheduledCashflow>> {
    let start = Instant::now();
    loan.validate()?;

    let (output, warnings) = compute_scheduled(loan)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scheduled Amortization — level-payment annuity, zero prepayment/default",
        loan,
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn compute_scheduled(
    loan: &LoanTerms,
) -> CashflowResult<(ScheduledCashflow, Vec<String>)> {
    let n = loan.remaining_term_months;
    let monthly_rate = loan.gross_monthly_rate();
    let warnings: Vec<String> = Vec::new();

    let mut periods = Vec::with_capacity(n as usize + 1);

    let initial_factor = if loan.original_balance > Decimal::ZERO {
        loan.current_balance / loan.original_balance
    } else {
        Decimal::ZERO
    };
    periods.push(ScheduledPeriod {
        period: 0,
        beginning_balance: Decimal::ZERO,
        scheduled_payment: Decimal::ZERO,
        interest_billed: Decimal::ZERO,
        interest_paid: Decimal::ZERO,
        principal_paid: Decimal::ZERO,
        ending_balance: loan.current_balance,
        pool_factor: initial_factor,
    });

    let mut balance = loan.current_balance;
    for i in 1..=n {
        let beginning_balance = balance;
        let remaining_at_start = n - i + 1;
        let interest_billed = beginning_balance * monthly_rate;

        let (scheduled_payment, principal_paid) = if i == n {
            // Final period pays the balance off exactly; the annuity factor at
            // one remaining month is 1 + r and the limit is taken explicitly.
            (beginning_balance + interest_billed, beginning_balance)
        } else {
            let af = payment_factor(loan.gross_coupon, remaining_at_start)?;
            let mut payment = beginning_balance * af;
            if payment > beginning_balance + interest_billed {
                payment = beginning_balance + interest_billed;
            }
            let mut principal = payment - interest_billed;
            if principal > beginning_balance {
                principal = beginning_balance;
            }
            if principal < Decimal::ZERO {
                principal = Decimal::ZERO;
            }
            (payment, principal)
        };

        let interest_paid = interest_billed.min(scheduled_payment);
        let ending_balance = beginning_balance - principal_paid;
        let pool_factor = if loan.original_balance > Decimal::ZERO {
            ending_balance / loan.original_balance
        } else {
            Decimal::ZERO
        };

        periods.push(ScheduledPeriod {
            period: i,
            beginning_balance,
            scheduled_payment,
            interest_billed,
            interest_paid,
            principal_paid,
            ending_balance,
            pool_factor,
        });

        balance = ending_balance;
    }

    Ok((ScheduledCashflow { periods }, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_loan() -> LoanTerms {
        LoanTerms {
            gross_coupon: dec!(8.0),
            net_coupon: dec!(7.5),
            original_term_months: 360,
            remaining_term_months: 360,
            original_balance: dec!(100_000_000),
            current_balance: dec!(100_000_000),
            origination_date: None,
            asof_date: None,
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    #[test]
    fn test_schedule_pays_off_exactly() {
        let out = run_scheduled_cashflow(&new_loan()).unwrap();
        let cf = &out.result;
        assert_eq!(cf.remaining_term(), 360);
        assert_eq!(cf.ending_balance(0).unwrap(), dec!(100_000_000));
        assert_eq!(cf.ending_balance(360).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_level_payment_is_constant() {
        let out = run_scheduled_cashflow(&new_loan()).unwrap();
        let cf = &out.result;
        let first = cf.periods[1].scheduled_payment;
        // Level payment holds through the whole life of a fixed-rate loan.
        for p in &cf.periods[1..] {
            assert_close(
                p.scheduled_payment,
                first,
                dec!(0.0001),
                &format!("payment at period {}", p.period),
            );
        }
    }

    #[test]
    fn test_principal_plus_interest_equals_payment() {
        let out = run_scheduled_cashflow(&new_loan()).unwrap();
        for p in &out.result.periods[1..] {
            assert_eq!(p.scheduled_payment, p.interest_paid + p.principal_paid);
        }
    }

    #[test]
    fn test_balance_non_increasing() {
        let out = run_scheduled_cashflow(&new_loan()).unwrap();
        let path = out.result.balance_path();
        for k in 1..path.len() {
            assert!(path[k] <= path[k - 1], "balance rose at period {k}");
        }
    }

    #[test]
    fn test_aged_loan_starts_from_current_balance() {
        let mut loan = new_loan();
        loan.remaining_term_months = 344;
        loan.current_balance = dec!(85_000_000);
        let out = run_scheduled_cashflow(&loan).unwrap();
        let cf = &out.result;
        assert_eq!(cf.ending_balance(0).unwrap(), dec!(85_000_000));
        assert_eq!(cf.periods[0].pool_factor, dec!(0.85));
        assert_eq!(cf.remaining_term(), 344);
        assert_eq!(cf.ending_balance(344).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_coupon_straight_line() {
        let mut loan = new_loan();
        loan.gross_coupon = Decimal::ZERO;
        loan.net_coupon = Decimal::ZERO;
        loan.original_term_months = 100;
        loan.remaining_term_months = 100;
        loan.original_balance = dec!(1000);
        loan.current_balance = dec!(1000);
        let out = run_scheduled_cashflow(&loan).unwrap();
        let cf = &out.result;
        assert_close(
            cf.periods[1].principal_paid,
            dec!(10),
            dec!(0.0000001),
            "straight-line principal",
        );
        assert_eq!(cf.periods[1].interest_billed, Decimal::ZERO);
        assert_eq!(cf.ending_balance(100).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_validation_runs_before_projection() {
        let mut loan = new_loan();
        loan.remaining_term_months = 500;
        assert!(run_scheduled_cashflow(&loan).is_err());
    }
}
