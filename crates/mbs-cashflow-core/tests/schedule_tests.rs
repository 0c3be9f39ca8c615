use mbs_cashflow_core::schedule::{
    balance_factor, balance_factor_at_age, payment_factor, schedule_vector,
};
use mbs_cashflow_core::types::{Age, MonthIndex};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

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

// ===========================================================================
// Closed-form balance factor
// ===========================================================================

// Published worked example: gross 9.5%, pool issued with 359 months
// remaining, observed one month apart at remaining terms 344 and 343.
#[test]
fn test_worked_example_balances() {
    assert_close(
        balance_factor(dec!(9.5), 359, 344).unwrap(),
        dec!(0.99213300),
        dec!(0.0000001),
        "BAL at 344 months remaining",
    );
    assert_close(
        balance_factor(dec!(9.5), 359, 343).unwrap(),
        dec!(0.99157471),
        dec!(0.0000001),
        "BAL at 343 months remaining",
    );
}

#[test]
fn test_balance_factor_endpoints() {
    // Par at origination, zero at maturity, for a spread of coupons/terms.
    for (coupon, term) in [
        (dec!(6.0), 360u32),
        (dec!(9.5), 359),
        (dec!(12.0), 180),
        (dec!(3.25), 480),
    ] {
        assert_eq!(
            balance_factor(coupon, term, term).unwrap(),
            Decimal::ONE,
            "origination balance, {coupon}% {term}mo"
        );
        assert_eq!(
            balance_factor(coupon, term, 0).unwrap(),
            Decimal::ZERO,
            "maturity balance, {coupon}% {term}mo"
        );
    }
}

#[test]
fn test_low_coupon_stays_stable() {
    // Near-zero coupons degrade to straight-line rather than cancelling.
    let bal = balance_factor(dec!(0.00000001), 360, 180).unwrap();
    assert_eq!(bal, dec!(0.5));
    // A small-but-real coupon still sits close to straight line.
    let bal = balance_factor(dec!(0.01), 360, 180).unwrap();
    assert_close(bal, dec!(0.5), dec!(0.01), "0.01% coupon near straight line");
}

// ===========================================================================
// Full schedule vector
// ===========================================================================

#[test]
fn test_vector_starts_at_par_and_amortizes_to_zero() {
    for (coupon, term) in [(dec!(8.0), 360u32), (dec!(9.5), 359), (dec!(5.5), 120)] {
        let vec = schedule_vector(coupon, term).unwrap();
        assert_eq!(vec.at(Age(0)).unwrap(), Decimal::ONE);
        assert_eq!(vec.at(Age(term)).unwrap(), Decimal::ZERO);
        let factors = vec.as_slice();
        for k in 1..factors.len() {
            assert!(
                factors[k] < factors[k - 1],
                "{coupon}% {term}mo: not strictly decreasing at age {k}"
            );
        }
    }
}

#[test]
fn test_vector_agrees_with_closed_form_to_ten_digits() {
    let vec = schedule_vector(dec!(9.5), 360).unwrap();
    for age in (0..=359).step_by(7) {
        let closed = balance_factor_at_age(dec!(9.5), 360, Age(age)).unwrap();
        assert_close(
            vec.at(Age(age)).unwrap(),
            closed,
            dec!(0.0000000001),
            &format!("iterated vs closed form at age {age}"),
        );
    }
}

#[test]
fn test_survival_ratios_multiply_back_to_balance() {
    let vec = schedule_vector(dec!(8.0), 240).unwrap();
    let mut product = Decimal::ONE;
    for month in 1..=240u32 {
        product *= vec.survival_ratio(MonthIndex(month)).unwrap();
        assert_close(
            product,
            vec.at(Age(month)).unwrap(),
            dec!(0.0000000001),
            &format!("cumulative survival through month {month}"),
        );
    }
}

// ===========================================================================
// Payment primitives
// ===========================================================================

#[test]
fn test_payment_factor_published_value() {
    // 9.5%, 360 months: $8.40854 per $1000, i.e. 0.00840854 of par.
    assert_close(
        payment_factor(dec!(9.5), 360).unwrap(),
        dec!(0.00840854),
        dec!(0.0000001),
        "first-period gross payment factor",
    );
}

#[test]
fn test_payment_factor_one_month_left() {
    // With one month remaining the payment is balance plus interest.
    let af = payment_factor(dec!(12.0), 1).unwrap();
    assert_close(af, dec!(1.01), dec!(0.0000000001), "AF(1) = 1 + r");
}

#[test]
fn test_invalid_inputs_rejected_up_front() {
    assert!(balance_factor(dec!(8.0), 0, 0).is_err());
    assert!(balance_factor(dec!(8.0), 360, 361).is_err());
    assert!(balance_factor(dec!(-8.0), 360, 120).is_err());
    assert!(balance_factor_at_age(dec!(8.0), 360, Age(361)).is_err());
    assert!(payment_factor(dec!(-1.0), 12).is_err());
}
