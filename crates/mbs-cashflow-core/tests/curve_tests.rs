use mbs_cashflow_core::curves::{
    abs_to_smm, cpr_to_psa, cpr_to_smm, generate_default_curve, generate_prepayment_curve,
    psa_to_cpr, psa_to_smm, sda_to_cdr, smm_to_cpr, DefaultAssumption, PrepaymentAssumption,
};
use mbs_cashflow_core::error::CashflowError;
use mbs_cashflow_core::types::MonthIndex;
use proptest::prelude::*;
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
// Standard curve pinned values
// ===========================================================================

#[test]
fn test_psa_pinned_points() {
    // 100% PSA: 0.2% CPR per month on the ramp, 6% plateau after month 30.
    assert_eq!(psa_to_cpr(dec!(100), MonthIndex(17)), dec!(0.034));
    assert_eq!(psa_to_cpr(dec!(100), MonthIndex(40)), dec!(0.06));
    // SMM at the plateau is about 0.5143%.
    assert_close(
        psa_to_smm(dec!(100), MonthIndex(30)),
        dec!(0.0051430),
        dec!(0.0000001),
        "100% PSA plateau SMM",
    );
    // SMM at month 15 is about 0.2535%.
    assert_close(
        psa_to_smm(dec!(100), MonthIndex(15)),
        dec!(0.0025350),
        dec!(0.0000001),
        "100% PSA month-15 SMM",
    );
}

#[test]
fn test_sda_pinned_points() {
    assert_eq!(sda_to_cdr(dec!(100), MonthIndex(30)), dec!(0.006));
    assert_eq!(sda_to_cdr(dec!(100), MonthIndex(60)), dec!(0.006));
    assert_eq!(sda_to_cdr(dec!(100), MonthIndex(120)), dec!(0.0003));
    assert_eq!(sda_to_cdr(dec!(100), MonthIndex(121)), dec!(0.0003));
    // 61st month steps down by one decline increment (0.0095% CDR).
    assert_close(
        sda_to_cdr(dec!(100), MonthIndex(61)),
        dec!(0.005905),
        dec!(0.0000000001),
        "first month of SDA decline",
    );
}

// ===========================================================================
// Generated curves
// ===========================================================================

#[test]
fn test_default_curve_tail_zero_at_any_speed() {
    for speed in [dec!(50), dec!(100), dec!(250), dec!(1000)] {
        let curve = generate_default_curve(
            &DefaultAssumption::Sda(speed),
            360,
            MonthIndex(1),
            12,
        )
        .unwrap();
        for period in 349..=360u32 {
            assert_eq!(
                curve.rate_for_period(period).unwrap(),
                Decimal::ZERO,
                "{speed}% SDA, period {period} should be zero inside the liquidation window"
            );
        }
        assert!(curve.rate_for_period(348).unwrap() > Decimal::ZERO);
    }
}

#[test]
fn test_abs_exhaustion_is_a_generation_error() {
    let err = generate_prepayment_curve(&PrepaymentAssumption::Abs(dec!(4)), 30, MonthIndex(1))
        .unwrap_err();
    // 4% ABS exhausts the pool at month 26.
    match err {
        CashflowError::CurveExhaustion { month, required, .. } => {
            assert_eq!(month, 26);
            assert_eq!(required, 30);
        }
        other => panic!("expected CurveExhaustion, got {other:?}"),
    }
    // The same speed over a shorter window is fine.
    assert!(
        generate_prepayment_curve(&PrepaymentAssumption::Abs(dec!(4)), 25, MonthIndex(1)).is_ok()
    );
}

#[test]
fn test_seasoned_curve_picks_up_mid_ramp() {
    // Observed at age 15: first projection month is 16, mid-ramp.
    let curve =
        generate_prepayment_curve(&PrepaymentAssumption::Psa(dec!(150)), 344, MonthIndex(16))
            .unwrap();
    assert_eq!(
        curve.rate_for_period(1).unwrap(),
        psa_to_smm(dec!(150), MonthIndex(16))
    );
    // Periods 15 onward sit on the plateau (months 30+).
    assert_eq!(
        curve.rate_for_period(15).unwrap(),
        curve.rate_for_period(200).unwrap()
    );
}

// ===========================================================================
// Round-trip properties
// ===========================================================================

proptest! {
    #[test]
    fn prop_smm_cpr_round_trip(raw in 0u32..500_000u32) {
        // SMM in [0, 0.5) at 6 decimal places.
        let smm = Decimal::new(raw as i64, 6);
        let back = cpr_to_smm(smm_to_cpr(smm));
        prop_assert!(
            (back - smm).abs() < dec!(0.000000001),
            "SMM {} -> CPR -> {}",
            smm,
            back
        );
    }

    #[test]
    fn prop_cpr_smm_round_trip(raw in 0u32..950_000u32) {
        // CPR in [0, 0.95) at 6 decimal places.
        let cpr = Decimal::new(raw as i64, 6);
        let back = smm_to_cpr(cpr_to_smm(cpr));
        prop_assert!(
            (back - cpr).abs() < dec!(0.000000001),
            "CPR {} -> SMM -> {}",
            cpr,
            back
        );
    }

    #[test]
    fn prop_psa_cpr_round_trip(speed_raw in 1u32..20_000u32, month in 1u32..360u32) {
        // Speed in (0, 2000] percent at one decimal place.
        let speed = Decimal::new(speed_raw as i64, 1);
        let m = MonthIndex(month);
        let cpr = psa_to_cpr(speed, m);
        // Inside the 100%-CPR cap the mapping is invertible.
        prop_assume!(cpr < Decimal::ONE);
        let back = cpr_to_psa(cpr, m);
        prop_assert!(
            (back - speed).abs() < dec!(0.000000001),
            "{}% PSA at month {} -> CPR {} -> {}%",
            speed,
            month,
            cpr,
            back
        );
    }

    #[test]
    fn prop_abs_curve_monotone(speed_raw in 1u32..150u32, month in 1u32..50u32) {
        // ABS speeds up to 1.5%: rates rise month over month.
        let speed = Decimal::new(speed_raw as i64, 2);
        let here = abs_to_smm(speed, MonthIndex(month));
        let next = abs_to_smm(speed, MonthIndex(month + 1));
        prop_assert!(next >= here);
    }
}
