//! Decimal math helpers (no f64, no powd).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Compute base^n for a positive integer exponent via iterative multiplication.
pub(crate) fn iterative_pow(base: Decimal, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result *= base;
    }
    result
}

/// Compute 1 / base^n for a positive integer exponent via iterative multiplication.
/// Returns zero if base^n overflows or is zero.
pub(crate) fn iterative_pow_recip(base: Decimal, n: u32) -> Decimal {
    let pow = iterative_pow(base, n);
    if pow.is_zero() {
        Decimal::ZERO
    } else {
        Decimal::ONE / pow
    }
}

/// Compute the nth root of x using Newton's method.
/// x^(1/n) where n is a positive integer.
///
/// Newton iteration: g_{k+1} = g_k - (g_k^n - x) / (n * g_k^{n-1})
pub(crate) fn nth_root(x: Decimal, n: u32) -> Decimal {
    if x == Decimal::ONE {
        return Decimal::ONE;
    }
    if x == Decimal::ZERO {
        return Decimal::ZERO;
    }
    if n == 0 {
        return Decimal::ONE;
    }
    if n == 1 {
        return x;
    }

    let n_dec = Decimal::from(n);
    let n_minus_1 = n - 1;

    // Initial guess: start near 1 since our inputs are always close to 1
    // (they are of the form (1 - small_rate)).
    let mut guess = Decimal::ONE;

    for _ in 0..40 {
        let g_n_minus_1 = iterative_pow(guess, n_minus_1);
        let g_n = g_n_minus_1 * guess;

        if g_n_minus_1.is_zero() {
            break;
        }

        let delta = (g_n - x) / (n_dec * g_n_minus_1);
        guess -= delta;

        if delta.abs() < dec!(0.0000000000001) {
            break;
        }
    }

    guess
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterative_pow_small_exponents() {
        assert_eq!(iterative_pow(dec!(2), 0), Decimal::ONE);
        assert_eq!(iterative_pow(dec!(2), 10), dec!(1024));
        assert_eq!(iterative_pow(dec!(1.01), 2), dec!(1.0201));
    }

    #[test]
    fn test_iterative_pow_recip() {
        assert_eq!(iterative_pow_recip(dec!(2), 2), dec!(0.25));
        assert_eq!(iterative_pow_recip(Decimal::ZERO, 3), Decimal::ZERO);
    }

    #[test]
    fn test_nth_root_inverts_pow() {
        let base = dec!(0.994);
        let pow12 = iterative_pow(base, 12);
        let root = nth_root(pow12, 12);
        assert!((root - base).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_nth_root_edge_cases() {
        assert_eq!(nth_root(Decimal::ONE, 12), Decimal::ONE);
        assert_eq!(nth_root(Decimal::ZERO, 12), Decimal::ZERO);
        assert_eq!(nth_root(dec!(0.5), 1), dec!(0.5));
    }
}
