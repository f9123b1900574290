//! 18-decimal fixed point arithmetic on unsigned 256-bit integers (spec §4.1).
//!
//! All inputs are assumed to already be bounded, pre-scaled quantities (order
//! ratios, quoted amounts, ETH prices); per spec, overflow on those is a
//! programming error rather than a recoverable condition, so the checked
//! operations below `expect` rather than return `Result`, the same way
//! `Settlement::total_surplus` treats a missing clearing price as a bug
//! rather than input to handle.

use primitive_types::U256;

/// `10^18`, the fixed-point scale used throughout the solver.
pub fn one18() -> U256 {
    U256::exp10(18)
}

/// Rescales `value`, expressed with `decimals` decimal places, to 18
/// decimals.
pub fn scale_to_18(value: U256, decimals: u8) -> U256 {
    match decimals.cmp(&18) {
        std::cmp::Ordering::Greater => value / U256::exp10((decimals - 18) as usize),
        std::cmp::Ordering::Less => value
            .checked_mul(U256::exp10((18 - decimals) as usize))
            .expect("scale_to_18 overflow on pre-scaled input"),
        std::cmp::Ordering::Equal => value,
    }
}

/// Inverse of `scale_to_18`: rescales an 18-decimal `value` down to `target`
/// decimal places. Lossy when `target < 18`.
pub fn scale_from_18(value: U256, target: u8) -> U256 {
    match target.cmp(&18) {
        std::cmp::Ordering::Less => value / U256::exp10((18 - target) as usize),
        std::cmp::Ordering::Greater => value
            .checked_mul(U256::exp10((target - 18) as usize))
            .expect("scale_from_18 overflow on pre-scaled input"),
        std::cmp::Ordering::Equal => value,
    }
}

/// `amountOut / amountIn` expressed in 18-decimal fixed point, scaling both
/// sides to 18 decimals first. Returns `U256::MAX` when `amount_in` is zero,
/// per spec §4.1 rule 2.
pub fn calculate_price18(
    amount_in: U256,
    amount_out: U256,
    decimals_in: u8,
    decimals_out: u8,
) -> U256 {
    if amount_in.is_zero() {
        return U256::MAX;
    }
    let scaled_in = scale_to_18(amount_in, decimals_in);
    let scaled_out = scale_to_18(amount_out, decimals_out);
    scaled_out
        .checked_mul(one18())
        .expect("calculate_price18 overflow on pre-scaled input")
        / scaled_in
}

/// `a * b / ONE18`, the fixed-point multiplication used throughout the
/// profit estimator.
pub fn mul18(a: U256, b: U256) -> U256 {
    a.checked_mul(b)
        .expect("mul18 overflow on pre-scaled input")
        / one18()
}

/// `a * ONE18 / b`, the fixed-point division used throughout the profit
/// estimator. Returns `U256::MAX` when `b` is zero, matching the
/// `opposingMaxIORatio` zero-ratio rule in spec §4.2.
pub fn div18(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::MAX;
    }
    a.checked_mul(one18())
        .expect("div18 overflow on pre-scaled input")
        / b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_round_trip_when_target_has_fewer_decimals() {
        // spec §8 property 1: lossy branch, d <= 18.
        for d in 0..=18u8 {
            let v = U256::from(12345u64);
            let scaled = scale_to_18(v, d);
            let back = scale_from_18(scaled, d);
            assert_eq!(back, v, "round trip failed for decimals={d}");
        }
    }

    #[test]
    fn scale_round_trip_is_lossy_above_18_decimals() {
        // spec §8 property 1: d > 18, result equals v - (v mod 10^(d-18)).
        let d = 24u8;
        let v = U256::from(123_456_789u64);
        let scaled = scale_to_18(v, d);
        let back = scale_from_18(scaled, d);
        let modulus = U256::exp10((d - 18) as usize);
        assert_eq!(back, v - (v % modulus));
    }

    #[test]
    fn calculate_price18_zero_amount_in_is_u256_max() {
        assert_eq!(
            calculate_price18(U256::zero(), U256::from(100u64), 18, 18),
            U256::MAX
        );
    }

    #[test]
    fn calculate_price18_three_over_two_is_one_point_five() {
        let price = calculate_price18(U256::from(2u64) * one18(), U256::from(3u64) * one18(), 18, 18);
        assert_eq!(price, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn div18_zero_denominator_is_u256_max() {
        assert_eq!(div18(one18(), U256::zero()), U256::MAX);
    }

    #[test]
    fn mul18_identity() {
        let v = U256::from(42u64) * one18();
        assert_eq!(mul18(v, one18()), v);
    }
}
