//! ProfitEstimator (spec §4.2): the inter- and intra-orderbook profit
//! formulas. Profit is signed — either leg of a trade can be a loss before
//! the other leg's gain covers it — so intermediate products are computed
//! on `U256` per the fixed-point contract and the final subtraction moves
//! through `shared::conversions::U256Ext` into `BigInt`, mirroring how the
//! teacher's `Settlement` surplus math uses `BigRational` rather than risk
//! an unsigned underflow.

use num::BigInt;
use primitive_types::U256;
use shared::conversions::U256Ext as _;
use shared::fixed_point::{mul18, one18};

/// The counterparty side of an inter-orderbook match.
#[derive(Clone, Copy, Debug)]
pub struct CounterpartyQuote {
    pub ratio: U256,
    pub max_output: U256,
}

/// `total = outputProfit + inputProfit`, signed (spec §4.2).
pub fn inter_orderbook_profit(
    order_ratio: U256,
    max_input_fixed: U256,
    counterparty: CounterpartyQuote,
    input_eth_price18: U256,
    output_eth_price18: U256,
) -> BigInt {
    let order_output = max_input_fixed;
    let order_input = mul18(max_input_fixed, order_ratio);

    let (opposing_max_input, opposing_max_io_ratio) = if order_ratio.is_zero() {
        (U256::MAX, U256::MAX)
    } else {
        let one18_squared = one18()
            .checked_mul(one18())
            .expect("squares ONE18, never overflows");
        (
            mul18(max_input_fixed, order_ratio),
            one18_squared / order_ratio,
        )
    };

    let (counterparty_output, counterparty_input) = if opposing_max_io_ratio >= counterparty.ratio
    {
        let take_amount = opposing_max_input.min(counterparty.max_output);
        (take_amount, mul18(take_amount, counterparty.ratio))
    } else {
        (U256::zero(), U256::zero())
    };

    let output_profit = (order_output.to_big_int() - counterparty_input.to_big_int())
        * output_eth_price18.to_big_int()
        / one18().to_big_int();
    let input_profit = (counterparty_output.to_big_int() - order_input.to_big_int())
        * input_eth_price18.to_big_int()
        / one18().to_big_int();

    output_profit + input_profit
}

/// One side of an intra-orderbook match.
#[derive(Clone, Copy, Debug)]
pub struct OrderLeg {
    pub max_output: U256,
    pub ratio: U256,
}

/// Both sides realize `min(ownMaxOutput, other.maxOutput * other.ratio /
/// ONE18)`, or the full own `maxOutput` when the counterparty's ratio is
/// zero; profit sums the two clamped-nonnegative differences (spec §4.2).
pub fn intra_orderbook_profit(
    a: OrderLeg,
    b: OrderLeg,
    a_output_eth_price18: U256,
    b_output_eth_price18: U256,
) -> BigInt {
    let realized_a = if b.ratio.is_zero() {
        a.max_output
    } else {
        a.max_output.min(mul18(b.max_output, b.ratio))
    };
    let realized_b = if a.ratio.is_zero() {
        b.max_output
    } else {
        b.max_output.min(mul18(a.max_output, a.ratio))
    };

    // What crossing A's realized output against B's ratio costs in B's
    // token, and vice versa; the spread between realized output and that
    // cost, clamped at zero, is the profit on each side.
    let owed_to_b = mul18(realized_b, b.ratio);
    let owed_to_a = mul18(realized_a, a.ratio);

    let gain_a = (realized_a.to_big_int() - owed_to_b.to_big_int()).max(BigInt::from(0));
    let gain_b = (realized_b.to_big_int() - owed_to_a.to_big_int()).max(BigInt::from(0));

    gain_a * a_output_eth_price18.to_big_int() / one18().to_big_int()
        + gain_b * b_output_eth_price18.to_big_int() / one18().to_big_int()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: u64) -> U256 {
        U256::from(n) * one18()
    }

    fn half_fixed(whole: u64, tenths: u64) -> U256 {
        fixed(whole) + one18() / U256::from(10) * U256::from(tenths)
    }

    /// S1 — inter typical: counterparty leg not taken because
    /// opposingMaxIORatio < counterpartyRatio.
    #[test]
    fn s1_inter_typical() {
        let total = inter_orderbook_profit(
            half_fixed(2, 0),
            fixed(10),
            CounterpartyQuote {
                ratio: half_fixed(1, 5),
                max_output: fixed(5),
            },
            fixed(1),
            fixed(3),
        );
        assert_eq!(total, BigInt::from(10) * BigInt::from(10u64).pow(18));
    }

    /// S2 — inter, order ratio zero: full counterparty leg taken.
    #[test]
    fn s2_inter_zero_order_ratio() {
        let total = inter_orderbook_profit(
            U256::zero(),
            fixed(10),
            CounterpartyQuote {
                ratio: fixed(1),
                max_output: fixed(5),
            },
            fixed(1),
            fixed(2),
        );
        assert_eq!(total, BigInt::from(15) * BigInt::from(10u64).pow(18));
    }

    /// S3 — intra, both ratios zero: both sides are all-profit.
    #[test]
    fn s3_intra_both_ratios_zero() {
        let total = intra_orderbook_profit(
            OrderLeg {
                max_output: fixed(6),
                ratio: U256::zero(),
            },
            OrderLeg {
                max_output: fixed(4),
                ratio: U256::zero(),
            },
            fixed(3),
            fixed(2),
        );
        assert_eq!(total, BigInt::from(26) * BigInt::from(10u64).pow(18));
    }

    /// Property 3: increasing counterpartyMaxOutput never decreases total,
    /// when the per-unit ETH value taken home (`inputEthPrice`) exceeds what
    /// is given up per unit (`counterpartyRatio * outputEthPrice`).
    #[test]
    fn inter_orderbook_monotone_in_counterparty_max_output() {
        let base = CounterpartyQuote {
            ratio: half_fixed(0, 5),
            max_output: fixed(1),
        };
        let bumped = CounterpartyQuote {
            max_output: fixed(2),
            ..base
        };
        let low = inter_orderbook_profit(U256::zero(), fixed(10), base, fixed(1), fixed(1));
        let high = inter_orderbook_profit(U256::zero(), fixed(10), bumped, fixed(1), fixed(1));
        assert!(high >= low);
    }
}
