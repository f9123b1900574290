use crate::order::{OrderHash, OrderStruct};
use crate::token::Token;
use primitive_types::{H160, U256};
use thiserror::Error;

/// A counterparty quote in 18-decimal fixed point (spec §3, §4.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Quote {
    pub max_output: U256,
    pub ratio: U256,
}

/// The sub-record identifying exactly which vaults of an order a `Pair`
/// exercises, and the counterparty-facing quote derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct TakeOrder {
    pub order_hash: OrderHash,
    pub order: OrderStruct,
    pub input_io_index: usize,
    pub output_io_index: usize,
    pub quote: Quote,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum PairError {
    #[error("buy token and sell token must differ")]
    IdenticalTokens,
    #[error("output_io_index {0} is not valid into the order's output vault list")]
    InvalidOutputIndex(usize),
    #[error("input_io_index {0} is not valid into the order's input vault list")]
    InvalidInputIndex(usize),
}

/// The unit of scheduling (spec §3): one (outputToken, inputToken) slice of
/// an order, plus the cached vault balances `OrderManager` refreshes every
/// round.
#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub orderbook: H160,
    pub buy_token: Token,
    pub sell_token: Token,
    pub buy_token_vault_balance: U256,
    pub sell_token_vault_balance: U256,
    pub take_order: TakeOrder,
}

impl Pair {
    pub fn new(
        orderbook: H160,
        buy_token: Token,
        sell_token: Token,
        buy_token_vault_balance: U256,
        sell_token_vault_balance: U256,
        take_order: TakeOrder,
    ) -> Result<Self, PairError> {
        if buy_token.address == sell_token.address {
            return Err(PairError::IdenticalTokens);
        }
        if take_order.order.output_at(take_order.output_io_index).is_none() {
            return Err(PairError::InvalidOutputIndex(take_order.output_io_index));
        }
        if take_order.order.input_at(take_order.input_io_index).is_none() {
            return Err(PairError::InvalidInputIndex(take_order.input_io_index));
        }
        Ok(Self {
            orderbook,
            buy_token,
            sell_token,
            buy_token_vault_balance,
            sell_token_vault_balance,
            take_order,
        })
    }

    pub fn order_hash(&self) -> OrderHash {
        self.take_order.order_hash
    }

    pub fn owner(&self) -> H160 {
        self.take_order.order.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderStruct, OrderVersion, VaultRef};

    fn token(n: u64) -> Token {
        Token::new(H160::from_low_u64_be(n), format!("TOK{n}"), 18)
    }

    fn order() -> OrderStruct {
        OrderStruct {
            owner: H160::from_low_u64_be(1),
            inputs: vec![VaultRef {
                vault_id: 1.into(),
                token: token(2),
            }],
            outputs: vec![VaultRef {
                vault_id: 2.into(),
                token: token(3),
            }],
            version: OrderVersion::V4,
        }
    }

    fn take_order() -> TakeOrder {
        TakeOrder {
            order_hash: Default::default(),
            order: order(),
            input_io_index: 0,
            output_io_index: 0,
            quote: Quote {
                max_output: 0.into(),
                ratio: 0.into(),
            },
        }
    }

    #[test]
    fn rejects_identical_tokens() {
        let t = token(3);
        let err = Pair::new(
            H160::zero(),
            t.clone(),
            t,
            0.into(),
            0.into(),
            take_order(),
        )
        .unwrap_err();
        assert_eq!(err, PairError::IdenticalTokens);
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let mut to = take_order();
        to.output_io_index = 5;
        let err = Pair::new(H160::zero(), token(3), token(2), 0.into(), 0.into(), to).unwrap_err();
        assert_eq!(err, PairError::InvalidOutputIndex(5));
    }

    #[test]
    fn accepts_valid_pair() {
        assert!(Pair::new(H160::zero(), token(3), token(2), 0.into(), 0.into(), take_order()).is_ok());
    }
}
