//! The intra-orderbook variant of `TradeCapability` (spec §4.4
//! "Intra-orderbook variant"): a `multicall([clear, withdrawInput,
//! withdrawOutput])` against the orderbook itself, matching two orders of
//! the same orderbook directly and draining both bounty vaults.

use async_trait::async_trait;
use num::BigInt;
use primitive_types::U256;
use std::collections::BTreeMap;
use std::sync::Arc;

use model::{Pair, TakeOrder, TradeType};
use shared::encoder::CalldataEncoder;
use shared::registry::ContractRegistry;
use shared::task_compiler::{BountyTaskKind, BountyTaskSpec, TaskCompiler};
use shared::telemetry::AttrValue;

use crate::errors::FailedSimulation;
use crate::profit::{intra_orderbook_profit, OrderLeg};
use crate::trade_simulator::base::{PreparedParams, RawTx, TradeCapability};

pub struct IntraOrderbookTrade {
    pub pair: Pair,
    pub counterparty: TakeOrder,
    /// The solver's own vault ids the bounty is credited into, for the
    /// input-token and output-token legs respectively.
    pub bounty_vault_input: U256,
    pub bounty_vault_output: U256,
    pub input_eth_price18: U256,
    pub output_eth_price18: U256,
    pub registry: Arc<dyn ContractRegistry>,
    pub task_compiler: Arc<dyn TaskCompiler>,
    pub encoder: Arc<dyn CalldataEncoder>,
}

#[async_trait]
impl TradeCapability for IntraOrderbookTrade {
    fn trade_type(&self) -> TradeType {
        TradeType::IntraOrderbook
    }

    async fn prepare_trade_params(&self) -> Result<PreparedParams, FailedSimulation> {
        let addrs = self
            .registry
            .get_addresses_for_trade(&self.pair, TradeType::IntraOrderbook)
            .ok_or(FailedSimulation::UndefinedTradeDestinationAddress)?;

        let mut span_attrs = BTreeMap::new();
        span_attrs.insert("trade_type".to_owned(), AttrValue::from("intra_orderbook"));
        span_attrs.insert(
            "order_hash".to_owned(),
            AttrValue::from(format!("{:#x}", self.pair.order_hash())),
        );
        span_attrs.insert(
            "counterparty_order_hash".to_owned(),
            AttrValue::from(format!("{:#x}", self.counterparty.order_hash)),
        );

        Ok(PreparedParams {
            trade_type: TradeType::IntraOrderbook,
            rawtx: RawTx {
                to: addrs.destination,
                data: Vec::new(),
                gas: None,
            },
            span_attrs,
            market_price18: None,
        })
    }

    async fn set_transaction_data(
        &self,
        params: &mut PreparedParams,
        minimum_expected: U256,
    ) -> Result<(), FailedSimulation> {
        let addrs = self
            .registry
            .get_addresses_for_trade(&self.pair, TradeType::IntraOrderbook)
            .ok_or(FailedSimulation::UndefinedTradeDestinationAddress)?;

        let spec = BountyTaskSpec {
            kind: BountyTaskKind::Internal,
            minimum_expected,
            bounty_token: self.pair.buy_token.address,
            bounty_vault_id: self.bounty_vault_output,
        };
        let task_bytecode = self
            .task_compiler
            .get_ensure_bounty_task_bytecode(spec, addrs.dispair)
            .await
            .map_err(|e| {
                FailedSimulation::FailedToGetTaskBytecode(e.to_string(), e.is_node_error())
            })?;

        let clear = self.encoder.encode_clear(
            &self.pair.take_order,
            &self.counterparty,
            self.bounty_vault_input,
            self.bounty_vault_output,
        );
        let withdraw_input =
            self.encoder
                .encode_withdraw(self.pair.sell_token.address, self.bounty_vault_input, None);
        let withdraw_output = self.encoder.encode_withdraw(
            self.pair.buy_token.address,
            self.bounty_vault_output,
            Some(&task_bytecode),
        );

        params.rawtx.data = self
            .encoder
            .encode_multicall(vec![clear, withdraw_input, withdraw_output]);
        Ok(())
    }

    fn estimate_profit(&self, _params: &PreparedParams) -> BigInt {
        intra_orderbook_profit(
            OrderLeg {
                max_output: self.pair.take_order.quote.max_output,
                ratio: self.pair.take_order.quote.ratio,
            },
            OrderLeg {
                max_output: self.counterparty.quote.max_output,
                ratio: self.counterparty.quote.ratio,
            },
            self.output_eth_price18,
            self.input_eth_price18,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::order::{OrderStruct, OrderVersion, VaultRef};
    use model::{OrderHash, Quote, Token};
    use shared::encoder::OpaqueEncoder;
    use shared::fixed_point::one18;
    use shared::registry::{Dispair, TradeAddresses};
    use shared::task_compiler::TaskCompilerError;

    fn token(n: u64) -> Token {
        Token::new(H160::from_low_u64_be(n), format!("T{n}"), 18)
    }

    fn order_struct() -> OrderStruct {
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

    fn take_order(hash: u64, max_output: U256) -> TakeOrder {
        TakeOrder {
            order_hash: OrderHash::from_low_u64_be(hash),
            order: order_struct(),
            input_io_index: 0,
            output_io_index: 0,
            quote: Quote {
                max_output,
                ratio: U256::zero(),
            },
        }
    }

    fn pair() -> Pair {
        Pair::new(
            H160::from_low_u64_be(9),
            token(3),
            token(2),
            0.into(),
            0.into(),
            take_order(1, 6 * one18()),
        )
        .unwrap()
    }

    struct StubRegistry;
    impl ContractRegistry for StubRegistry {
        fn get_addresses_for_trade(
            &self,
            pair: &Pair,
            _trade_type: TradeType,
        ) -> Option<TradeAddresses> {
            Some(TradeAddresses {
                dispair: Dispair {
                    deployer: H160::zero(),
                    interpreter: H160::zero(),
                    store: H160::zero(),
                },
                destination: pair.orderbook,
            })
        }
    }

    struct StubTaskCompiler;
    #[async_trait::async_trait]
    impl TaskCompiler for StubTaskCompiler {
        async fn get_ensure_bounty_task_bytecode(
            &self,
            _spec: BountyTaskSpec,
            _dispair: Dispair,
        ) -> Result<Vec<u8>, TaskCompilerError> {
            Ok(vec![1])
        }
    }

    fn trade() -> IntraOrderbookTrade {
        IntraOrderbookTrade {
            pair: pair(),
            counterparty: take_order(2, 4 * one18()),
            bounty_vault_input: 100.into(),
            bounty_vault_output: 200.into(),
            input_eth_price18: 2 * one18(),
            output_eth_price18: 3 * one18(),
            registry: Arc::new(StubRegistry),
            task_compiler: Arc::new(StubTaskCompiler),
            encoder: Arc::new(OpaqueEncoder),
        }
    }

    #[tokio::test]
    async fn destination_is_the_pairs_own_orderbook() {
        let trade = trade();
        let params = trade.prepare_trade_params().await.unwrap();
        assert_eq!(params.rawtx.to, trade.pair.orderbook);
    }

    #[tokio::test]
    async fn builds_a_multicall_of_clear_and_two_withdrawals() {
        let trade = trade();
        let mut params = trade.prepare_trade_params().await.unwrap();
        trade
            .set_transaction_data(&mut params, U256::from(10))
            .await
            .unwrap();
        assert_eq!(params.rawtx.data[0], 0x06);
    }

    #[tokio::test]
    async fn estimate_profit_matches_s3() {
        let trade = trade();
        let params = trade.prepare_trade_params().await.unwrap();
        assert_eq!(
            trade.estimate_profit(&params),
            BigInt::from(26) * BigInt::from(10u64).pow(18)
        );
    }
}
