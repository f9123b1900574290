//! The router variant of `TradeCapability` (spec §4.4 "Router variant"): a
//! pre-computed sushi-router quote and a list of route legs against a
//! version-specific sushi-arb (or balancer-arb/stabull-arb) destination.

use async_trait::async_trait;
use num::BigInt;
use primitive_types::U256;
use std::collections::BTreeMap;
use std::sync::Arc;

use model::{Pair, TradeType};
use shared::encoder::{CalldataEncoder, RouteLeg};
use shared::registry::ContractRegistry;
use shared::task_compiler::{BountyTaskKind, BountyTaskSpec, TaskCompiler};
use shared::telemetry::AttrValue;

use crate::errors::FailedSimulation;
use crate::trade_simulator::base::{PreparedParams, RawTx, TradeCapability};

/// The externally-supplied quote this variant's `estimate_profit` returns
/// verbatim (spec §4.2 "Router mode: estimator is the externally supplied
/// `quote.profit`").
#[derive(Clone, Debug)]
pub struct RouterQuote {
    pub legs: Vec<RouteLeg>,
    pub profit: BigInt,
}

pub struct RouterTrade {
    pub pair: Pair,
    pub quote: RouterQuote,
    pub registry: Arc<dyn ContractRegistry>,
    pub task_compiler: Arc<dyn TaskCompiler>,
    pub encoder: Arc<dyn CalldataEncoder>,
}

#[async_trait]
impl TradeCapability for RouterTrade {
    fn trade_type(&self) -> TradeType {
        TradeType::Router
    }

    async fn prepare_trade_params(&self) -> Result<PreparedParams, FailedSimulation> {
        let addrs = self
            .registry
            .get_addresses_for_trade(&self.pair, TradeType::Router)
            .ok_or(FailedSimulation::UndefinedTradeDestinationAddress)?;

        let mut span_attrs = BTreeMap::new();
        span_attrs.insert("trade_type".to_owned(), AttrValue::from("router"));
        span_attrs.insert(
            "order_hash".to_owned(),
            AttrValue::from(format!("{:#x}", self.pair.order_hash())),
        );
        span_attrs.insert("route_legs".to_owned(), AttrValue::Int(self.quote.legs.len() as i64));

        Ok(PreparedParams {
            trade_type: TradeType::Router,
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
            .get_addresses_for_trade(&self.pair, TradeType::Router)
            .ok_or(FailedSimulation::UndefinedTradeDestinationAddress)?;

        let spec = BountyTaskSpec {
            kind: BountyTaskKind::External,
            minimum_expected,
            bounty_token: self.pair.buy_token.address,
            bounty_vault_id: U256::zero(),
        };
        let task_bytecode = self
            .task_compiler
            .get_ensure_bounty_task_bytecode(spec, addrs.dispair)
            .await
            .map_err(|e| {
                FailedSimulation::FailedToGetTaskBytecode(e.to_string(), e.is_node_error())
            })?;

        params.rawtx.data = self.encoder.encode_arb_route(&self.quote.legs, &task_bytecode);
        Ok(())
    }

    fn estimate_profit(&self, _params: &PreparedParams) -> BigInt {
        self.quote.profit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::order::{OrderStruct, OrderVersion, VaultRef};
    use model::{OrderHash, Quote, TakeOrder, Token};
    use primitive_types::H160;
    use shared::registry::{Dispair, TradeAddresses};
    use shared::task_compiler::TaskCompilerError;

    fn pair() -> Pair {
        let token = |n| Token::new(H160::from_low_u64_be(n), format!("T{n}"), 18);
        let order = OrderStruct {
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
        };
        Pair::new(
            H160::from_low_u64_be(9),
            token(3),
            token(2),
            0.into(),
            0.into(),
            TakeOrder {
                order_hash: OrderHash::from_low_u64_be(1),
                order,
                input_io_index: 0,
                output_io_index: 0,
                quote: Quote {
                    max_output: 0.into(),
                    ratio: 0.into(),
                },
            },
        )
        .unwrap()
    }

    struct StubRegistry(H160);
    impl ContractRegistry for StubRegistry {
        fn get_addresses_for_trade(
            &self,
            _pair: &Pair,
            _trade_type: TradeType,
        ) -> Option<TradeAddresses> {
            Some(TradeAddresses {
                dispair: Dispair {
                    deployer: H160::zero(),
                    interpreter: H160::zero(),
                    store: H160::zero(),
                },
                destination: self.0,
            })
        }
    }

    struct StubEncoder;
    impl CalldataEncoder for StubEncoder {
        fn encode_take_orders(&self, _o: H160, _t: &TakeOrder, _b: &[u8]) -> Vec<u8> {
            vec![]
        }
        fn encode_nested_take_orders(&self, _o: H160, _b: &[u8]) -> Vec<u8> {
            vec![]
        }
        fn encode_inter_orderbook_take_orders(
            &self,
            _o: H160,
            _t: &TakeOrder,
            _n: &[u8],
            _b: &[u8],
        ) -> Vec<u8> {
            vec![]
        }
        fn encode_arb_route(&self, legs: &[RouteLeg], task_bytecode: &[u8]) -> Vec<u8> {
            let mut out = vec![legs.len() as u8];
            out.extend_from_slice(task_bytecode);
            out
        }
        fn encode_clear(&self, _a: &TakeOrder, _b: &TakeOrder, _va: U256, _vb: U256) -> Vec<u8> {
            vec![]
        }
        fn encode_withdraw(&self, _t: H160, _v: U256, _task: Option<&[u8]>) -> Vec<u8> {
            vec![]
        }
        fn encode_multicall(&self, _calls: Vec<Vec<u8>>) -> Vec<u8> {
            vec![]
        }
    }

    struct StubTaskCompiler {
        fail: bool,
    }
    #[async_trait::async_trait]
    impl TaskCompiler for StubTaskCompiler {
        async fn get_ensure_bounty_task_bytecode(
            &self,
            _spec: BountyTaskSpec,
            _dispair: Dispair,
        ) -> Result<Vec<u8>, TaskCompilerError> {
            if self.fail {
                Err(TaskCompilerError::ParseError("down".into()))
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    fn trade(fail: bool) -> RouterTrade {
        RouterTrade {
            pair: pair(),
            quote: RouterQuote {
                legs: vec![RouteLeg {
                    target: H160::from_low_u64_be(99),
                    calldata: vec![1],
                }],
                profit: BigInt::from(42),
            },
            registry: Arc::new(StubRegistry(H160::from_low_u64_be(77))),
            task_compiler: Arc::new(StubTaskCompiler { fail }),
            encoder: Arc::new(StubEncoder),
        }
    }

    #[tokio::test]
    async fn prepares_against_registry_destination() {
        let trade = trade(false);
        let params = trade.prepare_trade_params().await.unwrap();
        assert_eq!(params.rawtx.to, H160::from_low_u64_be(77));
    }

    #[tokio::test]
    async fn set_transaction_data_encodes_route_with_task_bytecode() {
        let trade = trade(false);
        let mut params = trade.prepare_trade_params().await.unwrap();
        trade
            .set_transaction_data(&mut params, U256::from(5))
            .await
            .unwrap();
        assert_eq!(params.rawtx.data, vec![1, 1, 2, 3]);
    }

    #[tokio::test]
    async fn task_compiler_parse_error_is_a_node_error() {
        let trade = trade(true);
        let mut params = trade.prepare_trade_params().await.unwrap();
        let err = trade
            .set_transaction_data(&mut params, U256::zero())
            .await
            .unwrap_err();
        assert!(err.is_node_error());
    }

    #[tokio::test]
    async fn estimate_profit_returns_the_quote_verbatim() {
        let trade = trade(false);
        let params = trade.prepare_trade_params().await.unwrap();
        assert_eq!(trade.estimate_profit(&params), BigInt::from(42));
    }
}
