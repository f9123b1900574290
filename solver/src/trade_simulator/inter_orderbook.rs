//! The inter-orderbook variant of `TradeCapability` (spec §4.4
//! "Inter-orderbook variant"): an inner `takeOrders` call on the
//! counterparty's orderbook, nested as the `data` field of an outer
//! `takeOrders` on the searching order's own orderbook, destined for the
//! version-specific generic-arb contract.

use async_trait::async_trait;
use num::BigInt;
use primitive_types::{H160, U256};
use std::collections::BTreeMap;
use std::sync::Arc;

use model::{Pair, TakeOrder, TradeType};
use shared::encoder::CalldataEncoder;
use shared::registry::ContractRegistry;
use shared::task_compiler::{BountyTaskKind, BountyTaskSpec, TaskCompiler};
use shared::telemetry::AttrValue;

use crate::errors::FailedSimulation;
use crate::profit::{inter_orderbook_profit, CounterpartyQuote};
use crate::trade_simulator::base::{PreparedParams, RawTx, TradeCapability};

pub struct InterOrderbookTrade {
    pub pair: Pair,
    pub counterparty_orderbook: H160,
    pub counterparty: TakeOrder,
    pub input_eth_price18: U256,
    pub output_eth_price18: U256,
    pub registry: Arc<dyn ContractRegistry>,
    pub task_compiler: Arc<dyn TaskCompiler>,
    pub encoder: Arc<dyn CalldataEncoder>,
}

#[async_trait]
impl TradeCapability for InterOrderbookTrade {
    fn trade_type(&self) -> TradeType {
        TradeType::InterOrderbook
    }

    async fn prepare_trade_params(&self) -> Result<PreparedParams, FailedSimulation> {
        let addrs = self
            .registry
            .get_addresses_for_trade(&self.pair, TradeType::InterOrderbook)
            .ok_or(FailedSimulation::UndefinedTradeDestinationAddress)?;

        let mut span_attrs = BTreeMap::new();
        span_attrs.insert("trade_type".to_owned(), AttrValue::from("inter_orderbook"));
        span_attrs.insert(
            "order_hash".to_owned(),
            AttrValue::from(format!("{:#x}", self.pair.order_hash())),
        );
        span_attrs.insert(
            "counterparty_order_hash".to_owned(),
            AttrValue::from(format!("{:#x}", self.counterparty.order_hash)),
        );
        span_attrs.insert(
            "counterparty_orderbook".to_owned(),
            AttrValue::from(format!("{:#x}", self.counterparty_orderbook)),
        );

        Ok(PreparedParams {
            trade_type: TradeType::InterOrderbook,
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
            .get_addresses_for_trade(&self.pair, TradeType::InterOrderbook)
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

        let inner = self.encoder.encode_take_orders(
            self.counterparty_orderbook,
            &self.counterparty,
            &[],
        );
        let nested = self
            .encoder
            .encode_nested_take_orders(self.counterparty_orderbook, &inner);
        params.rawtx.data = self.encoder.encode_inter_orderbook_take_orders(
            self.pair.orderbook,
            &self.pair.take_order,
            &nested,
            &task_bytecode,
        );
        Ok(())
    }

    fn estimate_profit(&self, _params: &PreparedParams) -> BigInt {
        inter_orderbook_profit(
            self.pair.take_order.quote.ratio,
            self.pair.take_order.quote.max_output,
            CounterpartyQuote {
                ratio: self.counterparty.quote.ratio,
                max_output: self.counterparty.quote.max_output,
            },
            self.input_eth_price18,
            self.output_eth_price18,
        )
    }
}
