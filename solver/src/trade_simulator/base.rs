//! The shared trade-simulator state machine (spec §4.4): prepare -> dryrun
//! A -> (re-)set-tx -> dryrun B -> finalize, parameterized over a
//! `TradeCapability` so the three variants (router, inter-orderbook,
//! intra-orderbook; design note §9) plug into one state machine instead of
//! duplicating it.

use async_trait::async_trait;
use num::BigInt;
use primitive_types::{H160, U256};
use shared::rpc::{CallRequest, Signer};
use shared::telemetry::{AttrValue, SpanEvent};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dryrun::{dryrun, DryrunEstimate};
use crate::errors::FailedSimulation;
use model::TradeType;

/// The invariant parts of the transaction a `TradeCapability` builds in
/// `prepare_trade_params` (spec §4.4). Calldata encoding is opaque (spec §1
/// Non-goals); `gas` is populated once a dryrun pass succeeds.
#[derive(Clone, Debug)]
pub struct RawTx {
    pub to: H160,
    pub data: Vec<u8>,
    pub gas: Option<U256>,
}

impl RawTx {
    pub fn to_call_request(&self, from: H160) -> CallRequest {
        CallRequest {
            to: self.to,
            data: self.data.clone(),
            from: Some(from),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PreparedParams {
    pub trade_type: TradeType,
    pub rawtx: RawTx,
    pub span_attrs: BTreeMap<String, AttrValue>,
    /// The market price `estimate_profit` needs for variants that derive
    /// profit from a live price rather than a pre-computed quote (spec
    /// §4.4 `estimate_profit(market_price?)`).
    pub market_price18: Option<U256>,
}

/// The per-mode seam `try_simulate_trade` drives (design note §9: "dynamic
/// dispatch over trade modes ... a single function parameterized by the
/// capability").
#[async_trait]
pub trait TradeCapability: Send + Sync {
    fn trade_type(&self) -> TradeType;

    async fn prepare_trade_params(&self) -> Result<PreparedParams, FailedSimulation>;

    async fn set_transaction_data(
        &self,
        params: &mut PreparedParams,
        minimum_expected: U256,
    ) -> Result<(), FailedSimulation>;

    fn estimate_profit(&self, params: &PreparedParams) -> BigInt;
}

#[derive(Clone, Debug)]
pub struct SimulationOutcome {
    pub trade_type: TradeType,
    pub span_attrs: BTreeMap<String, AttrValue>,
    pub rawtx: RawTx,
    pub estimated_gas_cost: U256,
    pub opp_block_number: u64,
    pub estimated_profit: BigInt,
}

/// Which state the machine failed in, so `finalize_round` (spec §4.7) knows
/// whether to attach a `NoOpportunity` order status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureStage {
    Prepare,
    SetTxData,
    DryrunA,
    DryrunB,
}

#[derive(Clone, Debug)]
pub struct FailedSimulationOutcome {
    pub stage: FailureStage,
    pub error: FailedSimulation,
    pub is_node_error: bool,
    pub event: Option<SpanEvent>,
}

/// Rounds `coverage_pct * 1.01` to an integer percent, round-half-to-even
/// (spec §9 open question, resolved in `SPEC_FULL.md`): exact integer
/// arithmetic rather than an IEEE-754 float round-trip through
/// `Number.toFixed`.
pub fn headroom_percent(coverage_pct: u64) -> u64 {
    let scaled = coverage_pct * 101;
    let whole = scaled / 100;
    let remainder = scaled % 100;
    match remainder.cmp(&50) {
        std::cmp::Ordering::Greater => whole + 1,
        std::cmp::Ordering::Less => whole,
        std::cmp::Ordering::Equal => {
            if whole % 2 == 0 {
                whole
            } else {
                whole + 1
            }
        }
    }
}

/// Drives the state machine of spec §4.4 to completion or a recovered
/// `FailedSimulationOutcome`. `gas_coverage_percentage == "0"` short-circuits
/// after a single dryrun pass (spec §8 property 8).
#[allow(clippy::too_many_arguments)]
pub async fn try_simulate_trade(
    capability: &dyn TradeCapability,
    signer: &Arc<dyn Signer>,
    gas_price: U256,
    gas_limit_multiplier: u16,
    gas_coverage_percentage: &str,
    opp_block_number: u64,
) -> Result<SimulationOutcome, FailedSimulationOutcome> {
    let gas_coverage_pct_value: u64 = gas_coverage_percentage.parse().unwrap_or(0);
    let mut params = capability
        .prepare_trade_params()
        .await
        .map_err(|e| FailedSimulationOutcome {
            stage: FailureStage::Prepare,
            error: e.clone(),
            is_node_error: e.is_node_error(),
            event: None,
        })?;

    capability
        .set_transaction_data(&mut params, U256::zero())
        .await
        .map_err(|e| FailedSimulationOutcome {
            stage: FailureStage::SetTxData,
            error: e.clone(),
            is_node_error: e.is_node_error(),
            event: None,
        })?;

    let est_a = dryrun_stage(signer, &mut params, gas_price, gas_limit_multiplier, 1)
        .await
        .map_err(|(err, event)| FailedSimulationOutcome {
            stage: FailureStage::DryrunA,
            error: FailedSimulation::NoOpportunity,
            is_node_error: err.is_node_error,
            event: Some(event),
        })?;
    params.rawtx.gas = Some(est_a.gas);

    if gas_coverage_percentage == "0" {
        return Ok(finalize(capability, params, est_a.estimated_gas_cost, opp_block_number));
    }

    params.rawtx.gas = None;
    let headroom = headroom_percent(gas_coverage_pct_value);
    let min_expected_a = est_a.estimated_gas_cost * U256::from(headroom) / U256::from(100u64);
    capability
        .set_transaction_data(&mut params, min_expected_a)
        .await
        .map_err(|e| FailedSimulationOutcome {
            stage: FailureStage::SetTxData,
            error: e.clone(),
            is_node_error: e.is_node_error(),
            event: None,
        })?;

    let est_b = dryrun_stage(signer, &mut params, gas_price, gas_limit_multiplier, 2)
        .await
        .map_err(|(err, event)| FailedSimulationOutcome {
            stage: FailureStage::DryrunB,
            error: FailedSimulation::NoOpportunity,
            is_node_error: err.is_node_error,
            event: Some(event),
        })?;
    params.rawtx.gas = Some(est_b.gas);

    let min_expected_b =
        est_b.estimated_gas_cost * U256::from(gas_coverage_pct_value) / U256::from(100u64);
    capability
        .set_transaction_data(&mut params, min_expected_b)
        .await
        .map_err(|e| FailedSimulationOutcome {
            stage: FailureStage::SetTxData,
            error: e.clone(),
            is_node_error: e.is_node_error(),
            event: None,
        })?;

    Ok(finalize(capability, params, est_b.estimated_gas_cost, opp_block_number))
}

async fn dryrun_stage(
    signer: &Arc<dyn Signer>,
    params: &mut PreparedParams,
    gas_price: U256,
    gas_limit_multiplier: u16,
    stage: u8,
) -> Result<DryrunEstimate, (crate::dryrun::DryrunError, SpanEvent)> {
    let mut call = params.rawtx.to_call_request(signer.address());
    dryrun(signer, &mut call, gas_price, gas_limit_multiplier)
        .await
        .map_err(|e| {
            let event = e.as_event(stage);
            (e, event)
        })
}

fn finalize(
    capability: &dyn TradeCapability,
    params: PreparedParams,
    estimated_gas_cost: U256,
    opp_block_number: u64,
) -> SimulationOutcome {
    let profit = capability.estimate_profit(&params);
    SimulationOutcome {
        trade_type: params.trade_type,
        span_attrs: params.span_attrs,
        rawtx: params.rawtx,
        estimated_gas_cost,
        opp_block_number,
        estimated_profit: profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headroom_matches_spec_examples() {
        assert_eq!(headroom_percent(100), 101);
        assert_eq!(headroom_percent(50), 50);
        assert_eq!(headroom_percent(51), 52);
    }
}
