//! TelemetryAssembler (spec §2, design note §9): turns a finished or
//! recovered settlement into a `PreAssembledSpan` the external `Logger`
//! exports without further transformation. Every attribute is filled in
//! here, never partially assembled downstream, so the `Logger` boundary
//! stays a pure export.

use model::OrderHash;
use num::BigInt;
use primitive_types::{H160, U256};
use shared::telemetry::{AttrValue, PreAssembledSpan, SpanEvent};

use crate::errors::{OrderStatus, Severity};

/// What `finalize_round` (spec §4.7) folds one processed order down to
/// before assembling its span: either a completed simulation (profitable
/// or not) or one of the synthetic statuses raised by `process_order_init`
/// before a simulation was ever attempted.
#[derive(Clone, Debug)]
pub struct OrderOutcome {
    pub order_hash: OrderHash,
    pub orderbook: H160,
    pub owner: H160,
    pub status: OrderStatus,
    pub trade_type: Option<&'static str>,
    pub estimated_profit: Option<BigInt>,
    pub estimated_gas_cost: Option<U256>,
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub is_node_error: bool,
    pub block_number: u64,
    pub events: Vec<SpanEvent>,
}

impl OrderOutcome {
    pub fn synthetic(
        order_hash: OrderHash,
        orderbook: H160,
        owner: H160,
        status: OrderStatus,
        block_number: u64,
        message: Option<String>,
    ) -> Self {
        Self {
            order_hash,
            orderbook,
            owner,
            status,
            trade_type: None,
            estimated_profit: None,
            estimated_gas_cost: None,
            message,
            severity: None,
            is_node_error: false,
            block_number,
            events: Vec::new(),
        }
    }
}

/// Assembles the per-order span `finalize_round` exports for one outcome.
pub fn assemble_order_span(outcome: &OrderOutcome) -> PreAssembledSpan {
    let mut span = PreAssembledSpan::new("process_order")
        .with_attr("order_hash", AttrValue::from(format!("{:#x}", outcome.order_hash)))
        .with_attr("orderbook", AttrValue::from(format!("{:#x}", outcome.orderbook)))
        .with_attr("owner", AttrValue::from(format!("{:#x}", outcome.owner)))
        .with_attr("status", AttrValue::from(outcome.status.to_string()))
        .with_attr("block_number", AttrValue::Int(outcome.block_number as i64))
        .with_attr("is_node_error", AttrValue::Bool(outcome.is_node_error));

    if let Some(trade_type) = outcome.trade_type {
        span = span.with_attr("trade_type", AttrValue::from(trade_type));
    }
    if let Some(profit) = &outcome.estimated_profit {
        span = span.with_attr("estimated_profit", AttrValue::from(profit.to_string()));
    }
    if let Some(gas_cost) = outcome.estimated_gas_cost {
        span = span.with_attr("estimated_gas_cost", AttrValue::U256(gas_cost));
    }
    if let Some(message) = &outcome.message {
        span = span.with_attr("message", AttrValue::from(message.clone()));
    }
    if let Some(severity) = outcome.severity {
        span = span.with_attr("severity", AttrValue::from(format!("{severity:?}").to_uppercase()));
    }
    for event in &outcome.events {
        span = span.with_event(event.clone());
    }
    span
}

/// A round-level summary `RoundScheduler` exports once every processed
/// order has been folded into a span (spec §4.7 "checkpoint reports").
#[derive(Clone, Debug, Default)]
pub struct RoundSummary {
    pub block_number: u64,
    pub orders_considered: usize,
    pub opportunities_found: usize,
    pub router_cache_hit_rate: f64,
}

pub fn assemble_round_span(summary: &RoundSummary) -> PreAssembledSpan {
    PreAssembledSpan::new("round")
        .with_attr("block_number", AttrValue::Int(summary.block_number as i64))
        .with_attr("orders_considered", AttrValue::Int(summary.orders_considered as i64))
        .with_attr("opportunities_found", AttrValue::Int(summary.opportunities_found as i64))
        .with_attr(
            "router_cache_hit_rate",
            AttrValue::from(format!("{:.4}", summary.router_cache_hit_rate)),
        )
}
