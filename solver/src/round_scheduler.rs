//! RoundScheduler (spec §4.7): drives one round from order selection through
//! per-order simulation and submission, to the round's own summary span.
//!
//! Trade-mode selection (Open Question, recorded in DESIGN.md): the
//! distilled spec never pins down how a searching order arbitrates between
//! the router, inter-orderbook, and intra-orderbook variants when more than
//! one might apply. This waterfalls through them in a fixed priority --
//! router first (cheapest quote, no counterparty dependency), then
//! inter-orderbook counterparties, then intra-orderbook counterparties --
//! stopping at the first simulation that doesn't fail, the same
//! most-favorable-first bias `CounterpartySelector` already applies within a
//! single mode.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use primitive_types::{H160, U256};
use std::collections::HashMap;
use std::sync::Arc;

use model::{Pair, TradeType};
use shared::conversions::big_int_to_u256;
use shared::encoder::{CalldataEncoder, RouteLeg};
use shared::fixed_point::mul18;
use shared::gas_price::GasPriceEstimating;
use shared::oracle::MarketPriceOracle;
use shared::receipts::{BaseResult, ReceiptProcessor};
use shared::registry::ContractRegistry;
use shared::router::{Router, RouterCache};
use shared::rpc::{Client, WalletManager};
use shared::task_compiler::TaskCompiler;
use shared::telemetry::PreAssembledSpan;

use crate::counterparty::{get_counterparty_orders, CounterpartySource};
use crate::errors::{FailedSimulation, OrderStatus};
use crate::order_manager::OrderManager;
use crate::telemetry_assembler::{assemble_order_span, assemble_round_span, OrderOutcome, RoundSummary};
use crate::trade_simulator::inter_orderbook::InterOrderbookTrade;
use crate::trade_simulator::intra_orderbook::IntraOrderbookTrade;
use crate::trade_simulator::router::{RouterQuote, RouterTrade};
use crate::trade_simulator::{try_simulate_trade, SimulationOutcome, TradeCapability};
use crate::transaction_pipeline::{process_transaction, ProcessTransactionArgs};

/// The collaborators a round is wired against (spec §6), grouped so
/// `run_round`/`process_order_init` don't each take a dozen parameters.
pub struct RoundSchedulerDeps {
    pub client: Arc<dyn Client>,
    pub router: Arc<dyn Router>,
    pub router_cache: Arc<RouterCache>,
    pub registry: Arc<dyn ContractRegistry>,
    pub task_compiler: Arc<dyn TaskCompiler>,
    pub encoder: Arc<dyn CalldataEncoder>,
    pub oracle: Arc<dyn MarketPriceOracle>,
    pub wallet_manager: Arc<dyn WalletManager>,
    pub receipt_processor: Arc<dyn ReceiptProcessor>,
    pub gas_price: Arc<dyn GasPriceEstimating>,
    pub gas_limit_multiplier: u16,
    pub gas_coverage_percentage: String,
    pub max_concurrency: usize,
    pub explorer_base_url: String,
}

/// One order's processed result: the span to export, and the background
/// settlement future if a transaction was submitted (awaited by the caller,
/// not here, so a slow receipt never blocks the rest of the round).
pub struct ProcessedOrder {
    pub span: PreAssembledSpan,
    pub found_opportunity: bool,
    pub settlement: Option<BoxFuture<'static, PreAssembledSpan>>,
}

/// Runs one round end to end (spec §4.7): warms the router, selects orders
/// via `OrderManager`, simulates and submits each concurrently up to
/// `max_concurrency`, and returns every order's span alongside the round
/// summary span.
pub async fn run_round(
    order_manager: &mut OrderManager,
    deps: &RoundSchedulerDeps,
    shuffle: bool,
) -> (Vec<ProcessedOrder>, PreAssembledSpan) {
    let block_number = deps.client.get_block_number().await.unwrap_or_default();
    let _ = deps.router.warm_up(block_number).await;
    deps.router_cache.clear();

    let pairs = order_manager.get_next_round_orders(shuffle);
    let order_manager: &OrderManager = order_manager;
    let orders_considered = pairs.len();

    let results: Vec<ProcessedOrder> = stream::iter(
        pairs
            .into_iter()
            .map(|pair| process_order_init(pair, order_manager, deps, block_number)),
    )
    .buffer_unordered(deps.max_concurrency.max(1))
    .collect()
    .await;

    let opportunities_found = results.iter().filter(|r| r.found_opportunity).count();
    let summary = RoundSummary {
        block_number,
        orders_considered,
        opportunities_found,
        router_cache_hit_rate: deps.router_cache.hit_rate(),
    };
    (results, assemble_round_span(&summary))
}

/// One order's fast-path checks and full simulate-then-submit flow (spec
/// §4.7 "process_order_init").
async fn process_order_init(
    mut pair: Pair,
    order_manager: &OrderManager,
    deps: &RoundSchedulerDeps,
    block_number: u64,
) -> ProcessedOrder {
    order_manager.refresh_balances(&mut pair);

    let order_hash = pair.order_hash();
    let owner = pair.owner();
    let orderbook = pair.orderbook;

    if pair.sell_token_vault_balance.is_zero() {
        return synthetic(order_hash, orderbook, owner, OrderStatus::ZeroOutput, block_number, None);
    }

    let (input_price, output_price) = futures::join!(
        deps.oracle.eth_price18(pair.sell_token.address),
        deps.oracle.eth_price18(pair.buy_token.address),
    );
    let (input_eth_price18, output_eth_price18) = match (input_price, output_price) {
        (Ok(i), Ok(o)) => (i, o),
        _ => {
            return synthetic(
                order_hash,
                orderbook,
                owner,
                OrderStatus::NoOpportunity,
                block_number,
                Some("failed to get ETH price".to_owned()),
            );
        }
    };

    let candidates = build_candidates(&pair, order_manager, input_eth_price18, output_eth_price18, deps).await;
    if candidates.is_empty() {
        return synthetic(order_hash, orderbook, owner, OrderStatus::NoOpportunity, block_number, None);
    }

    let gas_price = deps.gas_price.estimate().await.unwrap_or_default();
    let signer = match deps.wallet_manager.get_random_signer(true).await {
        Some(signer) => signer,
        None => {
            return synthetic(
                order_hash,
                orderbook,
                owner,
                OrderStatus::NoOpportunity,
                block_number,
                Some("no signer available".to_owned()),
            );
        }
    };

    let mut only_undefined_destination = true;
    let mut found: Option<SimulationOutcome> = None;
    for capability in &candidates {
        match try_simulate_trade(
            capability.as_ref(),
            &signer,
            gas_price,
            deps.gas_limit_multiplier,
            &deps.gas_coverage_percentage,
            block_number,
        )
        .await
        {
            Ok(outcome) => {
                found = Some(outcome);
                break;
            }
            Err(failed) => {
                if !matches!(failed.error, FailedSimulation::UndefinedTradeDestinationAddress) {
                    only_undefined_destination = false;
                }
            }
        }
    }

    let outcome = match found {
        Some(outcome) => outcome,
        None => {
            deps.wallet_manager.release(signer.address());
            let status = if only_undefined_destination {
                OrderStatus::UndefinedTradeAddresses
            } else {
                OrderStatus::NoOpportunity
            };
            return synthetic(order_hash, orderbook, owner, status, block_number, None);
        }
    };

    let estimated_profit_u256 = big_int_to_u256(&outcome.estimated_profit).unwrap_or_default();
    let gas_limit = outcome.rawtx.gas.unwrap_or_else(|| U256::from(500_000u64));

    let mut prices = HashMap::new();
    prices.insert(pair.sell_token.address, input_eth_price18);
    prices.insert(pair.buy_token.address, output_eth_price18);

    let submit_args = ProcessTransactionArgs {
        rawtx: outcome.rawtx.clone(),
        gas_limit,
        signer: signer.clone(),
        explorer_base_url: deps.explorer_base_url.clone(),
        orderbook,
        prices,
        base_result: BaseResult {
            estimated_profit: estimated_profit_u256,
            estimated_gas_cost: outcome.estimated_gas_cost,
        },
        to_token: pair.buy_token.clone(),
        from_token: pair.sell_token.clone(),
        receipt_processor: deps.receipt_processor.clone(),
        now_unix: block_number,
    };

    match process_transaction(submit_args).await {
        Ok(submitted) => {
            deps.wallet_manager.release(signer.address());
            let order_outcome = OrderOutcome {
                order_hash,
                orderbook,
                owner,
                status: OrderStatus::FoundOpportunity,
                trade_type: Some(trade_type_label(outcome.trade_type)),
                estimated_profit: Some(outcome.estimated_profit),
                estimated_gas_cost: Some(outcome.estimated_gas_cost),
                message: Some(submitted.tx_url),
                severity: None,
                is_node_error: false,
                block_number,
                events: Vec::new(),
            };
            ProcessedOrder {
                span: assemble_order_span(&order_outcome),
                found_opportunity: true,
                settlement: Some(submitted.settlement),
            }
        }
        Err(failure) => {
            deps.wallet_manager.release(signer.address());
            let order_outcome = OrderOutcome {
                order_hash,
                orderbook,
                owner,
                status: OrderStatus::FoundOpportunity,
                trade_type: Some(trade_type_label(outcome.trade_type)),
                estimated_profit: Some(outcome.estimated_profit),
                estimated_gas_cost: Some(outcome.estimated_gas_cost),
                message: Some(failure.reason.to_string()),
                severity: Some(failure.reason.severity(false, crate::errors::matches_known_error(&failure.reason.to_string()))),
                is_node_error: failure.is_node_error,
                block_number,
                events: Vec::new(),
            };
            ProcessedOrder {
                span: assemble_order_span(&order_outcome),
                found_opportunity: true,
                settlement: None,
            }
        }
    }
}

fn synthetic(
    order_hash: model::OrderHash,
    orderbook: H160,
    owner: H160,
    status: OrderStatus,
    block_number: u64,
    message: Option<String>,
) -> ProcessedOrder {
    let outcome = OrderOutcome::synthetic(order_hash, orderbook, owner, status, block_number, message);
    ProcessedOrder {
        span: assemble_order_span(&outcome),
        found_opportunity: false,
        settlement: None,
    }
}

fn trade_type_label(trade_type: TradeType) -> &'static str {
    match trade_type {
        TradeType::Router => "router",
        TradeType::RouteProcessor => "route_processor",
        TradeType::Balancer => "balancer",
        TradeType::Stabull => "stabull",
        TradeType::InterOrderbook => "inter_orderbook",
        TradeType::IntraOrderbook => "intra_orderbook",
    }
}

/// Builds the waterfall of `TradeCapability` attempts for one searching
/// `pair`: a router quote if one is available, then every inter-orderbook
/// counterparty group, then every intra-orderbook counterparty (spec §4.5
/// feeding §4.4).
async fn build_candidates(
    pair: &Pair,
    order_manager: &OrderManager,
    input_eth_price18: U256,
    output_eth_price18: U256,
    deps: &RoundSchedulerDeps,
) -> Vec<Box<dyn TradeCapability>> {
    let mut candidates: Vec<Box<dyn TradeCapability>> = Vec::new();

    if let Some(router_trade) = build_router_candidate(pair, output_eth_price18, deps).await {
        candidates.push(Box::new(router_trade));
    }

    // Opposing orders only: an order is a counterparty for `pair` iff it
    // gives what `pair` wants and wants what `pair` gives -- i.e. its
    // buy_token equals pair's sell_token and its sell_token equals pair's
    // buy_token (spec §3/§4.5, `oiPairMap[orderbook][outputToken][inputToken]`).
    // `all_pairs()` has no such direction filter, so the lookup goes through
    // the purpose-built `oiPairMap` index instead.
    let inter_candidates: Vec<Pair> = order_manager
        .orderbooks()
        .into_iter()
        .filter(|&orderbook| orderbook != pair.orderbook)
        .flat_map(|orderbook| {
            order_manager.pairs_by_output_input(
                orderbook,
                pair.sell_token.address,
                pair.buy_token.address,
            )
        })
        .collect();
    let inter_groups =
        get_counterparty_orders(pair, CounterpartySource::InterOrderbook, &inter_candidates);
    for group in inter_groups {
        for counterparty_pair in group {
            candidates.push(Box::new(InterOrderbookTrade {
                pair: pair.clone(),
                counterparty_orderbook: counterparty_pair.orderbook,
                counterparty: counterparty_pair.take_order.clone(),
                input_eth_price18,
                output_eth_price18,
                registry: deps.registry.clone(),
                task_compiler: deps.task_compiler.clone(),
                encoder: deps.encoder.clone(),
            }));
        }
    }

    let intra_candidates =
        order_manager.pairs_by_output_input(pair.orderbook, pair.sell_token.address, pair.buy_token.address);
    let intra_groups =
        get_counterparty_orders(pair, CounterpartySource::IntraOrderbook, &intra_candidates);
    for group in intra_groups {
        for counterparty_pair in group {
            candidates.push(Box::new(IntraOrderbookTrade {
                pair: pair.clone(),
                counterparty: counterparty_pair.take_order.clone(),
                bounty_vault_input: pair.take_order.order.inputs[pair.take_order.input_io_index].vault_id,
                bounty_vault_output: pair.take_order.order.outputs[pair.take_order.output_io_index].vault_id,
                input_eth_price18,
                output_eth_price18,
                registry: deps.registry.clone(),
                task_compiler: deps.task_compiler.clone(),
                encoder: deps.encoder.clone(),
            }));
        }
    }

    candidates
}

/// Quotes `pair` against the external router and, if a route is found,
/// turns it into a `RouterTrade` candidate. Surplus over the order's own
/// asking ratio is the profit in buy-token terms (mirroring the ratio
/// convention `model::Quote` already uses elsewhere), converted to ETH via
/// `output_eth_price18`.
async fn build_router_candidate(
    pair: &Pair,
    output_eth_price18: U256,
    deps: &RoundSchedulerDeps,
) -> Option<RouterTrade> {
    if let Some(cached) = deps
        .router_cache
        .get(pair.order_hash(), pair.take_order.quote.max_output)
    {
        return Some(router_trade_from_route(pair, &cached, output_eth_price18, deps));
    }

    let route = deps
        .router
        .find_route(pair, pair.take_order.quote.max_output)
        .await
        .ok()?;
    deps.router_cache
        .insert(pair.order_hash(), pair.take_order.quote.max_output, route.clone());
    Some(router_trade_from_route(pair, &route, output_eth_price18, deps))
}

fn router_trade_from_route(
    pair: &Pair,
    route: &shared::router::Route,
    output_eth_price18: U256,
    deps: &RoundSchedulerDeps,
) -> RouterTrade {
    let owed = mul18(pair.take_order.quote.max_output, pair.take_order.quote.ratio);
    let surplus = route.amount_out.saturating_sub(owed);
    let surplus_eth18 = mul18(surplus, output_eth_price18);
    let profit = shared::conversions::U256Ext::to_big_int(&surplus_eth18);

    RouterTrade {
        pair: pair.clone(),
        quote: RouterQuote {
            legs: vec![RouteLeg {
                target: pair.orderbook,
                calldata: route.calldata.clone(),
            }],
            profit,
        },
        registry: deps.registry.clone(),
        task_compiler: deps.task_compiler.clone(),
        encoder: deps.encoder.clone(),
    }
}
