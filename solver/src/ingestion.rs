//! Seeds `OrderManager` from an `OrderIndexer` snapshot (spec §4.6): turns
//! each subgraph-reported order into the `Pair` fan-out described in spec
//! §3 ("take_orders enumerates every (output token, input token) slice of
//! the order where the two tokens differ") and folds it in via
//! `OrderManager::add_order`.
//!
//! Initial vault balances are seeded at zero; `OrderManager::get_next_round_orders`
//! overwrites them from `ownerTokenVaultMap` once a `record_vault` observation
//! exists, matching the "falls back to the pair's existing cached balance"
//! rule of spec §4.6 for pairs no deposit/withdrawal event has touched yet.
//! Live quoting is out of scope (spec §1), so every `Quote` seeded here is
//! `{max_output: 0, ratio: 0}`; `CounterpartySelector` and the router-mode
//! waterfall both treat a zero quote as "nothing to offer" rather than a
//! crash, so this is a safe placeholder ahead of the first real quote.

use model::order::OrderStruct;
use model::{OrderHash, OrderProfile, Pair, Quote, TakeOrder, Token};
use primitive_types::H160;
use shared::indexer::OrderIndexer;

use crate::order_manager::OrderManager;

/// Fetches every order the indexer currently knows about and folds it into
/// `order_manager`. Returns the number of orders ingested.
pub async fn seed_from_indexer(
    order_manager: &mut OrderManager,
    indexer: &dyn OrderIndexer,
    orderbook: H160,
) -> anyhow::Result<usize> {
    let orders = indexer.fetch_all().await?;
    let count = orders.len();
    for sg_order in orders {
        let take_orders = take_orders_for(&sg_order.order, sg_order.hash);
        let profile = OrderProfile::new(sg_order.order, take_orders);
        order_manager.add_order(orderbook, sg_order.hash, profile);
    }
    Ok(count)
}

/// Builds one `Pair` per (output vault, input vault) combination of `order`
/// whose tokens differ, per spec §3's definition of `take_orders`.
fn take_orders_for(order: &OrderStruct, order_hash: OrderHash) -> Vec<Pair> {
    let mut pairs = Vec::new();
    for (output_io_index, output) in order.outputs.iter().enumerate() {
        for (input_io_index, input) in order.inputs.iter().enumerate() {
            if output.token.address == input.token.address {
                continue;
            }
            let take_order = TakeOrder {
                order_hash,
                order: order.clone(),
                input_io_index,
                output_io_index,
                quote: Quote {
                    max_output: 0.into(),
                    ratio: 0.into(),
                },
            };
            let buy_token: Token = output.token.clone();
            let sell_token: Token = input.token.clone();
            match Pair::new(
                H160::zero(),
                buy_token,
                sell_token,
                0.into(),
                0.into(),
                take_order,
            ) {
                Ok(pair) => pairs.push(pair),
                Err(err) => {
                    tracing::warn!(?order_hash, %err, "skipping invalid take-order slice")
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model::order::{OrderVersion, VaultRef};
    use shared::indexer::{SgOrder, UpstreamEvents, UpstreamEventsStatus};
    use std::collections::HashMap;

    fn token(n: u64) -> Token {
        Token::new(H160::from_low_u64_be(n), format!("TOK{n}"), 18)
    }

    struct FakeIndexer(Vec<SgOrder>);

    #[async_trait]
    impl OrderIndexer for FakeIndexer {
        async fn fetch_all(&self) -> anyhow::Result<Vec<SgOrder>> {
            Ok(self.0.clone())
        }

        async fn get_upstream_events(&self) -> UpstreamEvents {
            UpstreamEvents {
                status: UpstreamEventsStatus::Ok,
                result: HashMap::new(),
            }
        }
    }

    #[test]
    fn skips_same_token_vault_combinations() {
        let order = OrderStruct {
            owner: H160::from_low_u64_be(1),
            inputs: vec![
                VaultRef { vault_id: 1.into(), token: token(2) },
                VaultRef { vault_id: 2.into(), token: token(3) },
            ],
            outputs: vec![VaultRef { vault_id: 3.into(), token: token(2) }],
            version: OrderVersion::V4,
        };
        let pairs = take_orders_for(&order, OrderHash::from_low_u64_be(1));
        // output token(2) vs input token(2) is skipped; only token(3) input survives.
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sell_token.address, token(3).address);
    }

    #[tokio::test]
    async fn seeds_order_manager_from_indexer_snapshot() {
        let order = OrderStruct {
            owner: H160::from_low_u64_be(1),
            inputs: vec![VaultRef { vault_id: 1.into(), token: token(2) }],
            outputs: vec![VaultRef { vault_id: 2.into(), token: token(3) }],
            version: OrderVersion::V4,
        };
        let sg_order = SgOrder {
            hash: OrderHash::from_low_u64_be(42),
            order,
            active: true,
        };
        let indexer = FakeIndexer(vec![sg_order]);
        let mut manager = OrderManager::new(HashMap::new());
        let orderbook = H160::from_low_u64_be(9);
        let count = seed_from_indexer(&mut manager, &indexer, orderbook).await.unwrap();
        assert_eq!(count, 1);
        let pairs = manager.pairs_by_output_input(
            orderbook,
            token(3).address,
            token(2).address,
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].order_hash(), OrderHash::from_low_u64_be(42));
    }
}
