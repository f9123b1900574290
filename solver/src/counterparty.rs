//! CounterpartySelector (spec §4.5): for inter-orderbook trades, the top
//! three opposing orders per counterparty orderbook, sorted by ratio most
//! favorable to the searching side; for intra-orderbook, a single flat list
//! from the same orderbook. Ties keep insertion order — a stable sort,
//! documented here per the open question in spec §9 rather than left to the
//! sort implementation.

use indexmap::IndexMap;
use model::{OrderHash, Pair};
use primitive_types::H160;

pub const MAX_COUNTERPARTIES_PER_ORDERBOOK: usize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CounterpartySource {
    InterOrderbook,
    IntraOrderbook,
}

/// Returns, for inter-orderbook search, one group of up to
/// `MAX_COUNTERPARTIES_PER_ORDERBOOK` opposing orders per other orderbook
/// sorted descending by ratio (most favorable first); for intra-orderbook
/// search, a single flat group drawn from `pair`'s own orderbook.
///
/// `candidates` is every `Pair` offering the opposite (input, output)
/// direction of `pair`, across all orderbooks; `self_order_hash` excludes
/// the searching order from its own counterparty list.
pub fn get_counterparty_orders<'a>(
    pair: &Pair,
    source: CounterpartySource,
    candidates: impl IntoIterator<Item = &'a Pair>,
) -> Vec<Vec<&'a Pair>> {
    let self_hash = pair.order_hash();

    match source {
        CounterpartySource::IntraOrderbook => {
            let mut flat: Vec<&Pair> = candidates
                .into_iter()
                .filter(|c| c.orderbook == pair.orderbook && c.order_hash() != self_hash)
                .collect();
            stable_sort_by_ratio_desc(&mut flat);
            vec![flat]
        }
        CounterpartySource::InterOrderbook => {
            let mut grouped: IndexMap<H160, Vec<&Pair>> = IndexMap::new();
            for candidate in candidates {
                if candidate.orderbook == pair.orderbook || candidate.order_hash() == self_hash {
                    continue;
                }
                grouped
                    .entry(candidate.orderbook)
                    .or_default()
                    .push(candidate);
            }
            grouped
                .into_values()
                .map(|mut group| {
                    stable_sort_by_ratio_desc(&mut group);
                    group.truncate(MAX_COUNTERPARTIES_PER_ORDERBOOK);
                    group
                })
                .collect()
        }
    }
}

fn stable_sort_by_ratio_desc(orders: &mut [&Pair]) {
    orders.sort_by(|a, b| {
        b.take_order
            .quote
            .ratio
            .cmp(&a.take_order.quote.ratio)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::order::{OrderStruct, OrderVersion, VaultRef};
    use model::{Pair, Quote, TakeOrder, Token};
    use primitive_types::U256;

    fn token(n: u64) -> Token {
        Token::new(H160::from_low_u64_be(n), format!("T{n}"), 18)
    }

    fn pair(orderbook: u64, hash: u64, ratio: u64) -> Pair {
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
            H160::from_low_u64_be(orderbook),
            token(3),
            token(2),
            0.into(),
            0.into(),
            TakeOrder {
                order_hash: OrderHash::from_low_u64_be(hash),
                order,
                input_io_index: 0,
                output_io_index: 0,
                quote: Quote {
                    max_output: 0.into(),
                    ratio: U256::from(ratio),
                },
            },
        )
        .unwrap()
    }

    #[test]
    fn inter_orderbook_caps_at_three_per_counterparty_orderbook() {
        let searching = pair(1, 100, 0);
        let candidates: Vec<Pair> = (0..5).map(|i| pair(2, i, 10 - i)).collect();
        let refs: Vec<&Pair> = candidates.iter().collect();
        let groups =
            get_counterparty_orders(&searching, CounterpartySource::InterOrderbook, refs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), MAX_COUNTERPARTIES_PER_ORDERBOOK);
    }

    #[test]
    fn inter_orderbook_groups_by_orderbook_and_excludes_self() {
        let searching = pair(1, 100, 0);
        let candidates = vec![pair(1, 101, 5), pair(2, 102, 5), pair(3, 103, 5)];
        let refs: Vec<&Pair> = candidates.iter().collect();
        let groups =
            get_counterparty_orders(&searching, CounterpartySource::InterOrderbook, refs);
        // orderbook 1 excluded (same as searching pair's own orderbook)
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn intra_orderbook_returns_single_flat_group_same_orderbook() {
        let searching = pair(1, 100, 0);
        let candidates = vec![pair(1, 101, 5), pair(1, 102, 9), pair(2, 103, 20)];
        let refs: Vec<&Pair> = candidates.iter().collect();
        let groups =
            get_counterparty_orders(&searching, CounterpartySource::IntraOrderbook, refs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].take_order.quote.ratio, U256::from(9));
    }
}
