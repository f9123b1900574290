//! The on-chain calldata encoder (spec §1 Non-goals: "the wire encoding of
//! on-chain calls" is explicitly out of scope, treated as an opaque
//! encoder). `TradeSimulator`'s three variants (spec §4.4) each build a
//! different call shape — a plain `takeOrders`, a nested `takeOrders` whose
//! `data` field is itself an encoded `takeOrders`, and a `multicall` of
//! `clear`/`withdraw` — but none of them need to know *how* a call is
//! serialized, only that encoding one produces opaque bytes. This trait is
//! that seam.

use model::{OrderHash, TakeOrder};
use primitive_types::{H160, U256};

/// One leg of a generic-arb or sushi-arb route, as consumed by
/// `RouterTrade`/`InterOrderbookTrade` when building their outer call.
#[derive(Clone, Debug)]
pub struct RouteLeg {
    pub target: H160,
    pub calldata: Vec<u8>,
}

pub trait CalldataEncoder: Send + Sync {
    /// A `takeOrders` call against `orderbook` for a single order, with the
    /// ensure-bounty task (if any) attached.
    fn encode_take_orders(
        &self,
        orderbook: H160,
        take_order: &TakeOrder,
        task_bytecode: &[u8],
    ) -> Vec<u8>;

    /// Wraps an already-encoded inner `takeOrders` call (targeting
    /// `counterparty_orderbook`) as the `data` field of an outer call
    /// targeting the searching order's own orderbook (spec §4.4 "inter-
    /// orderbook variant"): `(counterpartyOrderbook, counterpartyOrderbook,
    /// innerEncoded)`.
    fn encode_nested_take_orders(
        &self,
        counterparty_orderbook: H160,
        inner_encoded: &[u8],
    ) -> Vec<u8>;

    /// The outer `takeOrders` call for the inter-orderbook variant (spec
    /// §4.4): targets the searching order's own orderbook, carries
    /// `nested_data` (the result of `encode_nested_take_orders`) as its
    /// `data` field, with the ensure-bounty task attached.
    fn encode_inter_orderbook_take_orders(
        &self,
        orderbook: H160,
        take_order: &TakeOrder,
        nested_data: &[u8],
        task_bytecode: &[u8],
    ) -> Vec<u8>;

    /// A sushi-arb/generic-arb style call with a list of route legs plus the
    /// ensure-bounty task.
    fn encode_arb_route(&self, legs: &[RouteLeg], task_bytecode: &[u8]) -> Vec<u8>;

    /// Matches two orders directly against each other (spec §4.4
    /// "intra-orderbook variant"), crediting the solver's bounty vaults.
    fn encode_clear(
        &self,
        a: &TakeOrder,
        b: &TakeOrder,
        bounty_vault_a: U256,
        bounty_vault_b: U256,
    ) -> Vec<u8>;

    /// Withdraws a bounty vault, optionally enforcing the ensure-bounty task
    /// on the output-vault leg.
    fn encode_withdraw(&self, token: H160, vault_id: U256, task_bytecode: Option<&[u8]>)
        -> Vec<u8>;

    /// `multicall([clear, withdrawInput, withdrawOutput])` (spec §4.4).
    fn encode_multicall(&self, calls: Vec<Vec<u8>>) -> Vec<u8>;
}

/// Calculates "calldata" length-prefixed byte concatenation encoder.
///
/// This is a faithful stand-in for whatever real ABI encoder this core is
/// deployed against: deterministic, round-trippable shape-wise for tests,
/// but not meant to be decoded by an actual contract (spec §1 Non-goals).
pub struct OpaqueEncoder;

impl OpaqueEncoder {
    fn tag(selector: u8, parts: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![selector];
        for part in parts {
            out.extend_from_slice(&(part.len() as u32).to_be_bytes());
            out.extend_from_slice(part);
        }
        out
    }
}

impl CalldataEncoder for OpaqueEncoder {
    fn encode_take_orders(
        &self,
        orderbook: H160,
        take_order: &TakeOrder,
        task_bytecode: &[u8],
    ) -> Vec<u8> {
        Self::tag(
            0x01,
            &[
                orderbook.as_bytes(),
                order_hash_bytes(take_order.order_hash).as_slice(),
                task_bytecode,
            ],
        )
    }

    fn encode_nested_take_orders(
        &self,
        counterparty_orderbook: H160,
        inner_encoded: &[u8],
    ) -> Vec<u8> {
        Self::tag(
            0x02,
            &[counterparty_orderbook.as_bytes(), inner_encoded],
        )
    }

    fn encode_inter_orderbook_take_orders(
        &self,
        orderbook: H160,
        take_order: &TakeOrder,
        nested_data: &[u8],
        task_bytecode: &[u8],
    ) -> Vec<u8> {
        Self::tag(
            0x07,
            &[
                orderbook.as_bytes(),
                order_hash_bytes(take_order.order_hash).as_slice(),
                nested_data,
                task_bytecode,
            ],
        )
    }

    fn encode_arb_route(&self, legs: &[RouteLeg], task_bytecode: &[u8]) -> Vec<u8> {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(legs.len() * 2 + 1);
        let targets: Vec<[u8; 20]> = legs.iter().map(|l| l.target.to_fixed_bytes()).collect();
        for (leg, target) in legs.iter().zip(targets.iter()) {
            parts.push(target.as_slice());
            parts.push(&leg.calldata);
        }
        parts.push(task_bytecode);
        Self::tag(0x03, &parts)
    }

    fn encode_clear(
        &self,
        a: &TakeOrder,
        b: &TakeOrder,
        bounty_vault_a: U256,
        bounty_vault_b: U256,
    ) -> Vec<u8> {
        let a_hash = order_hash_bytes(a.order_hash);
        let b_hash = order_hash_bytes(b.order_hash);
        let mut va = [0u8; 32];
        bounty_vault_a.to_big_endian(&mut va);
        let mut vb = [0u8; 32];
        bounty_vault_b.to_big_endian(&mut vb);
        Self::tag(0x04, &[&a_hash, &b_hash, &va, &vb])
    }

    fn encode_withdraw(
        &self,
        token: H160,
        vault_id: U256,
        task_bytecode: Option<&[u8]>,
    ) -> Vec<u8> {
        let mut vid = [0u8; 32];
        vault_id.to_big_endian(&mut vid);
        Self::tag(0x05, &[token.as_bytes(), &vid, task_bytecode.unwrap_or(&[])])
    }

    fn encode_multicall(&self, calls: Vec<Vec<u8>>) -> Vec<u8> {
        let refs: Vec<&[u8]> = calls.iter().map(|c| c.as_slice()).collect();
        Self::tag(0x06, &refs)
    }
}

fn order_hash_bytes(hash: OrderHash) -> [u8; 32] {
    hash.to_fixed_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::order::{OrderStruct, OrderVersion, VaultRef};
    use model::{Quote, Token};

    fn take_order(hash: u64) -> TakeOrder {
        let token = |n| Token::new(H160::from_low_u64_be(n), format!("T{n}"), 18);
        TakeOrder {
            order_hash: OrderHash::from_low_u64_be(hash),
            order: OrderStruct {
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
            },
            input_io_index: 0,
            output_io_index: 0,
            quote: Quote {
                max_output: 0.into(),
                ratio: 0.into(),
            },
        }
    }

    #[test]
    fn nested_take_orders_embeds_inner_bytes() {
        let encoder = OpaqueEncoder;
        let inner = encoder.encode_take_orders(H160::from_low_u64_be(9), &take_order(1), &[1, 2, 3]);
        let outer = encoder.encode_nested_take_orders(H160::from_low_u64_be(9), &inner);
        assert!(outer.len() > inner.len());
        assert_eq!(outer[0], 0x02);
    }

    #[test]
    fn inter_orderbook_outer_call_embeds_nested_data_and_task() {
        let encoder = OpaqueEncoder;
        let inner = encoder.encode_take_orders(H160::from_low_u64_be(9), &take_order(1), &[]);
        let nested = encoder.encode_nested_take_orders(H160::from_low_u64_be(9), &inner);
        let outer = encoder.encode_inter_orderbook_take_orders(
            H160::from_low_u64_be(5),
            &take_order(2),
            &nested,
            &[7, 7],
        );
        assert_eq!(outer[0], 0x07);
        assert!(outer.len() > nested.len());
    }

    #[test]
    fn multicall_concatenates_every_call() {
        let encoder = OpaqueEncoder;
        let clear = encoder.encode_clear(&take_order(1), &take_order(2), 1.into(), 2.into());
        let withdraw_in = encoder.encode_withdraw(H160::from_low_u64_be(2), 1.into(), None);
        let withdraw_out = encoder.encode_withdraw(H160::from_low_u64_be(3), 2.into(), Some(&[9]));
        let multi = encoder.encode_multicall(vec![clear.clone(), withdraw_in.clone(), withdraw_out.clone()]);
        assert_eq!(multi[0], 0x06);
        assert!(multi.len() > clear.len() + withdraw_in.len() + withdraw_out.len());
    }
}
