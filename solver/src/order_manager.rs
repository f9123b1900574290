//! OrderManager (spec §4.6, §3): owns every piece of shared mutable state
//! named in spec §3 — `ownersMap`, the `oiPairMap`/`ioPairMap` counterparty
//! indices, and `ownerTokenVaultMap` — and the round-selection policy
//! (`getNextRoundOrders`) and downscale protection (`resetLimits`) built on
//! top of them. Per spec §5, all of it is owned exclusively by this type
//! and mutated only from the scheduler's control loop; other tasks only
//! ever see cloned `Pair` snapshots.

use indexmap::IndexMap;
use model::owner::DEFAULT_OWNER_LIMIT;
use model::{OrderHash, OrderProfile, OwnerProfile, Pair, Vault, VaultKey};
use primitive_types::{H160, U256};
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// A stable pointer into one owner's `OrderProfile::take_orders`, used by
/// `oiPairMap`/`ioPairMap` instead of duplicating `Pair` storage (design
/// note §9: "arena-allocated `Pair` values with stable handles").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PairHandle {
    pub orderbook: H160,
    pub owner: H160,
    pub order_hash: OrderHash,
    pub take_order_index: usize,
}

type OiPairMap = HashMap<H160, HashMap<H160, HashMap<H160, HashMap<OrderHash, PairHandle>>>>;

/// The §3/§4.6 order manager. `owner_limits` mirrors the pinned
/// `ownerLimits` configuration table (spec §6); owners present there are
/// exempt from `reset_limits`'s downscale protection.
pub struct OrderManager {
    owners_map: HashMap<H160, IndexMap<H160, OwnerProfile>>,
    oi_pair_map: OiPairMap,
    io_pair_map: OiPairMap,
    owner_token_vault_map: HashMap<VaultKey, Vault>,
    owner_limits: HashMap<H160, u32>,
}

impl OrderManager {
    pub fn new(owner_limits: HashMap<H160, u32>) -> Self {
        Self {
            owners_map: HashMap::new(),
            oi_pair_map: HashMap::new(),
            io_pair_map: HashMap::new(),
            owner_token_vault_map: HashMap::new(),
            owner_limits,
        }
    }

    /// Folds one newly-observed order into the owner map and both pair
    /// indices (spec §3 "Lifecycle": created on ingestion, never removed
    /// except by explicit removal).
    pub fn add_order(&mut self, orderbook: H160, order_hash: OrderHash, profile: OrderProfile) {
        let owner = profile.order.owner;
        let limit = self.owner_limits.get(&owner).copied();
        let owners = self.owners_map.entry(orderbook).or_default();
        let owner_profile = owners.entry(owner).or_insert_with(|| {
            let mut p = OwnerProfile::new();
            if let Some(limit) = limit {
                p.limit = limit;
            }
            p
        });

        let take_order_count = profile.take_orders.len();
        owner_profile.orders.insert(order_hash, profile);

        for index in 0..take_order_count {
            let pair = &owner_profile.orders[&order_hash].take_orders[index];
            let handle = PairHandle {
                orderbook,
                owner,
                order_hash,
                take_order_index: index,
            };
            self.oi_pair_map
                .entry(orderbook)
                .or_default()
                .entry(pair.buy_token.address)
                .or_default()
                .entry(pair.sell_token.address)
                .or_default()
                .insert(order_hash, handle);
            self.io_pair_map
                .entry(orderbook)
                .or_default()
                .entry(pair.sell_token.address)
                .or_default()
                .entry(pair.buy_token.address)
                .or_default()
                .insert(order_hash, handle);
        }
    }

    /// Removes an order and every index entry pointing at it (spec §3: the
    /// only way a `Pair` is removed).
    pub fn remove_order(&mut self, orderbook: H160, owner: H160, order_hash: OrderHash) {
        if let Some(owners) = self.owners_map.get_mut(&orderbook) {
            if let Some(owner_profile) = owners.get_mut(&owner) {
                if let Some(profile) = owner_profile.orders.shift_remove(&order_hash) {
                    for pair in &profile.take_orders {
                        if let Some(m) = self.oi_pair_map.get_mut(&orderbook) {
                            if let Some(m) = m.get_mut(&pair.buy_token.address) {
                                if let Some(m) = m.get_mut(&pair.sell_token.address) {
                                    m.remove(&order_hash);
                                }
                            }
                        }
                        if let Some(m) = self.io_pair_map.get_mut(&orderbook) {
                            if let Some(m) = m.get_mut(&pair.sell_token.address) {
                                if let Some(m) = m.get_mut(&pair.buy_token.address) {
                                    m.remove(&order_hash);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Records or updates a vault balance observation (spec §3 "Vault
    /// record"). Vaults are never deleted once observed.
    pub fn record_vault(&mut self, key: VaultKey, vault: Vault) {
        self.owner_token_vault_map.insert(key, vault);
    }

    /// `oiPairMap[orderbook][outputToken][inputToken]` lookup (spec §3).
    pub fn pairs_by_output_input(
        &self,
        orderbook: H160,
        output_token: H160,
        input_token: H160,
    ) -> Vec<Pair> {
        self.oi_pair_map
            .get(&orderbook)
            .and_then(|m| m.get(&output_token))
            .and_then(|m| m.get(&input_token))
            .map(|handles| {
                handles
                    .values()
                    .filter_map(|h| self.resolve(h))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every `Pair` the order manager currently tracks, across every
    /// orderbook/owner — the candidate pool `CounterpartySelector` filters.
    pub fn all_pairs(&self) -> Vec<Pair> {
        self.owners_map
            .values()
            .flat_map(|owners| owners.values())
            .flat_map(|profile| profile.flattened_take_orders())
            .cloned()
            .collect()
    }

    /// Every orderbook id this manager currently holds at least one order
    /// for, so inter-orderbook counterparty search (spec §4.5) can enumerate
    /// "every other orderbook" without scanning the full pair pool.
    pub fn orderbooks(&self) -> Vec<H160> {
        self.owners_map.keys().copied().collect()
    }

    fn resolve(&self, handle: &PairHandle) -> Option<Pair> {
        self.owners_map
            .get(&handle.orderbook)?
            .get(&handle.owner)?
            .orders
            .get(&handle.order_hash)?
            .take_orders
            .get(handle.take_order_index)
            .cloned()
    }

    /// The §4.6 round-selection policy. Consumes `min(limit, len)` pairs per
    /// owner starting at `lastIndex`, wrapping to 0 if the window runs past
    /// the end, then refreshes each consumed pair's cached vault balances
    /// from `ownerTokenVaultMap` (falling back to the pair's existing cached
    /// balance when no record exists) before an optional Fisher-Yates
    /// shuffle.
    pub fn get_next_round_orders(&mut self, shuffle: bool) -> Vec<Pair> {
        let mut collected = Vec::new();

        for owners in self.owners_map.values_mut() {
            for owner_profile in owners.values_mut() {
                let flattened: Vec<Pair> = owner_profile
                    .orders
                    .values()
                    .flat_map(|p| p.take_orders.iter().cloned())
                    .collect();
                let n = flattened.len();
                if n == 0 {
                    continue;
                }
                let take_count = (owner_profile.limit as usize).min(n);
                let mut idx = (owner_profile.last_index as usize) % n;
                for _ in 0..take_count {
                    collected.push(flattened[idx].clone());
                    idx = (idx + 1) % n;
                }
                owner_profile.last_index = idx as u32;
            }
        }

        for pair in collected.iter_mut() {
            self.refresh_balances(pair);
        }

        if shuffle {
            collected.shuffle(&mut rand::thread_rng());
        }

        collected
    }

    /// Overwrites `pair`'s two cached vault-balance fields from
    /// `ownerTokenVaultMap`, falling back to the pair's existing cached
    /// balance when no record exists yet (spec §4.6/§4.7 step 1). Exposed so
    /// `process_order_init` can re-apply it against the fresh snapshot it
    /// holds right before the zero-output gate.
    pub(crate) fn refresh_balances(&self, pair: &mut Pair) {
        let owner = pair.owner();
        if let Some(vault_ref) = pair
            .take_order
            .order
            .output_at(pair.take_order.output_io_index)
        {
            let key = VaultKey {
                orderbook: pair.orderbook,
                owner,
                token: pair.buy_token.address,
                vault_id: vault_ref.vault_id,
            };
            if let Some(vault) = self.owner_token_vault_map.get(&key) {
                pair.buy_token_vault_balance = vault.balance;
            }
        }
        if let Some(vault_ref) = pair
            .take_order
            .order
            .input_at(pair.take_order.input_io_index)
        {
            let key = VaultKey {
                orderbook: pair.orderbook,
                owner,
                token: pair.sell_token.address,
                vault_id: vault_ref.vault_id,
            };
            if let Some(vault) = self.owner_token_vault_map.get(&key) {
                pair.sell_token_vault_balance = vault.balance;
            }
        }
    }

    /// Downscale protection (spec §4.6): periodically recomputes each
    /// non-pinned owner's round-robin `limit` from how concentrated their
    /// vault balance is relative to other owners of the same output token,
    /// across every orderbook.
    pub fn reset_limits(&mut self) {
        for (orderbook, owners) in self.owners_map.iter_mut() {
            let owner_addrs: Vec<H160> = owners.keys().copied().collect();
            let mut new_limits = HashMap::new();

            for &owner in &owner_addrs {
                if self.owner_limits.contains_key(&owner) {
                    continue;
                }
                let tokens: Vec<H160> = owners[&owner]
                    .flattened_take_orders()
                    .iter()
                    .map(|p| p.buy_token.address)
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if tokens.is_empty() {
                    continue;
                }

                let mut factors = Vec::with_capacity(tokens.len());
                for token in tokens {
                    let own_balances: Vec<U256> = self
                        .owner_token_vault_map
                        .iter()
                        .filter(|(k, _)| {
                            &k.orderbook == orderbook && k.owner == owner && k.token == token
                        })
                        .map(|(_, v)| v.balance)
                        .collect();
                    if own_balances.is_empty() {
                        continue;
                    }
                    let own_sum: f64 = own_balances.iter().map(u256_to_f64).sum();
                    let avg_owner_balance = own_sum / own_balances.len() as f64;

                    let other_balances: Vec<(H160, U256)> = self
                        .owner_token_vault_map
                        .iter()
                        .filter(|(k, _)| {
                            &k.orderbook == orderbook && k.owner != owner && k.token == token
                        })
                        .map(|(k, v)| (k.owner, v.balance))
                        .collect();
                    let others_sum: f64 = other_balances.iter().map(|(_, b)| u256_to_f64(b)).sum();
                    let other_owner_count = other_balances
                        .iter()
                        .map(|(o, _)| *o)
                        .collect::<std::collections::BTreeSet<_>>()
                        .len()
                        .max(1) as f64;

                    let per_other_owner = (others_sum / other_owner_count).max(1.0);
                    let factor = (avg_owner_balance / per_other_owner).min(1.0);
                    factors.push(factor);
                }

                if factors.is_empty() {
                    continue;
                }
                let geometric_mean =
                    factors.iter().product::<f64>().powf(1.0 / factors.len() as f64);
                let new_limit =
                    ((DEFAULT_OWNER_LIMIT as f64) * geometric_mean).floor().max(1.0) as u32;
                new_limits.insert(owner, new_limit);
            }

            for (owner, limit) in new_limits {
                owners[&owner].limit = limit;
            }
        }
    }
}

fn u256_to_f64(value: &U256) -> f64 {
    let mut bytes = [0u8; 32];
    value.to_little_endian(&mut bytes);
    let mut acc = 0f64;
    for byte in bytes.iter().rev() {
        acc = acc * 256.0 + *byte as f64;
    }
    acc
}
