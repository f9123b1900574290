//! The `Router` collaborator (spec §4.4, §6): produces the route a
//! `Router`/`RouteProcessor`-typed trade should execute against, and the
//! cache that remembers routes across dryrun passes of the same round so
//! the second dryrun pass doesn't re-quote a route that didn't change.

use async_trait::async_trait;
use model::Pair;
use primitive_types::U256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// An externally-sourced swap route: how much output a given input amount
/// fetches, plus the opaque calldata a trade built against it would submit.
/// Calldata stays opaque per spec §1 Non-goals.
#[derive(Clone, Debug)]
pub struct Route {
    pub amount_out: U256,
    pub calldata: Vec<u8>,
}

#[async_trait]
pub trait Router: Send + Sync {
    async fn find_route(&self, pair: &Pair, amount_in: U256) -> anyhow::Result<Route>;

    /// Pre-round warmup (spec §4.7 `router.sushi.update(block)`): lets a
    /// pool-graph-backed router refresh its reserves against the latest
    /// block before the round's first quote. Failure is non-fatal — the
    /// caller swallows the error and falls back to stale reserves, so the
    /// default no-op implementation covers routers with nothing to warm.
    async fn warm_up(&self, _block: u64) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A router with nothing behind it: every quote fails, so `RoundScheduler`'s
/// candidate waterfall falls through straight to the orderbook-vs-orderbook
/// modes. Useful for a deployment with no external AMM aggregator wired in.
pub struct NullRouter;

#[async_trait]
impl Router for NullRouter {
    async fn find_route(&self, _pair: &Pair, _amount_in: U256) -> anyhow::Result<Route> {
        Err(anyhow::anyhow!("no router configured"))
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
struct CacheKey {
    order_hash: model::OrderHash,
    amount_in: U256,
}

/// Caches routes within a round so `TradeSimulator`'s second dryrun pass
/// (spec §4.3) can reuse the first pass's route when the adjusted amount is
/// unchanged, and records the miss rate so `RoundScheduler`'s telemetry has
/// something to report about router freshness.
#[derive(Default)]
pub struct RouterCache {
    entries: Mutex<HashMap<CacheKey, Route>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RouterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_hash: model::OrderHash, amount_in: U256) -> Option<Route> {
        let key = CacheKey {
            order_hash,
            amount_in,
        };
        let found = self.entries.lock().unwrap().get(&key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn insert(&self, order_hash: model::OrderHash, amount_in: U256, route: Route) {
        let key = CacheKey {
            order_hash,
            amount_in,
        };
        self.entries.lock().unwrap().insert(key, route);
    }

    /// Drops every entry at the start of a new round; routes from a stale
    /// round must never leak into the next one (spec §5).
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trips_a_route_and_tracks_hit_rate() {
        let cache = RouterCache::new();
        let hash = model::OrderHash::from_low_u64_be(1);
        assert!(cache.get(hash, 100.into()).is_none());
        cache.insert(
            hash,
            100.into(),
            Route {
                amount_out: 200.into(),
                calldata: vec![],
            },
        );
        let route = cache.get(hash, 100.into()).unwrap();
        assert_eq!(route.amount_out, U256::from(200));
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn clear_drops_all_entries() {
        let cache = RouterCache::new();
        let hash = model::OrderHash::from_low_u64_be(1);
        cache.insert(
            hash,
            100.into(),
            Route {
                amount_out: 200.into(),
                calldata: vec![],
            },
        );
        cache.clear();
        assert!(cache.get(hash, 100.into()).is_none());
    }
}
