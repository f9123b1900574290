//! The `OrderIndexer` collaborator (spec §4.6, §6): the subgraph-backed
//! source `OrderManager` refreshes its owner/pair bookkeeping from.
//! Subgraph ingestion itself stays out of scope (spec §1 Non-goals); only
//! the shape `OrderManager` consumes is modeled here.

use async_trait::async_trait;
use model::{OrderHash, OrderStruct};
use primitive_types::H256;
use std::collections::HashMap;

/// An order as reported by the subgraph, prior to `OrderManager` folding it
/// into `OwnerProfile`/`Pair` bookkeeping.
#[derive(Clone, Debug)]
pub struct SgOrder {
    pub hash: OrderHash,
    pub order: OrderStruct,
    pub active: bool,
}

/// An add/remove event the subgraph recorded for an order, keyed by the
/// originating transaction.
#[derive(Clone, Debug)]
pub struct SgTransaction {
    pub tx_hash: H256,
    pub order_hash: OrderHash,
    pub added: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpstreamEventsStatus {
    Ok,
    PartialFailure,
}

pub struct UpstreamEvents {
    pub status: UpstreamEventsStatus,
    pub result: HashMap<String, Vec<SgTransaction>>,
}

#[async_trait]
pub trait OrderIndexer: Send + Sync {
    async fn fetch_all(&self) -> anyhow::Result<Vec<SgOrder>>;
    async fn get_upstream_events(&self) -> UpstreamEvents;
}

/// An indexer backed by no subgraph at all. Useful for a deployment that
/// seeds its order set some other way, or for a first run before ingestion
/// is wired in.
pub struct NullOrderIndexer;

#[async_trait]
impl OrderIndexer for NullOrderIndexer {
    async fn fetch_all(&self) -> anyhow::Result<Vec<SgOrder>> {
        Ok(Vec::new())
    }

    async fn get_upstream_events(&self) -> UpstreamEvents {
        UpstreamEvents {
            status: UpstreamEventsStatus::Ok,
            result: HashMap::new(),
        }
    }
}
