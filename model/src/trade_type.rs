use serde::{Deserialize, Serialize};

/// The settlement counterparty a trade is built against (design note §9:
/// "dynamic dispatch over trade modes"). `Router`/`RouteProcessor`/
/// `Balancer`/`Stabull` share the external-AMM family; `InterOrderbook` and
/// `IntraOrderbook` are the two orderbook-vs-orderbook modes this core
/// implements in full (spec §4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TradeType {
    Router,
    RouteProcessor,
    Balancer,
    Stabull,
    InterOrderbook,
    IntraOrderbook,
}
