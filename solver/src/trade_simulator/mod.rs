//! The three `TradeCapability` implementations (spec §4.4) that plug into
//! the shared state machine in `base`: router, inter-orderbook, and
//! intra-orderbook.

pub mod base;
pub mod inter_orderbook;
pub mod intra_orderbook;
pub mod router;

pub use base::{
    try_simulate_trade, FailedSimulationOutcome, FailureStage, PreparedParams, RawTx,
    SimulationOutcome, TradeCapability,
};
pub use inter_orderbook::InterOrderbookTrade;
pub use intra_orderbook::IntraOrderbookTrade;
pub use router::RouterTrade;
