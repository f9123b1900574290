//! Gas price source consumed by `Dryrun` (spec §4.3) and
//! `TransactionPipeline` (spec §4.8). The teacher depends on an external
//! `gas-estimation` crate for this; that crate isn't fetchable here, so this
//! mirrors its shape as a plain in-tree collaborator trait, the same way
//! every other §6 interface in this crate (`Client`, `Router`,
//! `MarketPriceOracle`, ...) is declared rather than implemented against a
//! live network.

use async_trait::async_trait;
use primitive_types::U256;

/// Current gas price, in wei, to probe and submit transactions with.
#[async_trait]
pub trait GasPriceEstimating: Send + Sync {
    async fn estimate(&self) -> anyhow::Result<U256>;
}

/// A fixed gas price, useful for tests and for a first deployment before a
/// live estimator is wired in.
pub struct FixedGasPrice(pub U256);

#[async_trait]
impl GasPriceEstimating for FixedGasPrice {
    async fn estimate(&self) -> anyhow::Result<U256> {
        Ok(self.0)
    }
}

/// Reads the node's own `eth_gasPrice` through the `Client` collaborator's
/// JSON-RPC connection, the simplest estimator that doesn't need the
/// external `gas-estimation` crate the teacher depends on.
pub struct NodeGasPrice(pub std::sync::Arc<crate::rpc::JsonRpcClient>);

#[async_trait]
impl GasPriceEstimating for NodeGasPrice {
    async fn estimate(&self) -> anyhow::Result<U256> {
        self.0.gas_price().await
    }
}
