//! The `MarketPriceOracle` collaborator (spec §4.2, §6): supplies the
//! external reference price `ProfitEstimator` converts a token-denominated
//! profit into ETH with, for orders whose pair doesn't already net out in
//! the gas token.

use async_trait::async_trait;
use primitive_types::{H160, U256};

/// An 18-decimal fixed point ETH-per-token price (see
/// `shared::fixed_point`).
#[async_trait]
pub trait MarketPriceOracle: Send + Sync {
    async fn eth_price18(&self, token: H160) -> anyhow::Result<U256>;
}

/// A constant price for every token, useful for tests and for a first
/// deployment before a live price feed is wired in (the same role
/// `gas_price::FixedGasPrice` plays for gas estimation).
pub struct FixedPriceOracle(pub U256);

#[async_trait]
impl MarketPriceOracle for FixedPriceOracle {
    async fn eth_price18(&self, _token: H160) -> anyhow::Result<U256> {
        Ok(self.0)
    }
}
