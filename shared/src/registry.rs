//! `ContractRegistry` (spec §6): resolves the dispair and destination
//! address a `TradeSimulator` variant should target for a given `Pair` and
//! `TradeType`. On-chain ABI encoding stays opaque (spec §1 Non-goals); this
//! module only resolves *addresses*.

use model::{Pair, TradeType};
use primitive_types::H160;
use serde::Deserialize;
use std::collections::HashMap;

/// The (deployer, interpreter, store) triple identifying a compatible
/// expression runtime version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub struct Dispair {
    pub deployer: H160,
    pub interpreter: H160,
    pub store: H160,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TradeAddresses {
    pub dispair: Dispair,
    pub destination: H160,
}

/// One version's (`v4`/`v5`) set of arb contract addresses, as loaded from
/// `--contracts-config` (spec §6).
#[derive(Clone, Debug, Deserialize)]
pub struct VersionContracts {
    pub dispair: Dispair,
    pub sushi_arb: Option<H160>,
    pub generic_arb: Option<H160>,
    pub balancer_arb: Option<H160>,
    pub stabull_arb: Option<H160>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContractsConfig {
    pub v4: VersionContracts,
    pub v5: VersionContracts,
}

impl ContractsConfig {
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn for_version(&self, version: model::OrderVersion) -> &VersionContracts {
        match version {
            model::OrderVersion::V3 => &self.v4,
            model::OrderVersion::V4 => &self.v5,
        }
    }
}

/// The §6 `ContractRegistry` collaborator.
pub trait ContractRegistry: Send + Sync {
    fn get_addresses_for_trade(
        &self,
        pair: &Pair,
        trade_type: TradeType,
    ) -> Option<TradeAddresses>;
}

/// Default registry implementing the §6 dispatch table directly against a
/// loaded `ContractsConfig`. Orderbook addresses for `IntraOrderbook` come
/// straight from the pair (the orderbook is its own destination); everything
/// else resolves against the version-specific arb contracts.
pub struct StaticContractRegistry {
    pub contracts: ContractsConfig,
}

impl StaticContractRegistry {
    pub fn new(contracts: ContractsConfig) -> Self {
        Self { contracts }
    }
}

impl ContractRegistry for StaticContractRegistry {
    fn get_addresses_for_trade(
        &self,
        pair: &Pair,
        trade_type: TradeType,
    ) -> Option<TradeAddresses> {
        let version = pair.take_order.order.version;
        let contracts = self.contracts.for_version(version);
        let destination = match trade_type {
            TradeType::Router => contracts
                .sushi_arb
                .or(contracts.balancer_arb)
                .or(contracts.stabull_arb)?,
            TradeType::RouteProcessor => contracts.sushi_arb?,
            TradeType::Balancer => contracts.balancer_arb?,
            TradeType::Stabull => contracts.stabull_arb?,
            TradeType::InterOrderbook => contracts.generic_arb?,
            TradeType::IntraOrderbook => pair.orderbook,
        };
        Some(TradeAddresses {
            dispair: contracts.dispair,
            destination,
        })
    }
}

/// Pinned per-owner round-robin overrides (spec §3, §6). Owners present here
/// are exempt from `resetLimits`'s downscale protection.
pub type OwnerLimits = HashMap<H160, u32>;

#[cfg(test)]
mod tests {
    use super::*;
    use model::order::{OrderStruct, VaultRef};
    use model::{Pair, Quote, TakeOrder, Token};

    fn dispair(n: u64) -> Dispair {
        Dispair {
            deployer: H160::from_low_u64_be(n),
            interpreter: H160::from_low_u64_be(n + 1),
            store: H160::from_low_u64_be(n + 2),
        }
    }

    fn config() -> ContractsConfig {
        ContractsConfig {
            v4: VersionContracts {
                dispair: dispair(1),
                sushi_arb: Some(H160::from_low_u64_be(10)),
                generic_arb: Some(H160::from_low_u64_be(11)),
                balancer_arb: None,
                stabull_arb: None,
            },
            v5: VersionContracts {
                dispair: dispair(100),
                sushi_arb: None,
                generic_arb: Some(H160::from_low_u64_be(110)),
                balancer_arb: Some(H160::from_low_u64_be(111)),
                stabull_arb: None,
            },
        }
    }

    fn pair(version: model::OrderVersion) -> Pair {
        let token = |n| Token::new(H160::from_low_u64_be(n), format!("T{n}"), 18);
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
            version,
        };
        Pair::new(
            H160::from_low_u64_be(9),
            token(3),
            token(2),
            0.into(),
            0.into(),
            TakeOrder {
                order_hash: Default::default(),
                order,
                input_io_index: 0,
                output_io_index: 0,
                quote: Quote {
                    max_output: 0.into(),
                    ratio: 0.into(),
                },
            },
        )
        .unwrap()
    }

    #[test]
    fn intra_orderbook_destination_is_the_pairs_orderbook() {
        let registry = StaticContractRegistry::new(config());
        let pair = pair(model::OrderVersion::V3);
        let addrs = registry
            .get_addresses_for_trade(&pair, TradeType::IntraOrderbook)
            .unwrap();
        assert_eq!(addrs.destination, pair.orderbook);
    }

    #[test]
    fn inter_orderbook_destination_is_generic_arb() {
        let registry = StaticContractRegistry::new(config());
        let pair = pair(model::OrderVersion::V4);
        let addrs = registry
            .get_addresses_for_trade(&pair, TradeType::InterOrderbook)
            .unwrap();
        assert_eq!(addrs.destination, H160::from_low_u64_be(110));
        assert_eq!(addrs.dispair, dispair(100));
    }

    #[test]
    fn router_falls_back_through_sushi_balancer_stabull() {
        let registry = StaticContractRegistry::new(config());
        assert_eq!(
            registry
                .get_addresses_for_trade(&pair(model::OrderVersion::V3), TradeType::Router)
                .unwrap()
                .destination,
            H160::from_low_u64_be(10)
        );
        assert_eq!(
            registry
                .get_addresses_for_trade(&pair(model::OrderVersion::V4), TradeType::Router)
                .unwrap()
                .destination,
            H160::from_low_u64_be(111)
        );
    }

    #[test]
    fn missing_destination_for_version_is_none() {
        let registry = StaticContractRegistry::new(config());
        assert!(registry
            .get_addresses_for_trade(&pair(model::OrderVersion::V4), TradeType::RouteProcessor)
            .is_none());
    }
}
