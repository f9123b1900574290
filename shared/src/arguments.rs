//! Command line arguments recognized by the RainSolver binary (spec §6
//! "Configuration"), plus the small parsing helpers the teacher repo keeps
//! alongside them.
use anyhow::Result;
use primitive_types::H160;
use std::{collections::HashMap, str::FromStr, time::Duration};
use url::Url;

#[derive(Debug, structopt::StructOpt)]
pub struct Arguments {
    #[structopt(
        long,
        env = "LOG_FILTER",
        default_value = "warn,solver=debug,shared=debug"
    )]
    pub log_filter: String,

    /// The Ethereum node URL to connect to.
    #[structopt(long, env = "NODE_URL", default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Timeout for all http requests made by the external collaborators
    /// (§6) this core depends on.
    #[structopt(long, env, default_value = "10", parse(try_from_str = duration_from_seconds))]
    pub http_timeout: Duration,

    /// The port at which we serve Prometheus metrics.
    #[structopt(long, env = "METRICS_PORT", default_value = "9588")]
    pub metrics_port: u16,

    /// Batch size: how many orders `RoundScheduler` processes concurrently
    /// per round (spec §4.7, §5).
    #[structopt(long, env = "MAX_CONCURRENCY", default_value = "10")]
    pub max_concurrency: u32,

    /// Integer percent, encoded as text; `"0"` disables the second dryrun
    /// pass (spec §4.4, §6).
    #[structopt(long, env = "GAS_COVERAGE_PERCENTAGE", default_value = "100")]
    pub gas_coverage_percentage: String,

    /// Percent applied to the gas estimator's raw estimate before it is
    /// written back into the transaction (spec §4.3).
    #[structopt(long, env = "GAS_LIMIT_MULTIPLIER", default_value = "110")]
    pub gas_limit_multiplier: u16,

    /// Path to a JSON file describing the per-version arb contract
    /// addresses (`contracts.v4` / `contracts.v5` of spec §6). Kept out of
    /// flat CLI flags because the shape is nested per dispair/arb-type.
    #[structopt(long, env = "CONTRACTS_CONFIG")]
    pub contracts_config: std::path::PathBuf,

    /// Pinned per-owner round-robin overrides (`ownerLimits` of spec §6),
    /// given as repeated `owner=limit` pairs.
    #[structopt(long, env = "OWNER_LIMITS", parse(try_from_str = parse_owner_limit), use_delimiter = true)]
    pub owner_limits: Vec<(H160, u32)>,

    /// How often the round scheduler starts a new round.
    #[structopt(long, env, default_value = "10", parse(try_from_str = duration_from_seconds))]
    pub round_interval: Duration,

    /// The orderbook this process ingests orders for. A single-orderbook
    /// deployment is this binary's first-deployment scope; a multi-orderbook
    /// one runs one process per orderbook (subgraph ingestion, including how
    /// orders map to orderbooks, is out of scope per spec §1).
    #[structopt(long, env, parse(try_from_str = parse_h160))]
    pub orderbook: H160,

    /// Addresses the node already holds signing keys for (spec §1: real
    /// client-side key management is out of scope, so submission goes
    /// through `eth_sendTransaction` against one of these rather than a
    /// locally held private key).
    #[structopt(long, env, parse(try_from_str = parse_h160), use_delimiter = true)]
    pub signer_addresses: Vec<H160>,

    /// Base URL used to build a human-readable transaction link in
    /// telemetry (spec §4.8 `txUrl`).
    #[structopt(long, env, default_value = "https://etherscan.io")]
    pub explorer_base_url: String,
}

impl Arguments {
    pub fn owner_limits_map(&self) -> HashMap<H160, u32> {
        self.owner_limits.iter().copied().collect()
    }
}

fn parse_owner_limit(s: &str) -> Result<(H160, u32)> {
    let (owner, limit) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected owner=limit, got `{s}`"))?;
    let owner = parse_h160(owner)?;
    let limit: u32 = limit.parse()?;
    Ok((owner, limit))
}

fn parse_h160(s: &str) -> Result<H160> {
    Ok(H160::from_str(s.trim_start_matches("0x"))?)
}

pub fn duration_from_seconds(s: &str) -> Result<Duration, std::num::ParseFloatError> {
    Ok(Duration::from_secs_f32(s.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_limit_pair() {
        let (owner, limit) = parse_owner_limit("0x0000000000000000000000000000000000000001=5").unwrap();
        assert_eq!(owner, H160::from_low_u64_be(1));
        assert_eq!(limit, 5);
    }

    #[test]
    fn rejects_malformed_owner_limit_pair() {
        assert!(parse_owner_limit("not-a-pair").is_err());
    }
}
