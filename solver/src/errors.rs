//! The error taxonomy of spec §7: per-order and per-simulation failures are
//! recovered locally into a settlement record rather than aborting a round,
//! so these types carry enough structure for `TelemetryAssembler` to build
//! one span from, and nothing more.

use serde::Serialize;
use std::fmt;

/// The three severities `finalize_round` maps every recovered error into
/// (spec §7).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Failures that halt processing of a single order without affecting the
/// rest of the round (spec §7 "Process-order halt").
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProcessOrderError {
    #[error("failed to quote: {0}")]
    FailedToQuote(String),
    #[error("failed to get ETH price: {0}")]
    FailedToGetEthPrice(String),
    #[error("failed to get pools: {0}")]
    FailedToGetPools(String),
    #[error("failed to update pools: {0}")]
    FailedToUpdatePools(String),
    #[error("transaction failed: {0}")]
    TxFailed(String),
    #[error("transaction reverted: {0}")]
    TxReverted(String),
    #[error("transaction failed to mine: {0}")]
    TxMineFailed(String),
    #[error("unexpected error: {0}")]
    UnexpectedError(String),
}

impl ProcessOrderError {
    /// Severity mapping from spec §7. `is_timeout` and `is_node_error` carry
    /// the extra classification bits `contains_node_error` / the tx-wait
    /// timeout flag supply, since the variant alone is not always enough.
    pub fn severity(&self, is_timeout: bool, matches_known_error: bool) -> Severity {
        match self {
            ProcessOrderError::TxFailed(_) | ProcessOrderError::TxMineFailed(_) if is_timeout => {
                Severity::Low
            }
            ProcessOrderError::FailedToGetPools(_) => Severity::Medium,
            ProcessOrderError::TxReverted(_) if matches_known_error => Severity::Medium,
            ProcessOrderError::UnexpectedError(_) => Severity::High,
            _ => Severity::High,
        }
    }
}

/// Failures raised inside the `TradeSimulator` state machine (spec §7
/// "Simulation halt").
#[derive(Clone, Debug, thiserror::Error)]
pub enum FailedSimulation {
    #[error("no profitable opportunity")]
    NoOpportunity,
    #[error("no route available")]
    NoRoute,
    #[error("order ratio is greater than market price")]
    OrderRatioGreaterThanMarketPrice,
    #[error("failed to get ensure-bounty task bytecode: {0}")]
    FailedToGetTaskBytecode(String, bool),
    #[error("no destination address configured for this trade")]
    UndefinedTradeDestinationAddress,
}

impl FailedSimulation {
    /// `isNodeError = (cause == ParseError)` (spec §4.4): carried alongside
    /// the message rather than inferred from the variant, since a bounty
    /// task can also fail as a genuine compilation rejection.
    pub fn is_node_error(&self) -> bool {
        match self {
            FailedSimulation::FailedToGetTaskBytecode(_, is_node_error) => *is_node_error,
            _ => false,
        }
    }
}

/// The status a synthetic or completed settlement is reported under (spec
/// §7 "Order status").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum OrderStatus {
    ZeroOutput,
    NoOpportunity,
    FoundOpportunity,
    UndefinedTradeAddresses,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::ZeroOutput => "ZeroOutput",
            OrderStatus::NoOpportunity => "NoOpportunity",
            OrderStatus::FoundOpportunity => "FoundOpportunity",
            OrderStatus::UndefinedTradeAddresses => "UndefinedTradeAddresses",
        };
        f.write_str(s)
    }
}

/// Substrings recognized as known, already-triaged on-chain revert reasons.
/// A revert matching none of these is promoted to severity HIGH (spec §7).
const KNOWN_ERROR_SUBSTRINGS: &[&str] = &[
    "insufficient funds",
    "minimum sender output",
    "MinimumOutput",
    "slippage",
];

pub fn matches_known_error(message: &str) -> bool {
    KNOWN_ERROR_SUBSTRINGS
        .iter()
        .any(|needle| message.contains(needle))
}

/// Classifies a raw RPC-layer error as a node error (rate-limit, transport,
/// transient) as opposed to a logic error (spec §6 `contains_node_error`,
/// §7 "Node-error classification"). This governs `isNodeError` /
/// `txNoneNodeError` attributes and downstream severity.
pub fn contains_node_error(message: &str) -> bool {
    const NODE_ERROR_SUBSTRINGS: &[&str] = &[
        "rate limit",
        "429",
        "timeout",
        "connection reset",
        "connection refused",
        "502",
        "503",
        "504",
    ];
    NODE_ERROR_SUBSTRINGS
        .iter()
        .any(|needle| message.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_error_is_always_high() {
        let err = ProcessOrderError::UnexpectedError("boom".into());
        assert_eq!(err.severity(false, false), Severity::High);
    }

    #[test]
    fn tx_failed_timeout_is_low() {
        let err = ProcessOrderError::TxFailed("deadline exceeded".into());
        assert_eq!(err.severity(true, false), Severity::Low);
    }

    #[test]
    fn failed_to_get_pools_is_medium() {
        let err = ProcessOrderError::FailedToGetPools("rpc down".into());
        assert_eq!(err.severity(false, false), Severity::Medium);
    }

    #[test]
    fn node_error_classification_is_substring_based() {
        assert!(contains_node_error("429 Too Many Requests"));
        assert!(contains_node_error("upstream connection reset by peer"));
        assert!(!contains_node_error("execution reverted: insufficient funds"));
    }

    #[test]
    fn task_bytecode_failure_is_a_node_error_only_when_flagged() {
        assert!(FailedSimulation::FailedToGetTaskBytecode("x".into(), true).is_node_error());
        assert!(!FailedSimulation::FailedToGetTaskBytecode("x".into(), false).is_node_error());
        assert!(!FailedSimulation::NoOpportunity.is_node_error());
    }
}
