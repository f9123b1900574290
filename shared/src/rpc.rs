//! The node/signer collaborators (spec §6): `Client` (read access to the
//! chain), `Signer` (a wallet capable of sending and awaiting a
//! transaction), and `WalletManager` (the pool `TransactionPipeline` draws
//! signers from). `RpcMetrics` tracks success/failure per normalized URL so
//! `contains_node_error` classification (spec §7) has something to count
//! against.

use async_trait::async_trait;
use primitive_types::{H160, H256, U256};
use prometheus_metric_storage::MetricStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A contract call the `Client` is asked to simulate/read. Calldata encoding
/// is produced upstream (spec §1 Non-goals); this is just the envelope.
#[derive(Clone, Debug)]
pub struct CallRequest {
    pub to: H160,
    pub data: Vec<u8>,
    pub from: Option<H160>,
}

/// Read-only chain access (spec §6 `Client`).
#[async_trait]
pub trait Client: Send + Sync {
    async fn get_block_number(&self) -> anyhow::Result<u64>;
    async fn read_contract(&self, call: CallRequest) -> anyhow::Result<Vec<u8>>;
    async fn estimate_gas(&self, call: CallRequest) -> anyhow::Result<U256>;
}

/// The outcome of waiting on a submitted transaction (spec §4.8).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Clone, Debug)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub status: ReceiptStatus,
    pub gas_used: U256,
    pub effective_gas_price: U256,
}

/// The result of a gas probe (spec §6 `estimate_gas_cost`). `l1_cost` is the
/// rollup data-availability fee quoted alongside L2 execution gas; zero on
/// chains with no separate L1 component.
#[derive(Clone, Copy, Debug, Default)]
pub struct GasEstimate {
    pub gas: U256,
    pub l1_cost: U256,
}

/// A funded account capable of sending transactions (spec §6 `Signer`).
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> H160;
    async fn estimate_gas_cost(&self, call: CallRequest) -> anyhow::Result<GasEstimate>;
    async fn send_transaction(&self, call: CallRequest, gas_limit: U256) -> anyhow::Result<H256>;
    async fn wait_for_receipt(&self, tx_hash: H256) -> anyhow::Result<TxReceipt>;
}

/// The pool `TransactionPipeline` draws signers from (spec §5: the only
/// component in the design that needs real mutual exclusion, since every
/// other piece of state is confined to the single control-loop task).
#[async_trait]
pub trait WalletManager: Send + Sync {
    /// Returns a signer not currently in use. When `block` is true, waits
    /// for one to free up instead of returning `None`.
    async fn get_random_signer(&self, block: bool) -> Option<std::sync::Arc<dyn Signer>>;

    /// Returns a signer acquired via `get_random_signer` to the pool.
    fn release(&self, address: H160);
}

/// Per-normalized-URL request/success/failure counters (spec §6, §7).
#[derive(MetricStorage)]
#[metric(subsystem = "rpc")]
pub struct RpcMetrics {
    /// Number of RPC requests issued, by host and method.
    #[metric(labels("host", "method"))]
    requests: prometheus::IntCounterVec,

    /// Number of RPC requests that returned successfully, by host and method.
    #[metric(labels("host", "method"))]
    successes: prometheus::IntCounterVec,

    /// Number of RPC requests that failed, by host and method.
    #[metric(labels("host", "method"))]
    failures: prometheus::IntCounterVec,
}

impl RpcMetrics {
    pub fn on_request(&self, host: &str, method: &str) {
        self.requests.with_label_values(&[host, method]).inc();
    }

    pub fn on_success(&self, host: &str, method: &str) {
        self.successes.with_label_values(&[host, method]).inc();
    }

    pub fn on_failure(&self, host: &str, method: &str) {
        self.failures.with_label_values(&[host, method]).inc();
    }
}

/// Strips scheme and path so metrics bucket by host only, matching the
/// teacher's approach to keeping cardinality bounded.
pub fn normalize_host(url: &url::Url) -> String {
    url.host_str().unwrap_or("unknown").to_owned()
}

/// A free-running counter of consecutive node-error classifications
/// (spec §7: repeated node errors should eventually surface as a distinct
/// severity from a one-off revert). Confined to the single control-loop
/// task, so a plain `AtomicU64` is overkill in principle but matches the
/// teacher's preference for `Atomic*` counters over a `Mutex<u64>` for
/// single-field counters touched from async code.
#[derive(Default)]
pub struct ConsecutiveNodeErrors(AtomicU64);

impl ConsecutiveNodeErrors {
    pub fn record(&self, was_node_error: bool) -> u64 {
        if was_node_error {
            self.0.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.0.store(0, Ordering::SeqCst);
            0
        }
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

fn call_to_json(call: &CallRequest) -> serde_json::Value {
    let mut object = serde_json::json!({
        "to": format!("{:#x}", call.to),
        "data": format!("0x{}", hex::encode(&call.data)),
    });
    if let Some(from) = call.from {
        object["from"] = serde_json::Value::String(format!("{from:#x}"));
    }
    object
}

fn parse_hex_u256(value: &serde_json::Value) -> anyhow::Result<U256> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("expected a hex string, got {value}"))?;
    Ok(U256::from_str_radix(hex_str.trim_start_matches("0x"), 16)?)
}

/// A `Client` backed by a plain JSON-RPC connection to `--node-url`, the
/// simplest possible stand-in for whatever production node client a real
/// deployment wires in (the teacher depends on `web3`/`ethcontract` for
/// this; those pull in a full contract-ABI layer this core has no use for,
/// since calldata stays opaque per spec §1 Non-goals).
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: url::Url,
    metrics: Arc<RpcMetrics>,
}

impl JsonRpcClient {
    pub fn new(url: url::Url, timeout: Duration, metrics: Arc<RpcMetrics>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, metrics })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let host = normalize_host(&self.url);
        self.metrics.on_request(&host, method);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let send_and_parse = async {
            let response = self.http.post(self.url.clone()).json(&body).send().await?;
            let value: serde_json::Value = response.json().await?;
            if let Some(error) = value.get("error") {
                anyhow::bail!("rpc error calling {method}: {error}");
            }
            value
                .get("result")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("rpc response for {method} had no result"))
        };
        match send_and_parse.await {
            Ok(result) => {
                self.metrics.on_success(&host, method);
                Ok(result)
            }
            Err(err) => {
                self.metrics.on_failure(&host, method);
                Err(err)
            }
        }
    }

    /// `eth_gasPrice`, consumed by `gas_price::NodeGasPrice` rather than the
    /// `Client` trait itself -- the §6 interface table doesn't list gas
    /// price as a `Client` operation, matching the teacher's separation
    /// between `web3::Web3` and the standalone `gas-estimation` crate.
    pub async fn gas_price(&self) -> anyhow::Result<U256> {
        let result = self.call("eth_gasPrice", serde_json::json!([])).await?;
        parse_hex_u256(&result)
    }
}

#[async_trait]
impl Client for JsonRpcClient {
    async fn get_block_number(&self) -> anyhow::Result<u64> {
        let result = self.call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(parse_hex_u256(&result)?.as_u64())
    }

    async fn read_contract(&self, call: CallRequest) -> anyhow::Result<Vec<u8>> {
        let result = self
            .call("eth_call", serde_json::json!([call_to_json(&call), "latest"]))
            .await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_call: expected a hex string"))?;
        Ok(hex::decode(hex_str.trim_start_matches("0x"))?)
    }

    async fn estimate_gas(&self, call: CallRequest) -> anyhow::Result<U256> {
        let result = self
            .call("eth_estimateGas", serde_json::json!([call_to_json(&call)]))
            .await?;
        parse_hex_u256(&result)
    }
}

/// A `Signer` that delegates signing to the node itself via
/// `eth_sendTransaction` against an address the node already holds a key
/// for (the common shape for devnets and for nodes fronted by a custody
/// signer). Real client-side key management is explicitly out of scope
/// (spec §1: "wallet key management beyond the `get_random_signer`
/// contract").
pub struct NodeSigner {
    client: Arc<JsonRpcClient>,
    address: H160,
}

impl NodeSigner {
    pub fn new(client: Arc<JsonRpcClient>, address: H160) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl Signer for NodeSigner {
    fn address(&self) -> H160 {
        self.address
    }

    async fn estimate_gas_cost(&self, call: CallRequest) -> anyhow::Result<GasEstimate> {
        let gas = self.client.estimate_gas(call).await?;
        Ok(GasEstimate {
            gas,
            l1_cost: U256::zero(),
        })
    }

    async fn send_transaction(&self, call: CallRequest, gas_limit: U256) -> anyhow::Result<H256> {
        let mut object = call_to_json(&call);
        object["from"] = serde_json::Value::String(format!("{:#x}", self.address));
        object["gas"] = serde_json::Value::String(format!("{gas_limit:#x}"));
        let result = self
            .client
            .call("eth_sendTransaction", serde_json::json!([object]))
            .await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_sendTransaction: expected a hex string"))?;
        Ok(H256::from_slice(&hex::decode(hex_str.trim_start_matches("0x"))?))
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> anyhow::Result<TxReceipt> {
        loop {
            let result = self
                .client
                .call(
                    "eth_getTransactionReceipt",
                    serde_json::json!([format!("{tx_hash:#x}")]),
                )
                .await?;
            if result.is_null() {
                tokio::time::sleep(Duration::from_millis(500)).await;
                continue;
            }
            let status = match result.get("status").and_then(|v| v.as_str()) {
                Some("0x0") => ReceiptStatus::Reverted,
                _ => ReceiptStatus::Success,
            };
            let gas_used = result
                .get("gasUsed")
                .map(parse_hex_u256)
                .transpose()?
                .unwrap_or_default();
            let effective_gas_price = result
                .get("effectiveGasPrice")
                .map(parse_hex_u256)
                .transpose()?
                .unwrap_or_default();
            return Ok(TxReceipt {
                tx_hash,
                status,
                gas_used,
                effective_gas_price,
            });
        }
    }
}
