//! TransactionPipeline (spec §4.8): submits a simulated trade's transaction
//! and settles its receipt in the background, so a round doesn't block on
//! mining. Submission happens on the control-loop task; the receipt wait and
//! `ReceiptProcessor` handoff run as a spawned task the scheduler only
//! awaits from `finalize_round` through the returned closure (design note
//! §9: "the settler returned by `process_transaction` is a deferred future
//! that the scheduler awaits in `finalize_round`").
//!
//! `rawtx` is always submitted as a legacy-type transaction; that selection
//! lives in the `Signer` collaborator's own submission path rather than a
//! field on `RawTx`, since the wire encoding of the call is already opaque
//! (spec §1 Non-goals) and the type byte is just one more encoding detail.

use futures::future::BoxFuture;
use primitive_types::{H160, U256};
use shared::receipts::{BaseResult, ReceiptArgs, ReceiptOutcome, ReceiptProcessor};
use shared::rpc::{ReceiptStatus, Signer, DEFAULT_RECEIPT_TIMEOUT};
use shared::telemetry::{AttrValue, PreAssembledSpan};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{matches_known_error, ProcessOrderError, Severity};
use crate::trade_simulator::RawTx;

/// What `process_transaction` hands back for a submission that made it
/// on-chain. `tx_url` is a block-explorer link built from the submitted
/// hash.
pub struct Submitted {
    pub tx_url: String,
    pub end_time_unix: u64,
    /// The background settlement task's report, awaited from
    /// `finalize_round` (spec §5: "settlements from round N block the
    /// start of round N+1's finalize only if a settlement is still
    /// pending").
    pub settlement: BoxFuture<'static, PreAssembledSpan>,
}

#[derive(Debug)]
pub struct SubmitFailure {
    pub reason: ProcessOrderError,
    pub is_node_error: bool,
    pub end_time_unix: u64,
    pub rawtx_with_signer: RawTx,
}

pub struct ProcessTransactionArgs<P: ReceiptProcessor + ?Sized + 'static> {
    pub rawtx: RawTx,
    pub gas_limit: U256,
    pub signer: Arc<dyn Signer>,
    pub explorer_base_url: String,
    pub orderbook: H160,
    pub prices: std::collections::HashMap<H160, U256>,
    pub base_result: BaseResult,
    pub to_token: model::Token,
    pub from_token: model::Token,
    pub receipt_processor: Arc<P>,
    pub now_unix: u64,
}

/// Submits `args.rawtx` and returns either a `Submitted` (carrying the
/// background settlement future) or a `SubmitFailure` (spec §4.8).
pub async fn process_transaction<P: ReceiptProcessor + ?Sized + Send + Sync + 'static>(
    args: ProcessTransactionArgs<P>,
) -> Result<Submitted, SubmitFailure> {
    let call = args.rawtx.to_call_request(args.signer.address());
    match args.signer.send_transaction(call, args.gas_limit).await {
        Ok(hash) => {
            let tx_url = format!("{}/tx/{:#x}", args.explorer_base_url, hash);
            let signer = args.signer.clone();
            let receipt_processor = args.receipt_processor.clone();
            let settlement = Box::pin(transaction_settlement(
                hash,
                signer,
                receipt_processor,
                args.orderbook,
                args.prices,
                args.base_result,
                tx_url.clone(),
                args.to_token,
                args.from_token,
                args.now_unix,
            ));
            Ok(Submitted {
                tx_url,
                end_time_unix: args.now_unix,
                settlement,
            })
        }
        Err(err) => {
            let message = err.to_string();
            let is_node_error = crate::errors::contains_node_error(&message);
            Err(SubmitFailure {
                reason: ProcessOrderError::TxFailed(message),
                is_node_error,
                end_time_unix: args.now_unix,
                rawtx_with_signer: args.rawtx,
            })
        }
    }
}

/// Awaits the receipt, hands it to the external `ReceiptProcessor`, and
/// assembles the span that reports on it (spec §4.8 "transaction_settlement").
#[allow(clippy::too_many_arguments)]
async fn transaction_settlement<P: ReceiptProcessor + ?Sized + Send + Sync + 'static>(
    hash: primitive_types::H256,
    signer: Arc<dyn Signer>,
    receipt_processor: Arc<P>,
    orderbook: H160,
    prices: std::collections::HashMap<H160, U256>,
    base_result: BaseResult,
    tx_url: String,
    to_token: model::Token,
    from_token: model::Token,
    tx_send_time_unix: u64,
) -> PreAssembledSpan {
    let receipt = match tokio::time::timeout(DEFAULT_RECEIPT_TIMEOUT, signer.wait_for_receipt(hash)).await
    {
        Ok(Ok(receipt)) => receipt,
        Ok(Err(err)) => {
            return mine_failed_span(hash, err.to_string(), false);
        }
        Err(_) => {
            return mine_failed_span(hash, "receipt wait timed out".to_owned(), true);
        }
    };

    let reverted = receipt.status == ReceiptStatus::Reverted;
    let args = ReceiptArgs {
        receipt,
        signer,
        orderbook,
        prices,
        base_result,
        tx_url: tx_url.clone(),
        to_token,
        from_token,
        tx_send_time_unix,
    };

    match receipt_processor.process_receipt(args).await {
        Ok(ReceiptOutcome { realized_profit_eth18 }) => PreAssembledSpan::new("transaction_settlement")
            .with_attr("tx_url", AttrValue::from(tx_url))
            .with_attr("realized_profit_eth18", AttrValue::U256(realized_profit_eth18))
            .with_attr("status", AttrValue::from("settled")),
        Err(err) => {
            let message = err.to_string();
            let is_node_error = crate::errors::contains_node_error(&message);
            let matches_known = matches_known_error(&message);
            let severity = if reverted && !matches_known {
                Severity::High
            } else if !is_node_error {
                Severity::High
            } else {
                Severity::Medium
            };
            PreAssembledSpan::new("transaction_settlement")
                .with_attr("tx_url", AttrValue::from(tx_url))
                .with_attr("status", AttrValue::from("reverted"))
                .with_attr("reason", AttrValue::from("TxReverted"))
                .with_attr("message", AttrValue::from(message))
                .with_attr("severity", AttrValue::from(format!("{severity:?}").to_uppercase()))
        }
    }
}

fn mine_failed_span(hash: primitive_types::H256, message: String, is_timeout: bool) -> PreAssembledSpan {
    let severity = if is_timeout { Severity::Low } else { Severity::High };
    PreAssembledSpan::new("transaction_settlement")
        .with_attr("tx_hash", AttrValue::from(format!("{hash:#x}")))
        .with_attr("status", AttrValue::from("mine_failed"))
        .with_attr("reason", AttrValue::from("TxMineFailed"))
        .with_attr("message", AttrValue::from(message))
        .with_attr("severity", AttrValue::from(format!("{severity:?}").to_uppercase()))
}

/// `promiseTimeout` (spec §5): races `fut` against `duration`, yielding
/// `timeout_value` on expiry without cancelling the underlying task.
pub async fn promise_timeout<T, F>(fut: F, duration: Duration, timeout_value: T) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        result = fut => result,
        _ = tokio::time::sleep(duration) => timeout_value,
    }
}
