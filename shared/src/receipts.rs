//! The `ReceiptProcessor` collaborator (spec §4.8, §6): the sink
//! `TransactionPipeline` hands a settled transaction's receipt to for
//! downstream accounting (P&L reporting, alerting) once confirmed.

use async_trait::async_trait;
use model::Token;
use primitive_types::{H160, U256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::rpc::{Signer, TxReceipt};

/// The realized-vs-estimated comparison basis `TradeSimulator` handed off
/// before submission, forwarded unchanged so the processor can compute
/// slippage between estimate and outcome.
#[derive(Clone, Debug)]
pub struct BaseResult {
    pub estimated_profit: U256,
    pub estimated_gas_cost: U256,
}

#[derive(Clone, Debug)]
pub struct ReceiptArgs {
    pub receipt: TxReceipt,
    pub signer: Arc<dyn Signer>,
    pub orderbook: H160,
    pub prices: HashMap<H160, U256>,
    pub base_result: BaseResult,
    pub tx_url: String,
    pub to_token: Token,
    pub from_token: Token,
    pub tx_send_time_unix: u64,
}

#[derive(Clone, Debug)]
pub struct ReceiptOutcome {
    pub realized_profit_eth18: primitive_types::U256,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("receipt processing failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ReceiptProcessor: Send + Sync {
    async fn process_receipt(&self, args: ReceiptArgs) -> Result<ReceiptOutcome, ReceiptError>;
}

/// Derives realized profit from the receipt's own gas accounting rather than
/// a downstream P&L service (out of scope per spec §1). Reverted receipts
/// are always an error; successful ones compare actual gas cost
/// (`gasUsed * effectiveGasPrice`) against `base_result.estimated_gas_cost`
/// and adjust the estimated profit by the difference.
pub struct BasicReceiptProcessor;

#[async_trait]
impl ReceiptProcessor for BasicReceiptProcessor {
    async fn process_receipt(&self, args: ReceiptArgs) -> Result<ReceiptOutcome, ReceiptError> {
        if args.receipt.status == crate::rpc::ReceiptStatus::Reverted {
            return Err(ReceiptError::Failed("transaction reverted".to_owned()));
        }
        let actual_gas_cost = args
            .receipt
            .gas_used
            .saturating_mul(args.receipt.effective_gas_price);
        let gas_overrun = actual_gas_cost.saturating_sub(args.base_result.estimated_gas_cost);
        let realized_profit_eth18 = args.base_result.estimated_profit.saturating_sub(gas_overrun);
        Ok(ReceiptOutcome {
            realized_profit_eth18,
        })
    }
}
