//! Dryrun (spec §4.3): a single gas-probe pass against a `Signer`'s gas
//! estimator, used twice per `TradeSimulator` run to derive the
//! ensure-bounty task's minimum-profit guard.

use primitive_types::U256;
use shared::rpc::{CallRequest, Signer};
use shared::telemetry::{AttrValue, SpanEvent};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct DryrunEstimate {
    pub gas: U256,
    pub gas_price: U256,
    pub estimated_gas_cost: U256,
    pub attrs: BTreeMap<String, AttrValue>,
}

#[derive(Clone, Debug)]
pub struct DryrunError {
    pub attrs: BTreeMap<String, AttrValue>,
    pub is_node_error: bool,
    pub message: String,
}

impl DryrunError {
    pub fn as_event(&self, stage: u8) -> SpanEvent {
        let mut event = SpanEvent::new("dryrun_failed")
            .with_attr("stage", AttrValue::Int(stage as i64))
            .with_attr("is_node_error", AttrValue::Bool(self.is_node_error))
            .with_attr("message", AttrValue::from(self.message.clone()));
        for (k, v) in &self.attrs {
            event = event.with_attr(k.clone(), v.clone());
        }
        event
    }
}

/// Calls the signer's gas estimator, applies `gasLimitMultiplier` (percent),
/// and writes the resulting gas limit back into `call`. A zero post-multiply
/// gas limit is treated as a synthetic "execution reverted" (spec §4.3).
pub async fn dryrun(
    signer: &Arc<dyn Signer>,
    call: &mut CallRequest,
    gas_price: U256,
    gas_limit_multiplier: u16,
) -> Result<DryrunEstimate, DryrunError> {
    let estimate = signer
        .estimate_gas_cost(call.clone())
        .await
        .map_err(|err| classify(&err.to_string()))?;

    let gas_limit = estimate.gas * U256::from(gas_limit_multiplier) / U256::from(100u64);
    if gas_limit.is_zero() {
        return Err(DryrunError {
            attrs: BTreeMap::new(),
            is_node_error: false,
            message: "execution reverted".to_owned(),
        });
    }

    let estimated_gas_cost = gas_limit
        .checked_mul(gas_price)
        .expect("gas cost overflow: gas limit and gas price are both pre-bounded inputs")
        .checked_add(estimate.l1_cost)
        .expect("gas cost overflow: gas cost and l1 cost are both pre-bounded inputs");

    let mut attrs = BTreeMap::new();
    attrs.insert("gas".to_owned(), AttrValue::U256(gas_limit));
    attrs.insert(
        "estimated_gas_cost".to_owned(),
        AttrValue::U256(estimated_gas_cost),
    );

    Ok(DryrunEstimate {
        gas: gas_limit,
        gas_price,
        estimated_gas_cost,
        attrs,
    })
}

fn classify(message: &str) -> DryrunError {
    let is_node_error = crate::errors::contains_node_error(message);
    let mut attrs = BTreeMap::new();
    attrs.insert("is_node_error".to_owned(), AttrValue::Bool(is_node_error));
    DryrunError {
        attrs,
        is_node_error,
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use primitive_types::{H160, H256};
    use shared::rpc::{GasEstimate, ReceiptStatus, TxReceipt};

    struct StubSigner {
        gas: anyhow::Result<U256>,
        l1_cost: U256,
    }

    #[async_trait]
    impl Signer for StubSigner {
        fn address(&self) -> H160 {
            H160::zero()
        }

        async fn estimate_gas_cost(&self, _call: CallRequest) -> anyhow::Result<GasEstimate> {
            match &self.gas {
                Ok(v) => Ok(GasEstimate {
                    gas: *v,
                    l1_cost: self.l1_cost,
                }),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }

        async fn send_transaction(
            &self,
            _call: CallRequest,
            _gas_limit: U256,
        ) -> anyhow::Result<H256> {
            Ok(H256::zero())
        }

        async fn wait_for_receipt(&self, tx_hash: H256) -> anyhow::Result<TxReceipt> {
            Ok(TxReceipt {
                tx_hash,
                status: ReceiptStatus::Success,
                gas_used: U256::zero(),
                effective_gas_price: U256::zero(),
            })
        }
    }

    fn call() -> CallRequest {
        CallRequest {
            to: H160::zero(),
            data: vec![],
            from: None,
        }
    }

    #[tokio::test]
    async fn applies_gas_limit_multiplier() {
        let signer: Arc<dyn Signer> = Arc::new(StubSigner {
            gas: Ok(U256::from(100_000)),
            l1_cost: U256::zero(),
        });
        let mut c = call();
        let est = dryrun(&signer, &mut c, U256::from(1), 110)
            .await
            .unwrap();
        assert_eq!(est.gas, U256::from(110_000));
        assert_eq!(est.estimated_gas_cost, U256::from(110_000));
    }

    #[tokio::test]
    async fn estimated_gas_cost_includes_l1_cost() {
        let signer: Arc<dyn Signer> = Arc::new(StubSigner {
            gas: Ok(U256::from(100_000)),
            l1_cost: U256::from(5_000),
        });
        let mut c = call();
        let est = dryrun(&signer, &mut c, U256::from(1), 110)
            .await
            .unwrap();
        assert_eq!(est.gas, U256::from(110_000));
        assert_eq!(est.estimated_gas_cost, U256::from(115_000));
    }

    #[tokio::test]
    async fn zero_gas_limit_is_a_synthetic_revert() {
        let signer: Arc<dyn Signer> = Arc::new(StubSigner {
            gas: Ok(U256::zero()),
            l1_cost: U256::zero(),
        });
        let mut c = call();
        let err = dryrun(&signer, &mut c, U256::from(1), 110).await.unwrap_err();
        assert!(!err.is_node_error);
        assert_eq!(err.message, "execution reverted");
    }

    #[tokio::test]
    async fn rpc_failure_is_classified_for_node_errors() {
        let signer: Arc<dyn Signer> = Arc::new(StubSigner {
            gas: Err(anyhow::anyhow!("429 rate limit")),
            l1_cost: U256::zero(),
        });
        let mut c = call();
        let err = dryrun(&signer, &mut c, U256::from(1), 110).await.unwrap_err();
        assert!(err.is_node_error);
    }
}
