//! The "ensure-bounty task" collaborator (spec §4.3, §4.4, §6): compiles the
//! small program a `TradeSimulator` attaches to its transaction so execution
//! aborts unless the realized profit meets `minimum_expected`.

use async_trait::async_trait;
use primitive_types::{H160, U256};

use crate::registry::Dispair;

/// Whether the bounty vault withdrawal is folded into the same multicall as
/// the clear (`Internal`, the intra-orderbook variant) or stands alone
/// against an external destination (`External`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BountyTaskKind {
    Internal,
    External,
}

#[derive(Clone, Debug)]
pub struct BountyTaskSpec {
    pub kind: BountyTaskKind,
    pub minimum_expected: U256,
    pub bounty_token: H160,
    pub bounty_vault_id: U256,
}

/// `cause == ParseError` signals a node-level failure rather than a
/// genuine compilation rejection (spec §6, §7).
#[derive(Debug, thiserror::Error)]
pub enum TaskCompilerError {
    #[error("bounty task rejected: {0}")]
    Rejected(String),
    #[error("node error while compiling bounty task: {0}")]
    ParseError(String),
}

impl TaskCompilerError {
    pub fn is_node_error(&self) -> bool {
        matches!(self, TaskCompilerError::ParseError(_))
    }
}

#[async_trait]
pub trait TaskCompiler: Send + Sync {
    async fn get_ensure_bounty_task_bytecode(
        &self,
        spec: BountyTaskSpec,
        dispair: Dispair,
    ) -> Result<Vec<u8>, TaskCompilerError>;
}

/// Encodes the bounty spec directly rather than compiling a real expression
/// (on-chain call encoding stays opaque per spec §1 Non-goals). Returns an
/// empty program when `minimum_expected` is zero, matching the "no guard
/// needed" case the first `try_simulate_trade` pass always hits.
pub struct PassthroughTaskCompiler;

#[async_trait]
impl TaskCompiler for PassthroughTaskCompiler {
    async fn get_ensure_bounty_task_bytecode(
        &self,
        spec: BountyTaskSpec,
        _dispair: Dispair,
    ) -> Result<Vec<u8>, TaskCompilerError> {
        if spec.minimum_expected.is_zero() {
            return Ok(Vec::new());
        }
        let mut bytecode = Vec::with_capacity(32 + 20 + 32);
        let mut minimum = [0u8; 32];
        spec.minimum_expected.to_big_endian(&mut minimum);
        bytecode.extend_from_slice(&minimum);
        bytecode.extend_from_slice(spec.bounty_token.as_bytes());
        let mut vault_id = [0u8; 32];
        spec.bounty_vault_id.to_big_endian(&mut vault_id);
        bytecode.extend_from_slice(&vault_id);
        Ok(bytecode)
    }
}
