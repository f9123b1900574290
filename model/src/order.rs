use crate::token::Token;
use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

/// The on-chain keccak256 hash identifying an order, used as the key into
/// `OwnerProfile::orders` and both pair indices.
pub type OrderHash = H256;

/// Expression-runtime version tag. Determines which generation of arb
/// contracts `ContractRegistry::get_addresses_for_trade` is allowed to
/// return for a given order (spec §6).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OrderVersion {
    V3,
    V4,
}

/// One entry of an order's input or output vault list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VaultRef {
    pub vault_id: U256,
    pub token: Token,
}

/// The opaque order struct referenced by spec §3: an owner plus the input
/// and output vault lists the order was created against. `TakeOrder`
/// indices into these lists are validated against `inputs`/`outputs` at
/// construction time (see `Pair::new`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStruct {
    pub owner: H160,
    pub inputs: Vec<VaultRef>,
    pub outputs: Vec<VaultRef>,
    pub version: OrderVersion,
}

impl OrderStruct {
    pub fn input_at(&self, index: usize) -> Option<&VaultRef> {
        self.inputs.get(index)
    }

    pub fn output_at(&self, index: usize) -> Option<&VaultRef> {
        self.outputs.get(index)
    }
}
