use primitive_types::H160;
use serde::{Deserialize, Serialize};

/// An ERC20-like token as referenced by an order's input or output vault.
///
/// `address` is always lowercase hex, matching the invariant in spec §3.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: H160,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: H160, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }
}
