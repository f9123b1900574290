use crate::token::Token;
use primitive_types::{H160, U256};

/// Key into `OrderManager`'s `ownerTokenVaultMap`: `(orderbook, owner, token,
/// vaultId)` as described in spec §3. Vaults are never deleted once observed.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VaultKey {
    pub orderbook: H160,
    pub owner: H160,
    pub token: H160,
    pub vault_id: U256,
}

/// A vault balance record, updated in place as subgraph-sourced deposit and
/// withdrawal events are observed.
#[derive(Clone, Debug, PartialEq)]
pub struct Vault {
    pub id: U256,
    pub balance: U256,
    pub token: Token,
}
