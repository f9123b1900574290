use crate::order::{OrderHash, OrderStruct};
use crate::pair::Pair;
use indexmap::IndexMap;

/// Initial per-owner round-robin quota (spec §3). Mutable downscale
/// protection may lower it, never below 1.
pub const DEFAULT_OWNER_LIMIT: u32 = 25;

/// Everything the order manager tracks about one order of one owner.
/// `take_orders` enumerates every (output token, input token) slice of the
/// order where the two tokens differ.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderProfile {
    pub active: bool,
    pub order: OrderStruct,
    pub take_orders: Vec<Pair>,
}

impl OrderProfile {
    pub fn new(order: OrderStruct, take_orders: Vec<Pair>) -> Self {
        Self {
            active: true,
            order,
            take_orders,
        }
    }
}

/// Per (orderbook, owner) round-robin bookkeeping (spec §3, §4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct OwnerProfile {
    pub limit: u32,
    pub orders: IndexMap<OrderHash, OrderProfile>,
    pub last_index: u32,
}

impl OwnerProfile {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_OWNER_LIMIT,
            orders: IndexMap::new(),
            last_index: 0,
        }
    }

    /// Flattened `take_orders` across every order of this owner, in the
    /// existing per-order concatenation order (spec §4.6).
    pub fn flattened_take_orders(&self) -> Vec<&Pair> {
        self.orders
            .values()
            .flat_map(|profile| profile.take_orders.iter())
            .collect()
    }
}

impl Default for OwnerProfile {
    fn default() -> Self {
        Self::new()
    }
}
