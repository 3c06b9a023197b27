//! Order parameters for quote and price requests.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// The inputs that uniquely determine a quote request.
///
/// Built once per call and discarded afterwards; every field is fixed at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    /// EIP-155 chain the swap executes on.
    pub chain_id: u64,
    /// Token being sold.
    pub sell_token: Address,
    /// Token being bought.
    pub buy_token: Address,
    /// Amount of `sell_token` to sell, in its smallest unit.
    pub sell_amount: U256,
    /// Account that executes the trade.
    pub taker: Address,
}

impl OrderParams {
    /// Creates a new order.
    #[must_use]
    pub const fn new(
        chain_id: u64,
        sell_token: Address,
        buy_token: Address,
        sell_amount: U256,
        taker: Address,
    ) -> Self {
        Self {
            chain_id,
            sell_token,
            buy_token,
            sell_amount,
            taker,
        }
    }

    /// Renders the order as query parameters, in the order the quote service
    /// documents them.
    ///
    /// Addresses are checksummed and the amount is rendered in decimal.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("chainId", self.chain_id.to_string()),
            ("sellToken", self.sell_token.to_string()),
            ("buyToken", self.buy_token.to_string()),
            ("sellAmount", self.sell_amount.to_string()),
            ("taker", self.taker.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_query_pairs_order_and_format() {
        let order = OrderParams::new(
            10,
            address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
            address!("819845b60a192167ed1139040b4f8eca31834f27"),
            U256::from(1_000_000u64),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
        );
        let pairs = order.query_pairs();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            ["chainId", "sellToken", "buyToken", "sellAmount", "taker"]
        );
        assert_eq!(pairs[0].1, "10");
        assert_eq!(pairs[1].1, "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85");
        assert_eq!(pairs[3].1, "1000000");
        assert_eq!(pairs[4].1, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }

    #[test]
    fn test_large_sell_amount_is_not_truncated() {
        let amount = U256::from(10u64).pow(U256::from(30u64));
        let order = OrderParams::new(1, Address::ZERO, Address::ZERO, amount, Address::ZERO);
        assert_eq!(order.query_pairs()[3].1, format!("1{}", "0".repeat(30)));
    }
}
