//! Immutable per-run configuration.

use alloy_primitives::{Address, TxHash, U256, address};
use url::Url;

use crate::order::OrderParams;

/// The canonical Permit2 contract, deployed at the same address on every
/// supported chain.
pub const PERMIT2_ADDRESS: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

/// Settings shared by every flow of a run.
///
/// Built once at startup and passed by reference; nothing in the pipeline
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Account that owns the sell tokens and signs every transaction.
    pub account: Address,
    /// Spender approved for the sell token.
    pub permit2: Address,
    /// Block explorer base URL used to render transaction links.
    pub explorer_url: Option<Url>,
}

impl SwapConfig {
    /// Creates a config for `account` on `chain_id`, using the canonical
    /// Permit2 address and the chain's well-known explorer, if any.
    #[must_use]
    pub fn new(chain_id: u64, account: Address) -> Self {
        Self {
            chain_id,
            account,
            permit2: PERMIT2_ADDRESS,
            explorer_url: known_explorer(chain_id),
        }
    }

    /// Overrides the Permit2 address.
    #[must_use]
    pub const fn with_permit2(mut self, permit2: Address) -> Self {
        self.permit2 = permit2;
        self
    }

    /// Overrides the block explorer.
    #[must_use]
    pub fn with_explorer(mut self, explorer_url: Option<Url>) -> Self {
        self.explorer_url = explorer_url;
        self
    }

    /// Builds an order for this account.
    #[must_use]
    pub const fn order(
        &self,
        sell_token: Address,
        buy_token: Address,
        sell_amount: U256,
    ) -> OrderParams {
        OrderParams::new(self.chain_id, sell_token, buy_token, sell_amount, self.account)
    }

    /// Link to `hash` on the configured explorer.
    #[must_use]
    pub fn explorer_tx_url(&self, hash: &TxHash) -> Option<Url> {
        let base = self.explorer_url.as_ref()?;
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("tx/{hash}")).ok()
    }
}

/// Explorer for chains with a single well-known Etherscan-style deployment.
#[must_use]
pub fn known_explorer(chain_id: u64) -> Option<Url> {
    let base = match chain_id {
        1 => "https://etherscan.io/",
        10 => "https://optimistic.etherscan.io/",
        137 => "https://polygonscan.com/",
        8453 => "https://basescan.org/",
        42161 => "https://arbiscan.io/",
        _ => return None,
    };
    Url::parse(base).ok()
}
