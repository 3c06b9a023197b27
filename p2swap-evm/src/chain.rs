//! Chain access used by the swap flows.
//!
//! [`SwapChain`] is the narrow surface the flows need: two ERC-20 reads, the
//! account transaction count, `eth_call`, submission and the wait for a
//! receipt. Submission and waiting are separate so a caller knows the hash
//! of a sent transaction even when the wait fails. [`AlloyChain`]
//! implements it over any alloy [`Provider`] that can sign for the account
//! (typically one built with `ProviderBuilder::new().wallet(..)`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_network::ReceiptResponse;
use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider};
use alloy_rpc_types_eth::{BlockId, TransactionRequest};
use alloy_transport::TransportError;

use crate::contract::IERC20;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// `true` if execution succeeded, `false` if it reverted.
    pub status: bool,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Hash of that block.
    pub block_hash: Option<B256>,
}

impl Receipt {
    /// Extracts the fields the swap flows use from a network receipt.
    pub fn from_response<R: ReceiptResponse>(receipt: &R) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash(),
            status: receipt.status(),
            block_number: receipt.block_number(),
            block_hash: receipt.block_hash(),
        }
    }
}

/// Chain operations required by the swap flows.
pub trait SwapChain: Send + Sync {
    /// Error type for chain operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// ERC-20 `allowance(owner, spender)` on `token`.
    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send;

    /// ERC-20 `balanceOf(account)` on `token`.
    fn balance_of(
        &self,
        token: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send;

    /// Transaction count of `account` at the `latest` block.
    fn transaction_count(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Executes `tx` with `eth_call` without sending it.
    fn call(&self, tx: TransactionRequest)
    -> impl Future<Output = Result<Bytes, Self::Error>> + Send;

    /// Signs and submits `tx`, returning its hash without waiting.
    fn submit_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, Self::Error>> + Send;

    /// Waits until the transaction `hash` is mined and returns its receipt.
    fn wait_for_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Receipt, Self::Error>> + Send;
}

impl<T: SwapChain> SwapChain for Arc<T> {
    type Error = T::Error;

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send {
        (**self).allowance(token, owner, spender)
    }

    fn balance_of(
        &self,
        token: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send {
        (**self).balance_of(token, account)
    }

    fn transaction_count(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send {
        (**self).transaction_count(account)
    }

    fn call(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send {
        (**self).call(tx)
    }

    fn submit_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, Self::Error>> + Send {
        (**self).submit_transaction(tx)
    }

    fn wait_for_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Receipt, Self::Error>> + Send {
        (**self).wait_for_receipt(hash)
    }
}

/// Errors from [`AlloyChain`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// RPC transport or transaction submission error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Error waiting for a transaction receipt (timeout, dropped, etc.).
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// Contract call or return decoding error.
    #[error(transparent)]
    Contract(#[from] alloy_contract::Error),
}

/// [`SwapChain`] backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct AlloyChain<P> {
    provider: P,
    confirmations: u64,
    receipt_timeout: Option<Duration>,
}

impl<P> AlloyChain<P> {
    /// Wraps `provider`, waiting for one confirmation and no receipt timeout.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            confirmations: 1,
            receipt_timeout: None,
        }
    }

    /// Number of confirmations to wait for after inclusion.
    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Gives up waiting for a receipt after `timeout`.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// The wrapped provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Confirmations waited for after inclusion.
    pub const fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// Receipt timeout, if any.
    pub const fn receipt_timeout(&self) -> Option<Duration> {
        self.receipt_timeout
    }
}

impl<P: Provider> SwapChain for AlloyChain<P> {
    type Error = ChainError;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.allowance(owner, spender).call().await?)
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<U256, ChainError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.balanceOf(account).call().await?)
    }

    async fn transaction_count(&self, account: Address) -> Result<u64, ChainError> {
        Ok(self
            .provider
            .get_transaction_count(account)
            .block_id(BlockId::latest())
            .await?)
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError> {
        Ok(self.provider.call(tx).await?)
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let pending = self.provider.send_transaction(tx).await?;
        tracing::debug!(tx = %pending.tx_hash(), "transaction submitted");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .with_required_confirmations(self.confirmations)
            .with_timeout(self.receipt_timeout)
            .get_receipt()
            .await?;
        Ok(Receipt::from_response(&receipt))
    }
}
