//! Transaction submission with per-account nonce serialization.
//!
//! The nonce is read from the chain right before submission. Two flows
//! sending from the same account would otherwise read the same count and
//! one of them would be dropped as a replacement, so nonce lookup, submission
//! and the wait for the receipt all happen under an async mutex keyed by the
//! sending address.

use std::sync::Arc;

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, TxHash};
use alloy_rpc_types_eth::TransactionRequest;
use dashmap::DashMap;
use p2swap::{AssembledTransaction, SwapError};
use tokio::sync::Mutex;

use crate::chain::{Receipt, SwapChain};

/// Submits assembled transactions and waits for them to be mined.
#[derive(Debug)]
pub struct TransactionBroadcaster<C> {
    chain: C,
    chain_id: u64,
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl<C: SwapChain> TransactionBroadcaster<C> {
    /// Creates a broadcaster sending to `chain_id` through `chain`.
    pub fn new(chain: C, chain_id: u64) -> Self {
        Self {
            chain,
            chain_id,
            locks: DashMap::new(),
        }
    }

    /// The underlying chain, for reads.
    pub const fn chain(&self) -> &C {
        &self.chain
    }

    /// Resolves the nonce of `from`, submits `tx` and waits for its receipt.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Broadcast`] if the nonce cannot be read, a gas
    /// field does not fit its wire width, submission fails or the receipt
    /// never arrives, and [`SwapError::TransactionReverted`] if the
    /// transaction was mined but reverted.
    pub async fn broadcast(
        &self,
        tx: &AssembledTransaction,
        from: Address,
    ) -> Result<Receipt, SwapError> {
        self.broadcast_with(tx, from, |_| {}).await
    }

    /// Like [`Self::broadcast`], calling `on_submitted` with the transaction
    /// hash once the chain has accepted the transaction and before waiting
    /// for the receipt.
    ///
    /// # Errors
    ///
    /// See [`Self::broadcast`]. `on_submitted` has been called for every
    /// error returned after submission.
    pub async fn broadcast_with<F>(
        &self,
        tx: &AssembledTransaction,
        from: Address,
        on_submitted: F,
    ) -> Result<Receipt, SwapError>
    where
        F: FnOnce(TxHash) + Send,
    {
        let slot = {
            let entry = self
                .locks
                .entry(from)
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = slot.lock().await;

        let nonce = self
            .chain
            .transaction_count(from)
            .await
            .map_err(SwapError::broadcast)?;
        let request = build_request(&tx.clone().with_nonce(nonce), from, self.chain_id)?;

        tracing::info!(%from, to = %tx.to, nonce, "submitting transaction");
        let hash = self
            .chain
            .submit_transaction(request)
            .await
            .map_err(SwapError::broadcast)?;
        on_submitted(hash);

        let receipt = self.chain.wait_for_receipt(hash).await.map_err(|e| {
            tracing::warn!(tx = %hash, error = %e, "no receipt for submitted transaction");
            SwapError::broadcast(e)
        })?;

        if !receipt.status {
            tracing::warn!(tx = %receipt.transaction_hash, "transaction reverted");
            return Err(SwapError::TransactionReverted(receipt.transaction_hash));
        }
        tracing::info!(
            tx = %receipt.transaction_hash,
            block = ?receipt.block_number,
            "transaction confirmed"
        );
        Ok(receipt)
    }
}

/// Converts `tx` into a request, including `value`, `gas` and `gasPrice`
/// only when the quote set them.
///
/// # Errors
///
/// Returns [`SwapError::Broadcast`] if `gas` exceeds `u64` or `gasPrice`
/// exceeds `u128`.
pub fn build_request(
    tx: &AssembledTransaction,
    from: Address,
    chain_id: u64,
) -> Result<TransactionRequest, SwapError> {
    let mut request = TransactionRequest::default()
        .with_from(from)
        .with_to(tx.to)
        .with_input(tx.data.clone())
        .with_chain_id(chain_id);

    if let Some(nonce) = tx.nonce {
        request.set_nonce(nonce);
    }
    if let Some(value) = tx.value {
        request.set_value(value);
    }
    if let Some(gas) = tx.gas {
        let gas = u64::try_from(gas)
            .map_err(|_| SwapError::broadcast(format!("gas limit {gas} does not fit in u64")))?;
        request.set_gas_limit(gas);
    }
    if let Some(gas_price) = tx.gas_price {
        let gas_price = u128::try_from(gas_price).map_err(|_| {
            SwapError::broadcast(format!("gas price {gas_price} does not fit in u128"))
        })?;
        request.set_gas_price(gas_price);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChain, SETTLER};
    use alloy_primitives::{Bytes, TxKind, U256};

    const FROM: Address = Address::repeat_byte(0xAA);

    fn assembled() -> AssembledTransaction {
        AssembledTransaction {
            to: SETTLER,
            data: Bytes::from_static(&[0xAB, 0xCD]),
            value: Some(U256::ZERO),
            gas: Some(U256::from(288_079u64)),
            gas_price: Some(U256::from(4_837_860_000u64)),
            nonce: None,
        }
    }

    #[test]
    fn test_build_request_sets_all_quoted_fields() {
        let request = build_request(&assembled().with_nonce(7), FROM, 10).unwrap();
        assert_eq!(request.from, Some(FROM));
        assert_eq!(request.to, Some(TxKind::Call(SETTLER)));
        assert_eq!(
            request.input.input(),
            Some(&Bytes::from_static(&[0xAB, 0xCD]))
        );
        assert_eq!(request.chain_id, Some(10));
        assert_eq!(request.nonce, Some(7));
        assert_eq!(request.value, Some(U256::ZERO));
        assert_eq!(request.gas, Some(288_079));
        assert_eq!(request.gas_price, Some(4_837_860_000));
    }

    #[test]
    fn test_build_request_omits_unset_fields() {
        let tx = AssembledTransaction {
            value: None,
            gas: None,
            gas_price: None,
            ..assembled()
        };
        let request = build_request(&tx, FROM, 10).unwrap();
        assert_eq!(request.value, None);
        assert_eq!(request.gas, None);
        assert_eq!(request.gas_price, None);
        assert_eq!(request.nonce, None);
    }

    #[test]
    fn test_oversized_gas_is_broadcast_error() {
        let tx = AssembledTransaction {
            gas: Some(U256::from(u64::MAX) + U256::from(1u64)),
            ..assembled()
        };
        let err = build_request(&tx, FROM, 10).unwrap_err();
        assert!(matches!(err, SwapError::Broadcast(_)));
    }

    #[tokio::test]
    async fn test_broadcast_uses_latest_transaction_count() {
        let chain = FakeChain::default();
        chain.sent.lock().unwrap().push(TransactionRequest::default());
        let broadcaster = TransactionBroadcaster::new(chain, 10);

        let receipt = broadcaster.broadcast(&assembled(), FROM).await.unwrap();
        assert!(receipt.status);
        assert_eq!(broadcaster.chain().sent()[1].nonce, Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_broadcasts_get_distinct_nonces() {
        let broadcaster = TransactionBroadcaster::new(FakeChain::default(), 10);
        let tx = assembled();

        let (a, b) = tokio::join!(
            broadcaster.broadcast(&tx, FROM),
            broadcaster.broadcast(&tx, FROM)
        );
        a.unwrap();
        b.unwrap();

        let mut nonces: Vec<_> = broadcaster
            .chain()
            .sent()
            .iter()
            .map(|r| r.nonce.unwrap())
            .collect();
        nonces.sort_unstable();
        assert_eq!(nonces, [0, 1]);
    }

    #[tokio::test]
    async fn test_reverted_transaction_is_reported() {
        let chain = FakeChain {
            receipt_status: false,
            ..FakeChain::default()
        };
        let broadcaster = TransactionBroadcaster::new(chain, 10);
        let err = broadcaster.broadcast(&assembled(), FROM).await.unwrap_err();
        assert!(matches!(err, SwapError::TransactionReverted(_)));
    }

    #[tokio::test]
    async fn test_submission_failure_is_broadcast_error() {
        let chain = FakeChain {
            fail_send: true,
            ..FakeChain::default()
        };
        let broadcaster = TransactionBroadcaster::new(chain, 10);
        let err = broadcaster.broadcast(&assembled(), FROM).await.unwrap_err();
        assert!(matches!(err, SwapError::Broadcast(_)));
        assert!(broadcaster.chain().sent().is_empty());
    }

    #[tokio::test]
    async fn test_submission_is_reported_before_the_receipt() {
        let chain = FakeChain {
            fail_wait: true,
            ..FakeChain::default()
        };
        let broadcaster = TransactionBroadcaster::new(chain, 10);
        let mut submitted = None;

        let err = broadcaster
            .broadcast_with(&assembled(), FROM, |hash| submitted = Some(hash))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Broadcast(_)));
        assert_eq!(broadcaster.chain().sent().len(), 1);
        assert!(submitted.is_some());
    }

    #[tokio::test]
    async fn test_rejected_submission_is_not_reported() {
        let chain = FakeChain {
            fail_send: true,
            ..FakeChain::default()
        };
        let broadcaster = TransactionBroadcaster::new(chain, 10);
        let mut submitted = None;

        broadcaster
            .broadcast_with(&assembled(), FROM, |hash| submitted = Some(hash))
            .await
            .unwrap_err();
        assert_eq!(submitted, None);
    }
}
