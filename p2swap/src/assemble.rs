//! Signature splicing into quote calldata.
//!
//! The settlement contract behind the quote reads the Permit2 signature from
//! the tail of its calldata: a 32-byte big-endian length word followed by the
//! signature bytes. Any other layout reverts on-chain, so the layout is
//! produced in exactly one place.

use alloy_primitives::{Address, Bytes, U256};

use crate::quote::QuoteTransaction;

/// Errors from [`assemble`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    /// The quote transaction carried no calldata.
    #[error("Quote transaction has no calldata")]
    MissingCalldata,
    /// The Permit2 signature is empty.
    #[error("Permit2 signature is empty")]
    MissingSignature,
}

/// Appends `signature` to `base_data`, prefixed by its byte length as a
/// 32-byte big-endian word.
///
/// `result = base_data ‖ uint256(len(signature)) ‖ signature`
///
/// # Errors
///
/// Returns [`AssemblyError`] if either input is empty.
pub fn assemble(base_data: &[u8], signature: &[u8]) -> Result<Bytes, AssemblyError> {
    if base_data.is_empty() {
        return Err(AssemblyError::MissingCalldata);
    }
    if signature.is_empty() {
        return Err(AssemblyError::MissingSignature);
    }
    let length_word = U256::from(signature.len()).to_be_bytes::<32>();
    let mut data = Vec::with_capacity(base_data.len() + length_word.len() + signature.len());
    data.extend_from_slice(base_data);
    data.extend_from_slice(&length_word);
    data.extend_from_slice(signature);
    Ok(data.into())
}

/// A quote transaction with the signature spliced into its calldata.
///
/// Numeric fields keep the full 256-bit width the quote service may use;
/// narrowing to wire widths happens when the transaction is broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTransaction {
    /// Contract receiving the call.
    pub to: Address,
    /// Quoted calldata followed by the length-prefixed signature.
    pub data: Bytes,
    /// Native value to attach, if the quote set one.
    pub value: Option<U256>,
    /// Gas limit, if the quote set one.
    pub gas: Option<U256>,
    /// Legacy gas price, if the quote set one.
    pub gas_price: Option<U256>,
    /// Account nonce, filled in right before signing.
    pub nonce: Option<u64>,
}

impl AssembledTransaction {
    /// Splices `signature` into the calldata of a quoted transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] if the quote calldata or the signature is empty.
    pub fn from_quote(tx: &QuoteTransaction, signature: &[u8]) -> Result<Self, AssemblyError> {
        Ok(Self {
            to: tx.to,
            data: assemble(&tx.data, signature)?,
            value: tx.value,
            gas: tx.gas,
            gas_price: tx.gas_price,
            nonce: None,
        })
    }

    /// Sets the nonce.
    #[must_use]
    pub const fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}
