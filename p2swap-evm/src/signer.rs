//! EIP-712 signing of the Permit2 payload returned with a quote.
//!
//! The payload is hashed dynamically from the JSON the quote service sent, so
//! whatever domain and message it chose are signed exactly as received. Only
//! the type set is narrowed: the signature covers `PermitTransferFrom` and
//! `TokenPermissions` and nothing else, even if the service sends more types.

use std::future::Future;
use std::sync::Arc;

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, Signature};
use alloy_signer_local::PrivateKeySigner;
use p2swap::SwapError;
use p2swap::quote::{Eip712Payload, PERMIT_TRANSFER_FROM_TYPE, TOKEN_PERMISSIONS_TYPE};
use serde_json::{Map, json};

/// The account key that authorizes Permit2 transfers.
///
/// A Permit2 signature is a plain secp256k1 signature over the EIP-712
/// digest, so the key only has to name its account and sign a 32-byte
/// digest. Implemented for [`PrivateKeySigner`] and for `Arc` of any key,
/// which lets the binary hand the same key to the wallet and the pipeline.
pub trait PermitKey: Send + Sync {
    /// Account that owns the tokens being permitted.
    fn account(&self) -> Address;

    /// Signs an EIP-712 signing digest.
    fn sign_digest(
        &self,
        digest: B256,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl PermitKey for PrivateKeySigner {
    fn account(&self) -> Address {
        self.address()
    }

    async fn sign_digest(&self, digest: B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, &digest).await
    }
}

impl<T: PermitKey> PermitKey for Arc<T> {
    fn account(&self) -> Address {
        (**self).account()
    }

    fn sign_digest(
        &self,
        digest: B256,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send {
        (**self).sign_digest(digest)
    }
}

/// Signs Permit2 `PermitTransferFrom` payloads with the account key.
#[derive(Debug, Clone)]
pub struct PermitSigner<S> {
    signer: S,
}

impl<S: PermitKey> PermitSigner<S> {
    /// Wraps `signer`.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }

    /// Address of the signing account.
    pub fn address(&self) -> Address {
        self.signer.account()
    }

    /// Signs `payload`. The result is 65 bytes `r ‖ s ‖ v` with `v` in {27, 28}
    /// when serialized with [`Signature::as_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Signing`] if the payload lacks the Permit2 types,
    /// cannot be encoded, or the key refuses to sign.
    pub async fn sign(&self, payload: &Eip712Payload) -> Result<Signature, SwapError> {
        let hash = signing_hash(payload)?;
        self.signer
            .sign_digest(hash)
            .await
            .map_err(|e| SwapError::Signing(e.to_string()))
    }
}

/// Builds typed data from `payload` with its type set narrowed to the two
/// Permit2 structs and `PermitTransferFrom` as primary type.
///
/// # Errors
///
/// Returns [`SwapError::Signing`] if a Permit2 type is missing or the result
/// is not valid typed data.
pub fn permit_typed_data(payload: &Eip712Payload) -> Result<TypedData, SwapError> {
    let mut types = Map::new();
    for name in [TOKEN_PERMISSIONS_TYPE, PERMIT_TRANSFER_FROM_TYPE] {
        let definition = payload
            .types
            .get(name)
            .ok_or_else(|| SwapError::Signing(format!("EIP-712 types lack `{name}`")))?;
        types.insert(name.to_owned(), definition.clone());
    }

    let typed = json!({
        "types": types,
        "primaryType": PERMIT_TRANSFER_FROM_TYPE,
        "domain": payload.domain,
        "message": payload.message,
    });
    serde_json::from_value(typed).map_err(|e| SwapError::Signing(format!("invalid typed data: {e}")))
}

/// EIP-712 signing hash of the narrowed Permit2 payload.
///
/// # Errors
///
/// Returns [`SwapError::Signing`] if the payload cannot be encoded.
pub fn signing_hash(payload: &Eip712Payload) -> Result<B256, SwapError> {
    permit_typed_data(payload)?
        .eip712_signing_hash()
        .map_err(|e| SwapError::Signing(format!("EIP-712 encoding failed: {e}")))
}
