//! Error taxonomy for the swap pipeline.
//!
//! Every stage returns a distinct variant so callers can tell a quote service
//! outage from a contract violation in the quote, or from an on-chain failure,
//! without inspecting log output.

use alloy_primitives::TxHash;

use crate::assemble::AssemblyError;

/// Boxed error used as the source of backend-specific failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by a [`QuoteSource`](crate::QuoteSource).
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// The quote service answered with a non-success status.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    Status {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },
    /// The request never produced a response.
    #[error("HTTP error: {context}: {source}")]
    Transport {
        /// Human-readable context.
        context: &'static str,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },
    /// The response is missing fields later stages depend on.
    #[error("{0}")]
    Malformed(String),
}

impl QuoteError {
    /// Creates a [`QuoteError::Malformed`] from any message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors produced by the swap and allowance flows.
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    /// The quote service could not be reached or answered with an error status.
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(#[source] QuoteError),
    /// The quote service answered but the body lacks required fields.
    #[error("Malformed quote: {0}")]
    MalformedQuote(String),
    /// The approval transaction reverted, failed simulation, or could not be sent.
    #[error("Approval failed: {0}")]
    ApprovalFailed(#[source] BoxError),
    /// Calldata or signature was missing when splicing.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    /// The structured-data signature could not be produced.
    #[error("Signing failed: {0}")]
    Signing(String),
    /// Nonce resolution, signing or submission of the transaction failed.
    #[error("Broadcast failed: {0}")]
    Broadcast(#[source] BoxError),
    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),
}

impl SwapError {
    /// Wraps any error as a [`SwapError::Broadcast`].
    pub fn broadcast(err: impl Into<BoxError>) -> Self {
        Self::Broadcast(err.into())
    }

    /// Wraps any error as a [`SwapError::ApprovalFailed`].
    pub fn approval(err: impl Into<BoxError>) -> Self {
        Self::ApprovalFailed(err.into())
    }
}

impl From<QuoteError> for SwapError {
    fn from(value: QuoteError) -> Self {
        match value {
            QuoteError::Malformed(message) => Self::MalformedQuote(message),
            QuoteError::Status { .. } | QuoteError::Transport { .. } => {
                Self::QuoteUnavailable(value)
            }
        }
    }
}
