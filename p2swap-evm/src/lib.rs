//! EVM side of Permit2-based swaps.
//!
//! Everything that touches a chain or a key lives here. The chain itself is
//! abstracted behind [`SwapChain`] so the flows can be exercised against an
//! in-memory chain; [`AlloyChain`] is the production backend.
//!
//! # Modules
//!
//! - [`contract`] - Solidity bindings for ERC-20 and the Permit2 structs
//! - [`chain`] - [`SwapChain`] trait and its alloy implementation
//! - [`signer`] - EIP-712 signing of the Permit2 payload returned with a quote
//! - [`broadcast`] - Nonce resolution and submission, serialized per account
//! - [`allowance`] - Permit2 allowance check and approval
//! - [`pipeline`] - The `approve` and `swap` flows

pub mod allowance;
pub mod broadcast;
pub mod chain;
pub mod contract;
pub mod pipeline;
pub mod signer;

#[cfg(test)]
mod testing;

pub use allowance::{AllowanceManager, ApprovalOutcome};
pub use broadcast::TransactionBroadcaster;
pub use chain::{AlloyChain, ChainError, Receipt, SwapChain};
pub use pipeline::{SwapAttempt, SwapPipeline, SwapReport};
pub use signer::{PermitSigner, PermitKey};
