#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for Permit2-based token swaps.
//!
//! A swap is executed by asking an off-chain quote service for a ready-made
//! transaction, signing the Permit2 transfer authorization the service returns,
//! splicing that signature into the transaction calldata and broadcasting the
//! result. This crate holds the chain-agnostic pieces of that pipeline; the
//! HTTP transport lives in `p2swap-http` and the EVM side in `p2swap-evm`.
//!
//! # Modules
//!
//! - [`order`] - Order parameters that uniquely determine a quote request
//! - [`quote`] - Quote and price wire types plus the [`QuoteSource`] trait
//! - [`assemble`] - Signature splicing into quote calldata
//! - [`config`] - Immutable per-run configuration
//! - [`state`] - Per-attempt swap state machine
//! - [`error`] - Error taxonomy shared by every stage

pub mod assemble;
pub mod config;
pub mod error;
pub mod order;
pub mod quote;
pub mod state;

pub use assemble::{AssembledTransaction, AssemblyError, assemble};
pub use config::{PERMIT2_ADDRESS, SwapConfig};
pub use error::{BoxError, QuoteError, SwapError};
pub use order::OrderParams;
pub use quote::{Eip712Payload, PriceEstimate, QuoteResponse, QuoteSource, QuoteTransaction};
pub use state::SwapState;
