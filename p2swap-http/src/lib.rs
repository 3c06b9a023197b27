//! HTTP transport for Permit2 swap quote services.
//!
//! [`QuoteClient`] talks to a 0x-compatible `/price` and `/quote` API and
//! implements [`p2swap::QuoteSource`] so the swap pipeline can use it
//! directly.
//!
//! # Features
//!
//! - `telemetry`: request spans and result events via `tracing`

pub mod client;

pub use client::{DEFAULT_BASE_URL, QuoteClient, QuoteClientError};
