//! The `approve` and `swap` flows.
//!
//! Both flows share the same stages: quote, sign, assemble, broadcast.
//! `approve` only needs the price endpoint and the allowance check; `swap`
//! walks the full chain of stages and tracks a [`SwapState`] for the attempt.

use std::sync::Arc;

use alloy_primitives::{Address, Signature, U256};
use p2swap::{
    AssembledTransaction, OrderParams, PriceEstimate, QuoteResponse, QuoteSource, SwapConfig,
    SwapError, SwapState,
};
use url::Url;

use crate::allowance::{AllowanceManager, ApprovalOutcome};
use crate::broadcast::TransactionBroadcaster;
use crate::chain::{Receipt, SwapChain};
use crate::signer::{PermitSigner, PermitKey};

/// Result of a successful swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReport {
    /// Receipt of the mined swap transaction.
    pub receipt: Receipt,
    /// Final state of the attempt.
    pub state: SwapState,
    /// Link to the transaction on the configured block explorer.
    pub explorer_url: Option<Url>,
}

/// Everything known about one swap attempt, successful or not.
#[derive(Debug)]
pub struct SwapAttempt {
    /// Terminal state: [`SwapState::Confirmed`] or [`SwapState::Failed`].
    pub state: SwapState,
    /// Last state reached before the failure. [`SwapState::Broadcast`] means
    /// the transaction was submitted and may still be mined.
    pub failed_at: Option<SwapState>,
    /// The report or the error of the stage that failed.
    pub outcome: Result<SwapReport, SwapError>,
}

/// Composes a quote source, a signer and a chain into the swap flows.
#[derive(Debug)]
pub struct SwapPipeline<Q, C, S> {
    config: SwapConfig,
    quotes: Q,
    signer: PermitSigner<S>,
    broadcaster: Arc<TransactionBroadcaster<C>>,
    allowances: AllowanceManager<C>,
}

impl<Q, C, S> SwapPipeline<Q, C, S>
where
    Q: QuoteSource,
    C: SwapChain,
    S: PermitKey,
{
    /// Creates a pipeline for `config.account` on `config.chain_id`.
    pub fn new(config: SwapConfig, quotes: Q, chain: C, signer: S) -> Self {
        let broadcaster = Arc::new(TransactionBroadcaster::new(chain, config.chain_id));
        Self {
            allowances: AllowanceManager::new(Arc::clone(&broadcaster)),
            config,
            quotes,
            signer: PermitSigner::new(signer),
            broadcaster,
        }
    }

    /// The configuration this pipeline was built with.
    pub const fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Sell-token balance of the configured account.
    ///
    /// # Errors
    ///
    /// Returns the chain error if the balance cannot be read.
    pub async fn balance(&self, token: Address) -> Result<U256, C::Error> {
        self.broadcaster
            .chain()
            .balance_of(token, self.config.account)
            .await
    }

    /// Probes the price for `order`, then makes sure Permit2 may spend
    /// `order.sell_amount` of the sell token.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::QuoteUnavailable`] or [`SwapError::MalformedQuote`]
    /// if the price cannot be fetched. Approval problems are never returned
    /// as an error; they are reported in the [`ApprovalOutcome`].
    pub async fn approve(&self, order: &OrderParams) -> Result<ApprovalOutcome, SwapError> {
        let price = self.price(order).await?;
        if let Some(allowance) = price.reported_allowance() {
            tracing::info!(%allowance, "quote service reports insufficient allowance");
        }

        let outcome = self
            .allowances
            .ensure_allowance(
                order.sell_token,
                order.taker,
                self.config.permit2,
                order.sell_amount,
            )
            .await;
        if let ApprovalOutcome::ApprovalFailed(err) = &outcome {
            tracing::warn!(error = %err, "continuing without approval");
        }
        Ok(outcome)
    }

    /// Runs a swap for `order`: quote, sign the Permit2 payload, splice the
    /// signature into the calldata and broadcast.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed. Nothing is retried.
    pub async fn swap(&self, order: &OrderParams) -> Result<SwapReport, SwapError> {
        self.attempt(order).await.outcome
    }

    /// Runs a swap like [`Self::swap`] and also reports the state the
    /// attempt reached.
    pub async fn attempt(&self, order: &OrderParams) -> SwapAttempt {
        let mut state = SwapState::Idle;
        match self.run_swap(order, &mut state).await {
            Ok(receipt) => {
                advance(&mut state, SwapState::Confirmed);
                let explorer_url = self.config.explorer_tx_url(&receipt.transaction_hash);
                match &explorer_url {
                    Some(url) => {
                        tracing::info!(tx = %receipt.transaction_hash, %url, "swap confirmed");
                    }
                    None => tracing::info!(tx = %receipt.transaction_hash, "swap confirmed"),
                }
                SwapAttempt {
                    state,
                    failed_at: None,
                    outcome: Ok(SwapReport {
                        receipt,
                        state,
                        explorer_url,
                    }),
                }
            }
            Err(err) => {
                let failed_at = state;
                advance(&mut state, SwapState::Failed);
                if failed_at == SwapState::Broadcast {
                    tracing::error!(%failed_at, error = %err, "swap failed after submission");
                } else {
                    tracing::error!(%failed_at, error = %err, "swap failed");
                }
                SwapAttempt {
                    state,
                    failed_at: Some(failed_at),
                    outcome: Err(err),
                }
            }
        }
    }

    async fn run_swap(
        &self,
        order: &OrderParams,
        state: &mut SwapState,
    ) -> Result<Receipt, SwapError> {
        let quote = self.quote(order).await?;
        advance(state, SwapState::QuoteFetched);

        let signature = self.sign(&quote).await?;
        advance(state, SwapState::Signed);

        let assembled = AssembledTransaction::from_quote(&quote.transaction, &signature.as_bytes())?;
        advance(state, SwapState::Assembled);

        self.broadcaster
            .broadcast_with(&assembled, order.taker, |_| {
                advance(state, SwapState::Broadcast);
            })
            .await
    }

    /// Fetches the indicative price for `order`.
    ///
    /// # Errors
    ///
    /// Returns the quote source error, converted to a [`SwapError`].
    pub async fn price(&self, order: &OrderParams) -> Result<PriceEstimate, SwapError> {
        let price = self.quotes.price(order).await?;
        tracing::info!(
            buy_amount = price.buy_amount.as_deref().unwrap_or("?"),
            sell_amount = price.sell_amount.as_deref().unwrap_or("?"),
            liquidity = ?price.liquidity_available,
            "price estimate"
        );
        Ok(price)
    }

    /// Fetches a firm quote for `order`.
    ///
    /// # Errors
    ///
    /// Returns the quote source error, converted to a [`SwapError`].
    pub async fn quote(&self, order: &OrderParams) -> Result<QuoteResponse, SwapError> {
        let quote = self.quotes.quote(order).await?;
        tracing::info!(
            to = %quote.transaction.to,
            buy_amount = ?quote.buy_amount,
            min_buy_amount = ?quote.min_buy_amount,
            liquidity = ?quote.liquidity_available,
            "quote received"
        );
        Ok(quote)
    }

    /// Signs the Permit2 payload of `quote`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Signing`] if the payload cannot be signed.
    pub async fn sign(&self, quote: &QuoteResponse) -> Result<Signature, SwapError> {
        self.signer.sign(&quote.eip712).await
    }
}

fn advance(state: &mut SwapState, to: SwapState) {
    debug_assert!(state.can_advance_to(to), "illegal transition {state} -> {to}");
    *state = to;
}
