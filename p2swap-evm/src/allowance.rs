//! Permit2 allowance check and approval.

use std::sync::Arc;

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, U256};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use p2swap::{AssembledTransaction, SwapError};

use crate::broadcast::TransactionBroadcaster;
use crate::chain::{Receipt, SwapChain};
use crate::contract::IERC20;

/// Result of [`AllowanceManager::ensure_allowance`].
///
/// Approval problems are reported here rather than as an `Err`: a failed
/// approval does not stop the caller, it only tells it the swap may revert.
#[derive(Debug)]
pub enum ApprovalOutcome {
    /// The allowance already covered the required amount. Nothing was sent.
    AlreadySufficient {
        /// Allowance read from the token.
        allowance: U256,
    },
    /// An approval for the required amount was mined.
    Approved(Receipt),
    /// The allowance could not be read, or the approval failed.
    ApprovalFailed(SwapError),
}

impl ApprovalOutcome {
    /// Whether the spender is known to be approved for the required amount.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::AlreadySufficient { .. } | Self::Approved(_))
    }
}

/// Makes sure a spender may move at least a given amount of the sell token.
#[derive(Debug)]
pub struct AllowanceManager<C> {
    broadcaster: Arc<TransactionBroadcaster<C>>,
}

impl<C> Clone for AllowanceManager<C> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: Arc::clone(&self.broadcaster),
        }
    }
}

impl<C: SwapChain> AllowanceManager<C> {
    /// Creates a manager that sends approvals through `broadcaster`.
    pub const fn new(broadcaster: Arc<TransactionBroadcaster<C>>) -> Self {
        Self { broadcaster }
    }

    /// Reads the allowance of `spender` over `owner`'s `token` and, if it is
    /// below `required`, approves exactly `required`.
    ///
    /// The approval is simulated with `eth_call` first; a reverting or
    /// `false` simulation is reported without sending anything.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> ApprovalOutcome {
        let chain = self.broadcaster.chain();
        let allowance = match chain.allowance(token, owner, spender).await {
            Ok(allowance) => allowance,
            Err(e) => {
                tracing::error!(%token, %owner, %spender, error = %e, "failed to read allowance");
                return ApprovalOutcome::ApprovalFailed(SwapError::approval(e));
            }
        };

        if allowance >= required {
            tracing::info!(%token, %spender, %allowance, "already approved");
            return ApprovalOutcome::AlreadySufficient { allowance };
        }

        tracing::info!(%token, %spender, %allowance, %required, "approving spender");
        match self.approve(token, owner, spender, required).await {
            Ok(receipt) => {
                tracing::info!(tx = %receipt.transaction_hash, "approval confirmed");
                ApprovalOutcome::Approved(receipt)
            }
            Err(e) => {
                tracing::error!(%token, %spender, error = %e, "approval failed");
                ApprovalOutcome::ApprovalFailed(e)
            }
        }
    }

    async fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Receipt, SwapError> {
        let call = IERC20::approveCall { spender, amount };
        let data = call.abi_encode();

        let simulation = TransactionRequest::default()
            .with_from(owner)
            .with_to(token)
            .with_input(data.clone());
        let output = self
            .broadcaster
            .chain()
            .call(simulation)
            .await
            .map_err(SwapError::approval)?;
        let approved =
            IERC20::approveCall::abi_decode_returns(&output).map_err(SwapError::approval)?;
        if !approved {
            return Err(SwapError::approval("approve simulation returned false"));
        }

        let tx = AssembledTransaction {
            to: token,
            data: data.into(),
            value: None,
            gas: None,
            gas_price: None,
            nonce: None,
        };
        self.broadcaster
            .broadcast(&tx, owner)
            .await
            .map_err(|e| match e {
                SwapError::TransactionReverted(hash) => {
                    SwapError::approval(format!("approval transaction {hash} reverted"))
                }
                other => SwapError::approval(other),
            })
    }
}
