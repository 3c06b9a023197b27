//! In-memory chain and quote service for flow tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::{Address, B256, Bytes, TxHash, U256, address, keccak256};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolCall, SolValue};
use p2swap::{
    Eip712Payload, OrderParams, PriceEstimate, QuoteError, QuoteResponse, QuoteSource,
};
use serde_json::json;

use crate::chain::{Receipt, SwapChain};
use crate::contract::IERC20;

/// First anvil development key.
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const USDC: Address = address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85");
pub const MPETH: Address = address!("819845b60a192167ed1139040b4f8eca31834f27");
pub const SETTLER: Address = address!("0000000000001fF3684f28c67538d4D072C22734");

pub fn test_signer() -> PrivateKeySigner {
    TEST_KEY.parse().unwrap()
}

pub fn eip712_payload() -> Eip712Payload {
    serde_json::from_value(json!({
        "types": {
            "TokenPermissions": [
                { "name": "token", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ],
            "PermitTransferFrom": [
                { "name": "permitted", "type": "TokenPermissions" },
                { "name": "spender", "type": "address" },
                { "name": "nonce", "type": "uint256" },
                { "name": "deadline", "type": "uint256" }
            ]
        },
        "domain": {
            "name": "Permit2",
            "chainId": 10,
            "verifyingContract": "0x000000000022d473030f116ddee9f6b43ac78ba3"
        },
        "message": {
            "permitted": {
                "token": "0x0b2c639c533813f4aa9d7837caf62653d097ff85",
                "amount": "1000000"
            },
            "spender": "0x0000000000001ff3684f28c67538d4d072c22734",
            "nonce": "2241959297937691820908574931991575",
            "deadline": "1733777513"
        },
        "primaryType": "PermitTransferFrom"
    }))
    .unwrap()
}

pub fn quote_response(data: &[u8]) -> QuoteResponse {
    let body = json!({
        "buyAmount": "262514906474836",
        "sellAmount": "1000000",
        "liquidityAvailable": true,
        "permit2": { "eip712": serde_json::to_value(eip712_payload()).unwrap() },
        "transaction": {
            "to": SETTLER,
            "data": Bytes::copy_from_slice(data),
            "gas": "288079",
            "gasPrice": "4837860000",
            "value": "0"
        }
    });
    QuoteResponse::from_json(&body.to_string()).unwrap()
}

pub fn order(taker: Address) -> OrderParams {
    OrderParams::new(10, USDC, MPETH, U256::from(1_000_000u64), taker)
}

#[derive(Debug, thiserror::Error)]
#[error("fake chain: {0}")]
pub struct FakeChainError(pub &'static str);

/// A chain that records every request and answers from fixed values.
///
/// A submitted `approve(spender, amount)` sets the allowance to `amount`, so
/// a second allowance check sees the approval.
#[derive(Debug)]
pub struct FakeChain {
    pub allowance: Mutex<U256>,
    pub balance: U256,
    pub call_result: Result<Bytes, &'static str>,
    pub receipt_status: bool,
    pub fail_send: bool,
    pub fail_wait: bool,
    pub calls: Mutex<Vec<TransactionRequest>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub receipts: Mutex<HashMap<TxHash, Receipt>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            allowance: Mutex::new(U256::ZERO),
            balance: U256::ZERO,
            call_result: Ok(true.abi_encode().into()),
            receipt_status: true,
            fail_send: false,
            fail_wait: false,
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeChain {
    pub fn with_allowance(allowance: U256) -> Self {
        Self {
            allowance: Mutex::new(allowance),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SwapChain for FakeChain {
    type Error = FakeChainError;

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, FakeChainError> {
        Ok(*self.allowance.lock().unwrap())
    }

    async fn balance_of(&self, _token: Address, _account: Address) -> Result<U256, FakeChainError> {
        Ok(self.balance)
    }

    async fn transaction_count(&self, _account: Address) -> Result<u64, FakeChainError> {
        Ok(self.sent.lock().unwrap().len() as u64)
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, FakeChainError> {
        self.calls.lock().unwrap().push(tx);
        self.call_result.clone().map_err(FakeChainError)
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, FakeChainError> {
        // Let a concurrent flow run between nonce lookup and submission.
        tokio::task::yield_now().await;
        if self.fail_send {
            return Err(FakeChainError("send rejected"));
        }
        let input = tx.input.input().cloned().unwrap_or_default();
        let nonce = tx.nonce.unwrap_or_default();
        let hash: TxHash = keccak256([input.as_ref(), &nonce.to_be_bytes()].concat());

        if let (true, Ok(approve)) = (self.receipt_status, IERC20::approveCall::abi_decode(&input)) {
            *self.allowance.lock().unwrap() = approve.amount;
        }

        self.receipts.lock().unwrap().insert(
            hash,
            Receipt {
                transaction_hash: hash,
                status: self.receipt_status,
                block_number: Some(100 + nonce),
                block_hash: Some(B256::repeat_byte(0x11)),
            },
        );
        self.sent.lock().unwrap().push(tx);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, FakeChainError> {
        if self.fail_wait {
            return Err(FakeChainError("receipt timed out"));
        }
        self.receipts
            .lock()
            .unwrap()
            .get(&hash)
            .copied()
            .ok_or(FakeChainError("unknown transaction"))
    }
}

pub enum QuoteReply {
    Quote(QuoteResponse),
    Status(u16),
}

/// A quote service answering with a fixed reply and counting requests.
pub struct FakeQuotes {
    pub reply: QuoteReply,
    pub price_requests: AtomicUsize,
    pub quote_requests: AtomicUsize,
}

impl FakeQuotes {
    pub const fn new(reply: QuoteReply) -> Self {
        Self {
            reply,
            price_requests: AtomicUsize::new(0),
            quote_requests: AtomicUsize::new(0),
        }
    }

    fn status_error(&self, context: &'static str) -> Option<QuoteError> {
        match self.reply {
            QuoteReply::Status(status) => Some(QuoteError::Status {
                context,
                status,
                body: "unavailable".to_owned(),
            }),
            QuoteReply::Quote(_) => None,
        }
    }
}

impl QuoteSource for FakeQuotes {
    async fn price(&self, _order: &OrderParams) -> Result<PriceEstimate, QuoteError> {
        self.price_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.status_error("GET /price") {
            return Err(err);
        }
        Ok(PriceEstimate {
            buy_amount: Some("262514906474836".to_owned()),
            sell_amount: Some("1000000".to_owned()),
            liquidity_available: Some(true),
            issues: None,
        })
    }

    async fn quote(&self, _order: &OrderParams) -> Result<QuoteResponse, QuoteError> {
        self.quote_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.status_error("GET /quote") {
            return Err(err);
        }
        match &self.reply {
            QuoteReply::Quote(quote) => Ok(quote.clone()),
            QuoteReply::Status(_) => unreachable!(),
        }
    }
}
