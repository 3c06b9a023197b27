//! Quote and price wire types.
//!
//! The quote service returns a ready-to-send transaction together with the
//! EIP-712 payload that must be signed for Permit2. Later stages assume both
//! exist, so [`QuoteResponse::from_json`] rejects a body that lacks either
//! instead of letting a missing field surface as a panic or a reverted
//! transaction further down.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::QuoteError;
use crate::order::OrderParams;

/// Name of the Permit2 token permissions struct in the EIP-712 type set.
pub const TOKEN_PERMISSIONS_TYPE: &str = "TokenPermissions";

/// Name of the Permit2 primary struct in the EIP-712 type set.
pub const PERMIT_TRANSFER_FROM_TYPE: &str = "PermitTransferFrom";

/// A source of quotes and indicative prices.
///
/// Implemented over HTTP by `p2swap-http`; tests substitute in-memory fakes.
pub trait QuoteSource: Send + Sync {
    /// Fetches an indicative price for `order`.
    fn price(
        &self,
        order: &OrderParams,
    ) -> impl Future<Output = Result<PriceEstimate, QuoteError>> + Send;

    /// Fetches a firm quote, including the transaction and Permit2 payload.
    fn quote(
        &self,
        order: &OrderParams,
    ) -> impl Future<Output = Result<QuoteResponse, QuoteError>> + Send;
}

impl<T: QuoteSource> QuoteSource for Arc<T> {
    fn price(
        &self,
        order: &OrderParams,
    ) -> impl Future<Output = Result<PriceEstimate, QuoteError>> + Send {
        (**self).price(order)
    }

    fn quote(
        &self,
        order: &OrderParams,
    ) -> impl Future<Output = Result<QuoteResponse, QuoteError>> + Send {
        (**self).quote(order)
    }
}

/// Transaction the quote service prepared for the taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteTransaction {
    /// Settlement contract to call.
    pub to: Address,
    /// Calldata without the Permit2 signature. Empty if the service sent none.
    pub data: Bytes,
    /// Native value, present only if the service sent a non-falsy value.
    pub value: Option<U256>,
    /// Gas limit, present only if the service sent a non-falsy value.
    pub gas: Option<U256>,
    /// Gas price, present only if the service sent a non-falsy value.
    pub gas_price: Option<U256>,
}

/// The EIP-712 payload the Permit2 signature is computed over.
///
/// Kept as JSON so it can be signed exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Payload {
    /// EIP-712 domain object.
    pub domain: Value,
    /// Type definitions keyed by struct name.
    pub types: Map<String, Value>,
    /// Message values.
    pub message: Value,
    /// Primary type, when the service names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
}

impl Eip712Payload {
    fn validate(value: Value) -> Result<Self, QuoteError> {
        let payload: Self = serde_json::from_value(value)
            .map_err(|e| QuoteError::malformed(format!("invalid `permit2.eip712`: {e}")))?;
        if !payload.domain.is_object() {
            return Err(QuoteError::malformed("`permit2.eip712.domain` is not an object"));
        }
        if !payload.message.is_object() {
            return Err(QuoteError::malformed("`permit2.eip712.message` is not an object"));
        }
        for required in [TOKEN_PERMISSIONS_TYPE, PERMIT_TRANSFER_FROM_TYPE] {
            if !payload.types.contains_key(required) {
                return Err(QuoteError::malformed(format!(
                    "`permit2.eip712.types` lacks `{required}`"
                )));
            }
        }
        Ok(payload)
    }
}

/// A firm quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResponse {
    /// Transaction to sign and broadcast after splicing the signature.
    pub transaction: QuoteTransaction,
    /// Permit2 EIP-712 payload to sign.
    pub eip712: Eip712Payload,
    /// Amount of the buy token the taker receives.
    pub buy_amount: Option<U256>,
    /// Amount of the sell token the taker spends.
    pub sell_amount: Option<U256>,
    /// Minimum buy amount after slippage.
    pub min_buy_amount: Option<U256>,
    /// Whether the service found liquidity for the order.
    pub liquidity_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    transaction: Option<RawTransaction>,
    permit2: Option<RawPermit2>,
    buy_amount: Option<String>,
    sell_amount: Option<String>,
    min_buy_amount: Option<String>,
    liquidity_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    to: Option<Value>,
    data: Option<Value>,
    value: Option<Box<RawValue>>,
    gas: Option<Box<RawValue>>,
    gas_price: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
struct RawPermit2 {
    eip712: Option<Value>,
}

impl QuoteResponse {
    /// Parses and validates a `/quote` response body.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::Malformed`] if the body is not JSON, lacks
    /// `transaction` (or its `to`), lacks `permit2.eip712`, or if a
    /// transaction field has the wrong shape. The message names the field.
    pub fn from_json(body: &str) -> Result<Self, QuoteError> {
        let raw: RawQuote = serde_json::from_str(body)
            .map_err(|e| QuoteError::malformed(format!("quote body is not valid JSON: {e}")))?;
        raw.try_into()
    }
}

impl TryFrom<RawQuote> for QuoteResponse {
    type Error = QuoteError;

    fn try_from(raw: RawQuote) -> Result<Self, Self::Error> {
        let tx = raw
            .transaction
            .ok_or_else(|| QuoteError::malformed("quote lacks `transaction`"))?;
        let eip712 = raw
            .permit2
            .and_then(|p| p.eip712)
            .ok_or_else(|| QuoteError::malformed("quote lacks `permit2.eip712`"))?;

        let transaction = QuoteTransaction {
            to: recipient(tx.to.as_ref())?,
            data: calldata(tx.data.as_ref())?,
            value: non_falsy_amount("transaction.value", tx.value.as_deref())?,
            gas: non_falsy_amount("transaction.gas", tx.gas.as_deref())?,
            gas_price: non_falsy_amount("transaction.gasPrice", tx.gas_price.as_deref())?,
        };

        Ok(Self {
            transaction,
            eip712: Eip712Payload::validate(eip712)?,
            buy_amount: lenient_amount(raw.buy_amount.as_deref()),
            sell_amount: lenient_amount(raw.sell_amount.as_deref()),
            min_buy_amount: lenient_amount(raw.min_buy_amount.as_deref()),
            liquidity_available: raw.liquidity_available,
        })
    }
}

fn recipient(value: Option<&Value>) -> Result<Address, QuoteError> {
    match value {
        None | Some(Value::Null) => Err(QuoteError::malformed("quote lacks `transaction.to`")),
        Some(Value::String(s)) => Address::from_str(s).map_err(|e| {
            QuoteError::malformed(format!("`transaction.to` is not an address: {e}"))
        }),
        Some(other) => Err(QuoteError::malformed(format!(
            "`transaction.to` is not an address: {other}"
        ))),
    }
}

/// Missing calldata parses as empty; assembly rejects it later.
fn calldata(value: Option<&Value>) -> Result<Bytes, QuoteError> {
    match value {
        None | Some(Value::Null) => Ok(Bytes::new()),
        Some(Value::String(s)) => Bytes::from_str(s).map_err(|e| {
            QuoteError::malformed(format!("`transaction.data` is not hex: {e}"))
        }),
        Some(other) => Err(QuoteError::malformed(format!(
            "`transaction.data` is not hex: {other}"
        ))),
    }
}

/// Reads an optional transaction amount from its raw JSON text.
///
/// Absent, `null`, `false`, `""` and numeric `0` are treated as "not set".
/// The string `"0"` is a value and yields `Some(0)`. Integer literals are
/// read from the text directly so values past `u64::MAX` keep every digit.
fn non_falsy_amount(field: &str, value: Option<&RawValue>) -> Result<Option<U256>, QuoteError> {
    let invalid = || QuoteError::malformed(format!("`{field}` is not an unsigned integer"));
    let Some(raw) = value else {
        return Ok(None);
    };
    let text = raw.get().trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let amount = U256::from_str(text).map_err(|_| invalid())?;
        return Ok((!amount.is_zero()).then_some(amount));
    }
    match serde_json::from_str::<Value>(text).map_err(|_| invalid())? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => U256::from_str(&s).map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn lenient_amount(value: Option<&str>) -> Option<U256> {
    value.and_then(|s| U256::from_str(s).ok())
}

/// Indicative price returned by the `/price` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    /// Amount of the buy token, as a decimal string.
    #[serde(default)]
    pub buy_amount: Option<String>,
    /// Amount of the sell token, as a decimal string.
    #[serde(default)]
    pub sell_amount: Option<String>,
    /// Whether the service found liquidity for the order.
    #[serde(default)]
    pub liquidity_available: Option<bool>,
    /// Problems the service detected with the order.
    #[serde(default)]
    pub issues: Option<PriceIssues>,
}

impl PriceEstimate {
    /// The allowance the service observed for the Permit2 spender, if it
    /// reported one as insufficient.
    #[must_use]
    pub fn reported_allowance(&self) -> Option<U256> {
        self.issues
            .as_ref()?
            .allowance
            .as_ref()
            .and_then(|a| U256::from_str(&a.actual).ok())
    }
}

/// Issues section of a price response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceIssues {
    /// Present when the taker's allowance is too low.
    #[serde(default)]
    pub allowance: Option<AllowanceIssue>,
}

/// Allowance shortfall reported by the quote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceIssue {
    /// Current allowance, as a decimal string.
    pub actual: String,
    /// Spender the allowance was checked against.
    pub spender: Address,
}
