//! A [`p2swap::QuoteSource`] that fetches prices and quotes from a remote
//! 0x-style swap API over HTTP.
//!
//! ## Error Handling
//!
//! Construction errors (bad base URL, invalid API key) are reported as
//! [`QuoteClientError`]. Request errors are reported as [`QuoteError`]:
//! - transport failures and non-success statuses are `Transport` / `Status`
//! - bodies that are not JSON or lack required fields are `Malformed`

use std::fmt::Display;
use std::time::Duration;

use p2swap::{OrderParams, PriceEstimate, QuoteError, QuoteResponse, QuoteSource};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

/// Public 0x Permit2 swap API.
pub const DEFAULT_BASE_URL: &str = "https://api.0x.org/swap/permit2/";

const API_KEY_HEADER: &str = "0x-api-key";
const API_VERSION_HEADER: &str = "0x-version";
const API_VERSION: &str = "2";

/// Errors that can occur while constructing a [`QuoteClient`].
#[derive(Debug, thiserror::Error)]
pub enum QuoteClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The API key cannot be sent as a header value.
    #[error("Invalid API key header value: {0}")]
    InvalidApiKey(#[source] InvalidHeaderValue),
}

/// A client for a remote swap quote service.
///
/// Every request carries `Content-Type: application/json`, `0x-version: 2`
/// and `0x-api-key`.
#[derive(Clone, Debug)]
pub struct QuoteClient {
    /// Base URL of the service (e.g. `https://api.0x.org/swap/permit2/`)
    base_url: Url,
    /// Full URL for `GET /price`
    price_url: Url,
    /// Full URL for `GET /quote`
    quote_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Headers sent with each request; the API key is marked sensitive
    headers: HeaderMap,
    /// Optional request timeout
    timeout: Option<Duration>,
}

impl QuoteClient {
    /// Constructs a new [`QuoteClient`] from a base URL and API key.
    ///
    /// `./price` and `./quote` are resolved against `base_url` once, here.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteClientError`] if URL construction fails or the API key
    /// contains characters not allowed in a header.
    pub fn try_new(base_url: Url, api_key: &str) -> Result<Self, QuoteClientError> {
        let price_url = base_url
            .join("./price")
            .map_err(|e| QuoteClientError::UrlParse {
                context: "Failed to construct ./price URL",
                source: e,
            })?;
        let quote_url = base_url
            .join("./quote")
            .map_err(|e| QuoteClientError::UrlParse {
                context: "Failed to construct ./quote URL",
                source: e,
            })?;

        let mut api_key = HeaderValue::from_str(api_key).map_err(QuoteClientError::InvalidApiKey)?;
        api_key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        Ok(Self {
            base_url,
            price_url,
            quote_url,
            client: Client::new(),
            headers,
            timeout: None,
        })
    }

    /// Constructs a client for the public API at [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`QuoteClientError`] if the API key is not a valid header value.
    pub fn public(api_key: &str) -> Result<Self, QuoteClientError> {
        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| QuoteClientError::UrlParse {
            context: "Failed to parse default base url",
            source: e,
        })?;
        Self::try_new(base_url, api_key)
    }

    /// Parses `base_url`, normalising it to a single trailing slash, and
    /// constructs a client.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteClientError`] if the URL does not parse or the API key
    /// is not a valid header value.
    pub fn from_base_str(base_url: &str, api_key: &str) -> Result<Self, QuoteClientError> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| QuoteClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url, api_key)
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the base URL used by this client.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./price` URL.
    pub const fn price_url(&self) -> &Url {
        &self.price_url
    }

    /// Returns the computed `./quote` URL.
    pub const fn quote_url(&self) -> &Url {
        &self.quote_url
    }

    /// Returns the configured timeout, if any.
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sends `GET /price` for `order`.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError`] on transport failure, non-success status or an
    /// unparseable body.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "p2swap.quote_client.price", skip_all, fields(chain_id = order.chain_id), err)
    )]
    pub async fn fetch_price(&self, order: &OrderParams) -> Result<PriceEstimate, QuoteError> {
        let context = "GET /price";
        let result = self.get_text(&self.price_url, context, order).await.and_then(|body| {
            serde_json::from_str::<PriceEstimate>(&body)
                .map_err(|e| QuoteError::malformed(format!("{context}: {e}")))
        });
        record_result_on_span(&result);
        result
    }

    /// Sends `GET /quote` for `order` and validates the response.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError`] on transport failure, non-success status, or a
    /// body lacking the transaction or Permit2 payload.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "p2swap.quote_client.quote", skip_all, fields(chain_id = order.chain_id), err)
    )]
    pub async fn fetch_quote(&self, order: &OrderParams) -> Result<QuoteResponse, QuoteError> {
        let context = "GET /quote";
        let result = self
            .get_text(&self.quote_url, context, order)
            .await
            .and_then(|body| QuoteResponse::from_json(&body));
        record_result_on_span(&result);
        result
    }

    /// Issues an authenticated GET with the order as query string and
    /// returns the body of a successful response.
    async fn get_text(
        &self,
        url: &Url,
        context: &'static str,
        order: &OrderParams,
    ) -> Result<String, QuoteError> {
        let mut url = url.clone();
        url.query_pairs_mut().extend_pairs(order.query_pairs());

        let mut req = self.client.get(url).headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req.send().await.map_err(|e| QuoteError::Transport {
            context,
            source: Box::new(e),
        })?;

        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .map_err(|e| QuoteError::Transport {
                context,
                source: Box::new(e),
            })?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(QuoteError::Status {
                context,
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl QuoteSource for QuoteClient {
    async fn price(&self, order: &OrderParams) -> Result<PriceEstimate, QuoteError> {
        self.fetch_price(order).await
    }

    async fn quote(&self, order: &OrderParams) -> Result<QuoteResponse, QuoteError> {
        self.fetch_quote(order).await
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to quote service failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
