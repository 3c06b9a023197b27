//! CLI configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! chain_id = 10
//! rpc_url = "$RPC_URL"
//! private_key = "$PRIVATE_KEY"
//!
//! [quote]
//! api_key = "$API_KEY_0x"
//!
//! [order]
//! sell_token = "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"
//! buy_token = "0x819845b60a192167ed1139040b4f8eca31834f27"
//! sell_amount = "1000000"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use p2swap::PERMIT2_ADDRESS;
use serde::Deserialize;
use url::Url;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// HTTP RPC endpoint.
    pub rpc_url: String,
    /// Hex private key of the trading account.
    pub private_key: Secret,
    /// Permit2 contract (default: canonical deployment).
    #[serde(default = "default_permit2")]
    pub permit2: Address,
    /// Block explorer base URL (default: well-known explorer for the chain).
    #[serde(default)]
    pub explorer_url: Option<Url>,
    /// Confirmations to wait for (default: 1).
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Seconds to wait for a receipt (default: wait indefinitely).
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
    /// Quote service settings.
    pub quote: QuoteConfig,
    /// The order to quote and execute.
    pub order: OrderConfig,
}

/// Quote service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    /// Base URL of the swap API.
    #[serde(default = "default_quote_base_url")]
    pub base_url: String,
    /// API key sent as `0x-api-key`.
    pub api_key: Secret,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Order section.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
    /// Token to sell.
    pub sell_token: Address,
    /// Token to buy.
    pub buy_token: Address,
    /// Amount of `sell_token`, smallest unit, as a decimal string.
    pub sell_amount: String,
}

impl OrderConfig {
    /// Parses [`Self::sell_amount`].
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not an unsigned integer.
    pub fn sell_amount(&self) -> Result<U256, Box<dyn std::error::Error>> {
        U256::from_str(self.sell_amount.trim())
            .map_err(|e| format!("Invalid sell_amount {:?}: {e}", self.sell_amount).into())
    }
}

/// A string that is never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// The wrapped value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the value is empty or an unexpanded `$VAR` reference.
    pub fn is_unresolved(&self) -> bool {
        let value = self.0.trim();
        value.is_empty() || value.starts_with('$')
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

const fn default_permit2() -> Address {
    PERMIT2_ADDRESS
}

const fn default_confirmations() -> u64 {
    1
}

fn default_quote_base_url() -> String {
    p2swap_http::DEFAULT_BASE_URL.to_owned()
}

impl Config {
    /// Loads configuration from `path`, expanding `$VAR` / `${VAR}`
    /// references from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string after environment expansion.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Applies command-line overrides to the order section.
    pub fn apply_overrides(&mut self, buy_token: Option<Address>, sell_amount: Option<U256>) {
        if let Some(buy_token) = buy_token {
            self.order.buy_token = buy_token;
        }
        if let Some(sell_amount) = sell_amount {
            self.order.sell_amount = sell_amount.to_string();
        }
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match std::env::var(&var_name) {
            Ok(val) if !var_name.is_empty() => result.push_str(&val),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced && !var_name.is_empty() {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        chain_id = 10
        rpc_url = "http://localhost:8545"
        private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

        [quote]
        api_key = "key"

        [order]
        sell_token = "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"
        buy_token = "0x819845b60a192167ed1139040b4f8eca31834f27"
        sell_amount = "1000000"
    "#;

    #[test]
    fn test_defaults() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.chain_id, 10);
        assert_eq!(config.permit2, PERMIT2_ADDRESS);
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.receipt_timeout_secs, None);
        assert_eq!(config.quote.base_url, "https://api.0x.org/swap/permit2/");
        assert_eq!(config.order.sell_amount().unwrap(), U256::from(1_000_000u64));
    }

    #[test]
    fn test_secrets_are_not_printed() {
        let config = Config::parse(SAMPLE).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"));
        assert!(!printed.contains("\"key\""));
    }

    #[test]
    fn test_overrides_replace_order_fields() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.apply_overrides(Some(Address::ZERO), Some(U256::from(5u64)));
        assert_eq!(config.order.buy_token, Address::ZERO);
        assert_eq!(config.order.sell_amount().unwrap(), U256::from(5u64));
    }

    #[test]
    fn test_invalid_sell_amount() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.order.sell_amount = "1e6".to_owned();
        assert!(config.order.sell_amount().is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("a=$PATH;"), format!("a={path};"));
        assert_eq!(expand_env_vars("${PATH}/bin"), format!("{path}/bin"));
        assert_eq!(
            expand_env_vars("$P2SWAP_SURELY_UNSET_VAR"),
            "$P2SWAP_SURELY_UNSET_VAR"
        );
        assert_eq!(
            expand_env_vars("${P2SWAP_SURELY_UNSET_VAR}"),
            "${P2SWAP_SURELY_UNSET_VAR}"
        );
        assert_eq!(expand_env_vars("cost: $5"), "cost: $5");
        assert_eq!(expand_env_vars("lone $"), "lone $");
    }

    #[test]
    fn test_unresolved_secret_is_detected() {
        let config = Config::parse(&SAMPLE.replace(
            "private_key = \"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80\"",
            "private_key = \"$P2SWAP_SURELY_UNSET_VAR\"",
        ))
        .unwrap();
        assert!(config.private_key.is_unresolved());
        assert!(!config.quote.api_key.is_unresolved());
    }
}
