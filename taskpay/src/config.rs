//! Engine configuration.
//!
//! Loads configuration from a TOML file with support for environment
//! variable expansion in string values. Variables use `$VAR` or `${VAR}`
//! syntax, so signing keys stay out of the config file itself.
//!
//! # Example Configuration
//!
//! ```toml
//! [chain]
//! rpc_url = "https://sepolia.base.org"
//! chain_id = 84532
//! network = "base-sepolia"
//!
//! [token]
//! contract = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
//! name = "USDC"
//! version = "2"
//! decimals = 6
//! currency = "USDC"
//!
//! [operator]
//! address = "0x28172273CC1E0395F3473EC6eD062B6fdFb15940"
//! private_key = "$SERVER_WALLET_KEY"
//!
//! [approval]
//! threshold_usd = "0.002"
//! expiry_minutes = 10
//! base_url = "https://pay.example.com"
//! ```
//!
//! # Environment Variables
//!
//! - `TASKPAY_CONFIG` — path to the configuration file (default:
//!   `taskpay.toml`)
//! - Any `$VAR` referenced inside string values

use std::path::Path;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target chain connection settings.
    pub chain: ChainConfig,
    /// Stablecoin contract and typed-data domain settings.
    pub token: TokenConfig,
    /// Service wallet that pays gas and receives transfers.
    pub operator: OperatorConfig,
    /// Payment construction and settlement timing.
    #[serde(default)]
    pub payment: PaymentConfig,
    /// Human-approval workflow settings.
    pub approval: ApprovalConfig,
    /// Approval request persistence.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Connection settings for the target EVM chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// HTTP RPC endpoint URL.
    pub rpc_url: Url,
    /// Numeric chain identifier (e.g. 84532 for Base Sepolia).
    pub chain_id: u64,
    /// Human-readable network name advertised to clients.
    pub network: String,
}

/// The deployed stablecoin contract and its EIP-712 domain.
///
/// `name`, `version`, `chain_id`, and `contract` must match the deployed
/// contract's own domain exactly; any divergence makes every signature fail
/// to recover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token contract address (the `verifyingContract` domain field).
    pub contract: Address,
    /// EIP-712 domain name. Base Sepolia USDC uses `"USDC"`, not
    /// `"USD Coin"`.
    pub name: String,
    /// EIP-712 domain version.
    pub version: String,
    /// Token decimals (USDC: 6).
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Currency code advertised to clients.
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// The service's own wallet.
///
/// Its key signs the gas-paying transactions that carry each authorized
/// transfer; it never signs on behalf of payers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Wallet address; also the payment recipient.
    pub address: Address,
    /// Private key (hex, with or without `0x` prefix). Supports
    /// `$VAR` / `${VAR}` environment expansion.
    pub private_key: String,
}

/// Payment construction and settlement timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// How long a built authorization stays signable (default: 1 hour).
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,
    /// How long to wait for a transaction receipt before reporting the
    /// transfer unconfirmed (default: 120 s).
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            validity_secs: default_validity_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

/// Human-approval workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Payments at or above this USD amount require email approval.
    #[serde(default = "default_threshold_usd")]
    pub threshold_usd: Decimal,
    /// Magic-link lifetime in minutes (default: 10). Short on purpose —
    /// these links gate real payments.
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: u64,
    /// Public base URL the approve/deny links are built against.
    pub base_url: Url,
}

/// Approval request persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlx` SQLite connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

const fn default_decimals() -> u8 {
    6
}

fn default_currency() -> String {
    "USDC".to_owned()
}

const fn default_validity_secs() -> u64 {
    3600
}

const fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_threshold_usd() -> Decimal {
    Decimal::new(2, 3) // $0.002
}

const fn default_expiry_minutes() -> u64 {
    10
}

fn default_database_url() -> String {
    // mode=rwc creates the file on first run.
    "sqlite://taskpay.db?mode=rwc".to_owned()
}

impl EngineConfig {
    /// Loads configuration from the path given by the `TASKPAY_CONFIG`
    /// environment variable, falling back to `taskpay.toml` in the current
    /// directory.
    ///
    /// After parsing, all string values with `$VAR` / `${VAR}` references
    /// are expanded from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var("TASKPAY_CONFIG").unwrap_or_else(|_| "taskpay.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or fails to parse.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Self = toml::from_str(&expanded)?;
        Ok(config)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment
/// variables. Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next(); // consume '{'
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

            if var_name.is_empty() {
                result.push('$');
                if braced {
                    result.push('{');
                }
            } else if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            } else {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[chain]
rpc_url = "https://sepolia.base.org"
chain_id = 84532
network = "base-sepolia"

[token]
contract = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
name = "USDC"
version = "2"

[operator]
address = "0x28172273CC1E0395F3473EC6eD062B6fdFb15940"
private_key = "${TASKPAY_TEST_KEY}"

[approval]
base_url = "https://pay.example.com"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config: EngineConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.chain.chain_id, 84532);
        assert_eq!(config.token.decimals, 6);
        assert_eq!(config.token.currency, "USDC");
        assert_eq!(config.payment.validity_secs, 3600);
        assert_eq!(config.payment.receipt_timeout_secs, 120);
        assert_eq!(config.approval.threshold_usd, Decimal::new(2, 3));
        assert_eq!(config.approval.expiry_minutes, 10);
        assert_eq!(config.database.url, "sqlite://taskpay.db?mode=rwc");
    }

    #[test]
    fn expands_braced_and_plain_vars() {
        // Safety: test-only env mutation, no concurrent readers of this var.
        unsafe { std::env::set_var("TASKPAY_CFG_TEST_VAR", "sekrit") };
        assert_eq!(expand_env_vars("key = \"$TASKPAY_CFG_TEST_VAR\""), "key = \"sekrit\"");
        assert_eq!(
            expand_env_vars("key = \"${TASKPAY_CFG_TEST_VAR}\""),
            "key = \"sekrit\""
        );
    }

    #[test]
    fn leaves_unresolved_vars_in_place() {
        assert_eq!(
            expand_env_vars("$TASKPAY_DEFINITELY_UNSET_VAR"),
            "$TASKPAY_DEFINITELY_UNSET_VAR"
        );
        assert_eq!(expand_env_vars("100$"), "100$");
    }
}
