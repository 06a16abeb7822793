//! Configuration management for the transfer tool
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::chain::ConfirmationPolicy;
use crate::error::{TransferError, TransferResult};
use crate::submission::TransferRequest;
use crate::tx::{gas, KeyMaterial, SignatureScheme};

use anyhow::{Context, Result};
use ethers::types::{Address, Bytes, U256};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub node: NodeConfig,
    pub wallet: WalletConfig,
    pub transfer: TransferConfig,
    pub signing: SigningConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rpc_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub expected_chain_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key: Option<String>,
    pub private_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub to: String,
    pub value_wei: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    pub scheme: SchemeKind,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    Homestead,
    Eip155,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default)]
    pub policy: ConfirmationKind,
    #[serde(default = "default_confirmation_blocks")]
    pub blocks: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationKind {
    #[default]
    Pending,
    Blocks,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            policy: ConfirmationKind::default(),
            blocks: default_confirmation_blocks(),
            timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_gas_limit() -> u64 {
    gas::TRANSFER_GAS
}

fn default_confirmation_blocks() -> u64 {
    1
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Settings {
    /// Load settings from `$TRANSFER_CONFIG` or `config/default.toml`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TRANSFER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting environment variables
    pub fn from_toml(input: &str) -> Result<Self> {
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.wallet.private_key.is_none() && self.wallet.private_key_env.is_none() {
            anyhow::bail!("Wallet needs either private_key or private_key_env");
        }

        self.signature_scheme()?;

        if self.confirmation.policy == ConfirmationKind::Blocks {
            if self.confirmation.blocks == 0 {
                anyhow::bail!("Confirmation policy 'blocks' needs at least one block");
            }
            if self.confirmation.timeout_secs == 0 {
                anyhow::bail!("Confirmation timeout must be at least one second");
            }
            if self.confirmation.poll_interval_ms == 0 {
                anyhow::bail!("Confirmation poll interval must be at least one millisecond");
            }
        }

        if self.node.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }

        Ok(())
    }

    /// Signature scheme; EIP-155 needs a chain id and Homestead must not have one
    pub fn signature_scheme(&self) -> TransferResult<SignatureScheme> {
        match (self.signing.scheme, self.signing.chain_id) {
            (SchemeKind::Homestead, None) => Ok(SignatureScheme::Homestead),
            (SchemeKind::Homestead, Some(id)) => Err(TransferError::Config(format!(
                "Homestead signing is not chain-bound, remove chain_id = {}",
                id
            ))),
            (SchemeKind::Eip155, Some(chain_id)) => Ok(SignatureScheme::Eip155 { chain_id }),
            (SchemeKind::Eip155, None) => Err(TransferError::Config(
                "EIP-155 signing needs signing.chain_id".to_string(),
            )),
        }
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        match self.confirmation.policy {
            ConfirmationKind::Pending => ConfirmationPolicy::PendingOnly,
            ConfirmationKind::Blocks => ConfirmationPolicy::Blocks {
                blocks: self.confirmation.blocks,
                timeout: Duration::from_secs(self.confirmation.timeout_secs),
                poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
            },
        }
    }

    /// Everything the pipeline needs besides the key and the client
    pub fn transfer_request(&self) -> TransferResult<TransferRequest> {
        let to = Address::from_str(self.transfer.to.trim()).map_err(|e| {
            TransferError::Config(format!("Invalid recipient {:?}: {}", self.transfer.to, e))
        })?;

        let value = U256::from_dec_str(self.transfer.value_wei.trim()).map_err(|e| {
            TransferError::Config(format!(
                "Invalid value_wei {:?}: {:?}",
                self.transfer.value_wei, e
            ))
        })?;

        let data = self.transfer.data.trim();
        let data = hex::decode(data.strip_prefix("0x").unwrap_or(data))
            .map(Bytes::from)
            .map_err(|e| TransferError::Config(format!("Invalid data: {}", e)))?;

        Ok(TransferRequest {
            to,
            value,
            gas_limit: self.transfer.gas_limit,
            data,
            scheme: self.signature_scheme()?,
            confirmation: self.confirmation_policy(),
        })
    }
}

impl WalletConfig {
    /// Load the signing key, preferring the environment variable when named
    pub fn load_key(&self) -> TransferResult<KeyMaterial> {
        if let Some(ref var) = self.private_key_env {
            let secret = env::var(var).map_err(|_| {
                TransferError::Config(format!("Environment variable {} is not set", var))
            })?;
            return KeyMaterial::from_hex(&secret);
        }

        match self.private_key {
            Some(ref secret) => KeyMaterial::from_hex(secret),
            None => Err(TransferError::Config(
                "No wallet configured. Set private_key or private_key_env".to_string(),
            )),
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures| env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}
