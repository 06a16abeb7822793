//! Signing key material and sender address derivation

use crate::error::{TransferError, TransferResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;

const SECRET_LEN: usize = 32;

/// Private signing key together with the account address it controls
#[derive(Clone)]
pub struct KeyMaterial {
    wallet: LocalWallet,
}

impl KeyMaterial {
    /// Parse a hex-encoded secp256k1 scalar, with or without a `0x` prefix
    pub fn from_hex(secret: &str) -> TransferResult<Self> {
        let secret = secret.trim();
        let digits = secret
            .strip_prefix("0x")
            .or_else(|| secret.strip_prefix("0X"))
            .unwrap_or(secret);

        let bytes = hex::decode(digits)
            .map_err(|e| TransferError::InvalidKey(format!("not hex: {}", e)))?;
        if bytes.len() != SECRET_LEN {
            return Err(TransferError::InvalidKey(format!(
                "expected {} bytes, got {}",
                SECRET_LEN,
                bytes.len()
            )));
        }

        let wallet = digits
            .parse::<LocalWallet>()
            .map_err(|e| TransferError::InvalidKey(e.to_string()))?;

        Ok(Self { wallet })
    }

    /// Account address derived from the public key
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub(crate) fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Derive the account address for a hex-encoded private key
pub fn derive_address(secret: &str) -> TransferResult<Address> {
    KeyMaterial::from_hex(secret).map(|key| key.address())
}
