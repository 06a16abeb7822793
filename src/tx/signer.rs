//! Transaction signing under an explicitly chosen chain rule
//!
//! Two schemes are supported:
//! - Homestead: pre-EIP-155, signature valid on any chain with the same state
//! - EIP-155: chain id folded into the signing hash and into `v`
//!
//! There is no default. A node expecting one scheme rejects the other, and a
//! Homestead signature can be replayed on every chain sharing the account.

use super::builder::UnsignedTransaction;
use super::key::KeyMaterial;
use crate::error::{TransferError, TransferResult};

use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Signature, Transaction, H256, U256};
use ethers::utils::{keccak256, rlp};
use tracing::debug;

/// Chain rule used to produce the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Homestead,
    Eip155 { chain_id: u64 },
}

impl SignatureScheme {
    /// Reject an EIP-155 scheme bound to a different chain than the node's
    pub fn check_node_chain(&self, node_chain_id: u64) -> TransferResult<()> {
        match self {
            SignatureScheme::Eip155 { chain_id } if *chain_id != node_chain_id => {
                Err(TransferError::Config(format!(
                    "Signing for chain {} but node reports chain {}",
                    chain_id, node_chain_id
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Signed transfer ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    unsigned: UnsignedTransaction,
    signature: Signature,
    raw: Bytes,
    hash: H256,
}

impl SignedTransaction {
    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.unsigned
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// RLP encoding submitted to the node
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Transaction hash: keccak256 of the raw encoding
    pub fn hash(&self) -> H256 {
        self.hash
    }
}

/// Fields and sender recovered from a raw signed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredTransaction {
    pub transaction: UnsignedTransaction,
    pub sender: Address,
    pub chain_id: Option<u64>,
    pub hash: H256,
}

/// Signs unsigned transfers
pub struct TransactionSigner;

impl TransactionSigner {
    /// Sign `unsigned` with `key` under `scheme`
    pub fn sign(
        unsigned: &UnsignedTransaction,
        key: &KeyMaterial,
        scheme: SignatureScheme,
    ) -> TransferResult<SignedTransaction> {
        let request = unsigned.to_request();

        let (request, signature) = match scheme {
            SignatureScheme::Homestead => {
                let signature = key
                    .wallet()
                    .sign_hash(request.sighash())
                    .map_err(|e| TransferError::Signing(e.to_string()))?;
                (request, signature)
            }
            SignatureScheme::Eip155 { chain_id } => {
                let request = request.chain_id(chain_id);
                let signature = key
                    .wallet()
                    .clone()
                    .with_chain_id(chain_id)
                    .sign_transaction_sync(&TypedTransaction::Legacy(request.clone()))
                    .map_err(|e| TransferError::Signing(e.to_string()))?;
                (request, signature)
            }
        };

        let raw = request.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        // Sender must survive a decode round trip.
        let recovered = recover(&raw)?;
        if recovered.sender != key.address() {
            return Err(TransferError::Signing(format!(
                "Recovered sender {:?} does not match signing key {:?}",
                recovered.sender,
                key.address()
            )));
        }

        debug!("Signed transaction {:?} (v = {})", hash, signature.v);

        Ok(SignedTransaction {
            unsigned: unsigned.clone(),
            signature,
            raw,
            hash,
        })
    }
}

/// Decode a raw legacy transaction and recover its sender
pub fn recover(raw: &[u8]) -> TransferResult<RecoveredTransaction> {
    let tx: Transaction = rlp::decode(raw)
        .map_err(|e| TransferError::Signing(format!("Malformed signed transaction: {}", e)))?;

    let sender = tx
        .recover_from()
        .map_err(|e| TransferError::Signing(format!("Sender recovery failed: {}", e)))?;

    let to = tx
        .to
        .ok_or_else(|| TransferError::Signing("Transaction has no recipient".to_string()))?;
    let gas_price = tx
        .gas_price
        .ok_or_else(|| TransferError::Signing("Transaction has no gas price".to_string()))?;

    Ok(RecoveredTransaction {
        transaction: UnsignedTransaction {
            nonce: to_u64(tx.nonce, "nonce")?,
            gas_price,
            gas_limit: to_u64(tx.gas, "gas limit")?,
            to,
            value: tx.value,
            data: tx.input,
        },
        sender,
        chain_id: tx.chain_id.map(|id| id.low_u64()),
        hash: tx.hash,
    })
}

fn to_u64(value: U256, field: &str) -> TransferResult<u64> {
    if value.bits() > 64 {
        return Err(TransferError::Signing(format!("{} {} exceeds 64 bits", field, value)));
    }
    Ok(value.low_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::builder::TransactionBuilder;
    use std::str::FromStr;

    const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn transfer(nonce: u64) -> UnsignedTransaction {
        TransactionBuilder::build(
            nonce,
            U256::from(20_000_000_000u64),
            21_000,
            Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap(),
            U256::from_dec_str("5000000000000000000").unwrap(),
            Bytes::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_homestead_round_trip() {
        let key = KeyMaterial::from_hex(ANVIL_KEY).unwrap();
        let unsigned = transfer(7);
        let signed = TransactionSigner::sign(&unsigned, &key, SignatureScheme::Homestead).unwrap();

        assert!(signed.signature().v == 27 || signed.signature().v == 28);

        let recovered = recover(signed.raw()).unwrap();
        assert_eq!(recovered.transaction, unsigned);
        assert_eq!(recovered.sender, key.address());
        assert_eq!(recovered.chain_id, None);
        assert_eq!(recovered.hash, signed.hash());
    }

    #[test]
    fn test_eip155_round_trip() {
        let key = KeyMaterial::from_hex(ANVIL_KEY).unwrap();
        let unsigned = transfer(0);
        let scheme = SignatureScheme::Eip155 { chain_id: 31337 };
        let signed = TransactionSigner::sign(&unsigned, &key, scheme).unwrap();

        let v = signed.signature().v;
        assert!(v == 31337 * 2 + 35 || v == 31337 * 2 + 36);

        let recovered = recover(signed.raw()).unwrap();
        assert_eq!(recovered.transaction, unsigned);
        assert_eq!(recovered.sender, key.address());
        assert_eq!(recovered.chain_id, Some(31337));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = KeyMaterial::from_hex(ANVIL_KEY).unwrap();
        let unsigned = transfer(7);

        for scheme in [SignatureScheme::Homestead, SignatureScheme::Eip155 { chain_id: 1 }] {
            let first = TransactionSigner::sign(&unsigned, &key, scheme).unwrap();
            let second = TransactionSigner::sign(&unsigned, &key, scheme).unwrap();
            assert_eq!(first.raw(), second.raw());
            assert_eq!(first.hash(), second.hash());
        }
    }

    #[test]
    fn test_schemes_produce_different_transactions() {
        let key = KeyMaterial::from_hex(ANVIL_KEY).unwrap();
        let unsigned = transfer(7);
        let legacy = TransactionSigner::sign(&unsigned, &key, SignatureScheme::Homestead).unwrap();
        let bound =
            TransactionSigner::sign(&unsigned, &key, SignatureScheme::Eip155 { chain_id: 1 }).unwrap();
        assert_ne!(legacy.hash(), bound.hash());
    }

    #[test]
    fn test_hash_is_keccak_of_raw() {
        let key = KeyMaterial::from_hex(ANVIL_KEY).unwrap();
        let signed = TransactionSigner::sign(&transfer(1), &key, SignatureScheme::Homestead).unwrap();
        assert_eq!(signed.hash().as_bytes().len(), 32);
        assert_eq!(signed.hash(), H256::from(keccak256(signed.raw())));
    }

    #[test]
    fn test_eip155_reference_vector() {
        // Example transaction from the EIP-155 text
        let key = KeyMaterial::from_hex(&"46".repeat(32)).unwrap();
        let unsigned = TransactionBuilder::build(
            9,
            U256::from(20_000_000_000u64),
            21_000,
            Address::repeat_byte(0x35),
            U256::exp10(18),
            Bytes::new(),
        )
        .unwrap();

        let signed =
            TransactionSigner::sign(&unsigned, &key, SignatureScheme::Eip155 { chain_id: 1 }).unwrap();

        assert_eq!(
            hex::encode(signed.raw()),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_recover_rejects_garbage() {
        let err = recover(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, TransferError::Signing(_)));
    }

    #[test]
    fn test_check_node_chain() {
        assert!(SignatureScheme::Homestead.check_node_chain(1).is_ok());
        assert!(SignatureScheme::Eip155 { chain_id: 1 }.check_node_chain(1).is_ok());

        let err = SignatureScheme::Eip155 { chain_id: 1 }
            .check_node_chain(31337)
            .unwrap_err();
        assert!(matches!(err, TransferError::Config(_)));
    }
}
