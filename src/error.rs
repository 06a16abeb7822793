//! Error types for the transfer pipeline

use crate::chain::RpcError;

use ethers::types::H256;
use thiserror::Error;

/// Main error type for a transfer run
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error for {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Remote query {operation} failed: {source}")]
    RemoteQuery {
        operation: &'static str,
        source: RpcError,
    },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Submission of {tx_hash:?} failed: {source}")]
    Submission { tx_hash: H256, source: RpcError },

    #[error("Submission status of {tx_hash:?} is unknown: {reason}")]
    SubmissionStatusUnknown { tx_hash: H256, reason: String },

    #[error("Transaction {tx_hash:?} reverted in block {block_number}")]
    Reverted { tx_hash: H256, block_number: u64 },

    #[error("Transaction {tx_hash:?} was sent but {operation} failed: {source}")]
    Verification {
        tx_hash: H256,
        operation: &'static str,
        source: RpcError,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl TransferError {
    /// True when the transaction may have reached the node even though the
    /// run did not observe an acceptance.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, TransferError::SubmissionStatusUnknown { .. })
    }

    /// Hash of a transaction known to have been accepted by the node
    pub fn sent_tx_hash(&self) -> Option<H256> {
        match self {
            TransferError::Verification { tx_hash, .. } | TransferError::Reverted { tx_hash, .. } => {
                Some(*tx_hash)
            }
            _ => None,
        }
    }

    /// Attach the hash of an accepted transaction to a later query failure
    pub fn after_broadcast(self, tx_hash: H256) -> Self {
        match self {
            TransferError::RemoteQuery { operation, source } => TransferError::Verification {
                tx_hash,
                operation,
                source,
            },
            other => other,
        }
    }

    /// Process exit status for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            TransferError::Config(_) => 2,
            TransferError::Connection { .. } => 3,
            TransferError::InvalidKey(_) => 4,
            TransferError::RemoteQuery { .. } => 5,
            TransferError::Signing(_) => 6,
            TransferError::Submission { .. } => 7,
            TransferError::SubmissionStatusUnknown { .. } => 8,
            TransferError::Reverted { .. } => 9,
            TransferError::InvalidStateTransition { .. } => 10,
            TransferError::Verification { .. } => 11,
        }
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
