//! Chain module - node access for the transfer pipeline
//!
//! This module provides:
//! - The `ChainQueryClient` contract the pipeline is written against
//! - An ethers HTTP implementation with per-request timeouts
//! - Confirmation-depth waiting after broadcast

pub mod finality;
pub mod provider;

pub use finality::{ConfirmationPolicy, ConfirmationTracker};
pub use provider::RpcClient;

use crate::tx::SignedTransaction;

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("{method}: {message}")]
    Node {
        method: &'static str,
        message: String,
    },

    #[error("{method}: timed out after {timeout:?}")]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },

    #[error("{method}: cancelled")]
    Cancelled { method: &'static str },
}

impl RpcError {
    pub fn method(&self) -> &'static str {
        match self {
            RpcError::Node { method, .. }
            | RpcError::Timeout { method, .. }
            | RpcError::Cancelled { method } => method,
        }
    }

    /// The request may have reached the node without an answer coming back
    pub fn is_unanswered(&self) -> bool {
        matches!(self, RpcError::Timeout { .. } | RpcError::Cancelled { .. })
    }
}

/// Inclusion status from a transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub block_number: u64,
    pub succeeded: bool,
}

/// Node operations the transfer pipeline depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainQueryClient: Send + Sync {
    /// Next unused nonce, counting transactions still in the pool
    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError>;

    /// Node's current gas price recommendation
    async fn suggest_gas_price(&self) -> Result<U256, RpcError>;

    /// Balance including effects of pending transactions
    async fn pending_balance(&self, address: Address) -> Result<U256, RpcError>;

    /// Broadcast a signed transaction
    async fn submit(&self, tx: &SignedTransaction) -> Result<(), RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    /// `None` while the transaction is not yet mined
    async fn receipt_status(&self, tx_hash: H256) -> Result<Option<ReceiptStatus>, RpcError>;
}
