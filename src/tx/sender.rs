//! Single-attempt broadcast of a signed transaction

use super::signer::SignedTransaction;
use crate::chain::ChainQueryClient;
use crate::error::{TransferError, TransferResult};

use ethers::types::H256;
use tracing::{debug, info};

/// Node-side rejection reasons worth naming in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NonceTooLow,
    InsufficientFunds,
    Underpriced,
    AlreadyKnown,
    Other,
}

impl Rejection {
    /// Classify a node error message
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("nonce too low") {
            Rejection::NonceTooLow
        } else if message.contains("insufficient funds") {
            Rejection::InsufficientFunds
        } else if message.contains("underpriced") {
            Rejection::Underpriced
        } else if message.contains("already known") {
            Rejection::AlreadyKnown
        } else {
            Rejection::Other
        }
    }
}

/// Submits signed transactions, exactly once per call
pub struct Broadcaster;

impl Broadcaster {
    /// Submit `tx` and return its hash
    pub async fn send<C: ChainQueryClient + ?Sized>(
        client: &C,
        tx: &SignedTransaction,
    ) -> TransferResult<H256> {
        let tx_hash = tx.hash();

        match client.submit(tx).await {
            Ok(()) => {
                info!("Transaction sent: {:?}", tx_hash);
                Ok(tx_hash)
            }
            Err(source) if source.is_unanswered() => Err(TransferError::SubmissionStatusUnknown {
                tx_hash,
                reason: source.to_string(),
            }),
            Err(source) => {
                debug!(
                    "Transaction {:?} rejected ({:?}): {}",
                    tx_hash,
                    Rejection::classify(&source.to_string()),
                    source
                );
                Err(TransferError::Submission { tx_hash, source })
            }
        }
    }
}
