//! Confirmation tracking after broadcast
//!
//! The pipeline reads pending balances immediately by default. Callers that
//! need inclusion before the balance reads pick a block-depth policy instead.

use super::{ChainQueryClient, ReceiptStatus};
use crate::chain::RpcError;
use crate::error::{TransferError, TransferResult};

use ethers::types::H256;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What to wait for between broadcast and the balance reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationPolicy {
    /// Read pending state right after broadcast
    #[default]
    PendingOnly,
    /// Wait until the transaction is `blocks` deep (the inclusion block counts as one)
    Blocks {
        blocks: u64,
        timeout: Duration,
        poll_interval: Duration,
    },
}

/// Polls a node until a transaction reaches the required depth
pub struct ConfirmationTracker<'a, C: ChainQueryClient + ?Sized> {
    client: &'a C,
    confirmation_blocks: u64,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'a, C: ChainQueryClient + ?Sized> ConfirmationTracker<'a, C> {
    pub fn new(
        client: &'a C,
        confirmation_blocks: u64,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            confirmation_blocks,
            timeout,
            poll_interval,
        }
    }

    /// Wait for the required depth, returning the inclusion block
    pub async fn wait(&self, tx_hash: H256, cancel: &CancellationToken) -> TransferResult<u64> {
        let method = "eth_getTransactionReceipt";

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransferError::RemoteQuery {
                operation: method,
                source: RpcError::Cancelled { method },
            }),
            result = tokio::time::timeout(self.timeout, self.poll(tx_hash)) => match result {
                Ok(inner) => inner,
                Err(_) => Err(TransferError::RemoteQuery {
                    operation: method,
                    source: RpcError::Timeout { method, timeout: self.timeout },
                }),
            },
        }
    }

    async fn poll(&self, tx_hash: H256) -> TransferResult<u64> {
        loop {
            if let Some(block) = self.check(tx_hash).await? {
                return Ok(block);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One receipt check: the inclusion block once deep enough
    async fn check(&self, tx_hash: H256) -> TransferResult<Option<u64>> {
        let receipt = self
            .client
            .receipt_status(tx_hash)
            .await
            .map_err(|source| TransferError::RemoteQuery {
                operation: "eth_getTransactionReceipt",
                source,
            })?;

        let ReceiptStatus {
            block_number,
            succeeded,
        } = match receipt {
            Some(status) => status,
            None => {
                debug!("Transaction {:?} not yet mined", tx_hash);
                return Ok(None);
            }
        };

        if !succeeded {
            return Err(TransferError::Reverted {
                tx_hash,
                block_number,
            });
        }

        let current_block = self
            .client
            .block_number()
            .await
            .map_err(|source| TransferError::RemoteQuery {
                operation: "eth_blockNumber",
                source,
            })?;

        let confirmations = current_block.saturating_sub(block_number) + 1;
        if confirmations >= self.confirmation_blocks {
            info!(
                "Transaction {:?} confirmed in block {} ({} confirmations)",
                tx_hash, block_number, confirmations
            );
            return Ok(Some(block_number));
        }

        debug!(
            "Transaction {:?} has {} / {} confirmations",
            tx_hash, confirmations, self.confirmation_blocks
        );
        Ok(None)
    }
}
