//! Sequencing of one transfer from key to verified pending balances

use super::state::SubmissionState;
use super::{SubmissionReport, TransferRequest};
use crate::chain::{ChainQueryClient, ConfirmationPolicy, ConfirmationTracker, RpcError};
use crate::error::{TransferError, TransferResult};
use crate::tx::{gas, Broadcaster, KeyMaterial, TransactionBuilder, TransactionSigner};

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs the submission pipeline once for one key
pub struct SubmissionOrchestrator<C: ChainQueryClient> {
    /// Node access
    client: Arc<C>,
    /// Sender key, owned for the lifetime of the run
    key: KeyMaterial,
    /// Cancels in-flight remote calls
    cancel: CancellationToken,
    /// Current pipeline state
    state: SubmissionState,
}

impl<C: ChainQueryClient> SubmissionOrchestrator<C> {
    pub fn new(client: Arc<C>, key: KeyMaterial, cancel: CancellationToken) -> Self {
        Self {
            client,
            key,
            cancel,
            state: SubmissionState::Start,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Run the pipeline; on error the state is left at `Failed`
    pub async fn run(&mut self, request: &TransferRequest) -> TransferResult<SubmissionReport> {
        let result = self.execute(request).await;

        if let Err(ref e) = result {
            let stage = self.state.name();
            let failed = SubmissionState::Failed {
                stage,
                reason: e.to_string(),
            };
            // A second run on a finished orchestrator keeps its terminal state.
            if self.state.transition(failed).is_ok() {
                debug!("Submission failed after {}", stage);
            }
        }

        result
    }

    async fn execute(&mut self, request: &TransferRequest) -> TransferResult<SubmissionReport> {
        let from = self.key.address();
        self.state.transition(SubmissionState::AddressDerived)?;
        debug!("Sender address {:?}", from);

        let nonce = self
            .remote("eth_getTransactionCount", self.client.pending_nonce(from))
            .await?;
        self.state.transition(SubmissionState::NonceFetched)?;
        debug!("Pending nonce for {:?}: {}", from, nonce);

        let gas_price = self
            .remote("eth_gasPrice", self.client.suggest_gas_price())
            .await?;
        self.state.transition(SubmissionState::GasPriceFetched)?;
        debug!("Suggested gas price: {} wei", gas_price);

        let unsigned = TransactionBuilder::build(
            nonce,
            gas_price,
            request.gas_limit,
            request.to,
            request.value,
            request.data.clone(),
        )?;
        self.state.transition(SubmissionState::Built)?;

        let signed = TransactionSigner::sign(&unsigned, &self.key, request.scheme)?;
        self.state.transition(SubmissionState::Signed)?;

        // Nothing has left the process yet, so cancellation here is a clean failure.
        if self.cancel.is_cancelled() {
            let method = "eth_sendRawTransaction";
            return Err(TransferError::RemoteQuery {
                operation: method,
                source: RpcError::Cancelled { method },
            });
        }

        let tx_hash = tokio::select! {
            biased;
            result = Broadcaster::send(self.client.as_ref(), &signed) => result?,
            _ = self.cancel.cancelled() => {
                return Err(TransferError::SubmissionStatusUnknown {
                    tx_hash: signed.hash(),
                    reason: "cancelled while broadcasting".to_string(),
                });
            }
        };
        self.state.transition(SubmissionState::Broadcast)?;
        info!(
            "Sent {} wei from {:?} to {:?}: {:?}",
            request.value, from, request.to, tx_hash
        );

        let confirmed_in_block = match request.confirmation {
            ConfirmationPolicy::PendingOnly => None,
            ConfirmationPolicy::Blocks {
                blocks,
                timeout,
                poll_interval,
            } => Some(
                ConfirmationTracker::new(self.client.as_ref(), blocks, timeout, poll_interval)
                    .wait(tx_hash, &self.cancel)
                    .await
                    .map_err(|e| e.after_broadcast(tx_hash))?,
            ),
        };

        let sender_pending_balance = self
            .remote("eth_getBalance", self.client.pending_balance(from))
            .await
            .map_err(|e| e.after_broadcast(tx_hash))?;
        let recipient_pending_balance = self
            .remote("eth_getBalance", self.client.pending_balance(request.to))
            .await
            .map_err(|e| e.after_broadcast(tx_hash))?;
        self.state.transition(SubmissionState::Verified)?;
        info!(
            "Pending balances: sender {} wei, recipient {} wei",
            sender_pending_balance, recipient_pending_balance
        );

        Ok(SubmissionReport {
            from,
            to: request.to,
            value: request.value,
            nonce,
            gas_price,
            gas_limit: request.gas_limit,
            max_fee: gas::max_fee(request.gas_limit, gas_price),
            tx_hash,
            confirmed_in_block,
            sender_pending_balance,
            recipient_pending_balance,
        })
    }

    /// Await a node query, failing fast on cancellation
    async fn remote<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RpcError>>,
    ) -> TransferResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransferError::RemoteQuery {
                operation,
                source: RpcError::Cancelled { method: operation },
            }),
            result = call => result.map_err(|source| TransferError::RemoteQuery { operation, source }),
        }
    }
}
