//! ethers HTTP client for the transfer pipeline

use super::{ChainQueryClient, ReceiptStatus, RpcError};
use crate::config::NodeConfig;
use crate::error::{TransferError, TransferResult};
use crate::tx::SignedTransaction;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// JSON-RPC client bound to one node endpoint
pub struct RpcClient {
    /// Node endpoint, for diagnostics
    endpoint: String,
    /// HTTP provider
    provider: Provider<Http>,
    /// Upper bound on every request
    request_timeout: Duration,
    /// Chain id reported by the node at connect time
    chain_id: u64,
}

impl RpcClient {
    /// Build the provider and probe the node's chain id
    pub async fn connect(config: &NodeConfig) -> TransferResult<Self> {
        let endpoint = config.rpc_url.clone();
        let provider = Provider::<Http>::try_from(endpoint.as_str())
            .map_err(|e| TransferError::Connection {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?
            .interval(Duration::from_millis(100));

        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let chain_id = match timeout(request_timeout, provider.get_chainid()).await {
            Ok(Ok(id)) => id.low_u64(),
            Ok(Err(e)) => {
                return Err(TransferError::Connection {
                    endpoint,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransferError::Connection {
                    endpoint,
                    message: format!("no response within {:?}", request_timeout),
                })
            }
        };

        if let Some(expected) = config.expected_chain_id {
            if expected != chain_id {
                return Err(TransferError::Connection {
                    endpoint,
                    message: format!("expected chain {}, node reports {}", expected, chain_id),
                });
            }
        }

        info!("Connected to {} (chain {})", endpoint, chain_id);

        Ok(Self {
            endpoint,
            provider,
            request_timeout,
            chain_id,
        })
    }

    /// Chain id reported by the node
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one request under the configured timeout
    async fn call<T, F>(&self, method: &'static str, request: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, ProviderError>> + Send,
    {
        match timeout(self.request_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::Node {
                method,
                message: e.to_string(),
            }),
            Err(_) => Err(RpcError::Timeout {
                method,
                timeout: self.request_timeout,
            }),
        }
    }
}

#[async_trait]
impl ChainQueryClient for RpcClient {
    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        let nonce = self
            .call(
                "eth_getTransactionCount",
                self.provider
                    .get_transaction_count(address, Some(BlockNumber::Pending.into())),
            )
            .await?;
        checked_u64("eth_getTransactionCount", nonce)
    }

    async fn suggest_gas_price(&self) -> Result<U256, RpcError> {
        self.call("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn pending_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.call(
            "eth_getBalance",
            self.provider
                .get_balance(address, Some(BlockNumber::Pending.into())),
        )
        .await
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<(), RpcError> {
        let node_hash = self
            .call("eth_sendRawTransaction", async {
                self.provider
                    .send_raw_transaction(tx.raw().clone())
                    .await
                    .map(|pending| pending.tx_hash())
            })
            .await?;

        debug!("Node accepted transaction {:?}", node_hash);
        Ok(())
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let block = self
            .call("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(block.as_u64())
    }

    async fn receipt_status(&self, tx_hash: H256) -> Result<Option<ReceiptStatus>, RpcError> {
        let receipt = self
            .call(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )
            .await?;

        Ok(receipt.and_then(|receipt| {
            receipt.block_number.map(|block| ReceiptStatus {
                block_number: block.as_u64(),
                succeeded: receipt.status == Some(1.into()),
            })
        }))
    }
}

/// Narrow a node-reported quantity that must fit in 64 bits
fn checked_u64(method: &'static str, value: U256) -> Result<u64, RpcError> {
    if value.bits() > 64 {
        return Err(RpcError::Node {
            method,
            message: format!("value {} exceeds 64 bits", value),
        });
    }
    Ok(value.low_u64())
}
