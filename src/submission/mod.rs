//! Submission pipeline for a single transfer
//!
//! The orchestrator:
//! 1. Derives the sender address from the key
//! 2. Fetches the pending nonce and the suggested gas price
//! 3. Builds and signs the transfer locally
//! 4. Broadcasts it once
//! 5. Reads back pending balances of sender and recipient

pub mod orchestrator;
pub mod state;

pub use orchestrator::SubmissionOrchestrator;
pub use state::SubmissionState;

use crate::chain::ConfirmationPolicy;
use crate::tx::SignatureScheme;

use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::to_checksum;
use std::fmt;

/// Caller-supplied parameters of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub data: Bytes,
    pub scheme: SignatureScheme,
    pub confirmation: ConfirmationPolicy,
}

/// Outcome of a verified transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub max_fee: U256,
    pub tx_hash: H256,
    pub confirmed_in_block: Option<u64>,
    pub sender_pending_balance: U256,
    pub recipient_pending_balance: U256,
}

impl fmt::Display for SubmissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Sent {} wei to {}: {:?}",
            self.value,
            to_checksum(&self.to, None),
            self.tx_hash
        )?;
        writeln!(
            f,
            "Max fee: {} wei ({} gas at {} wei)",
            self.max_fee, self.gas_limit, self.gas_price
        )?;
        if let Some(block) = self.confirmed_in_block {
            writeln!(f, "Confirmed in block {}", block)?;
        }
        writeln!(f, "Current pending from balance: {}", self.sender_pending_balance)?;
        write!(
            f,
            "Current pending to wallet balance: {}",
            self.recipient_pending_balance
        )
    }
}
