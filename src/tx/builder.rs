//! Unsigned transaction assembly

use super::gas;
use crate::error::{TransferError, TransferResult};

use ethers::types::{Address, Bytes, TransactionRequest, U256};

/// Legacy value transfer that has not been signed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// Legacy request carrying exactly these fields and no chain id
    pub(crate) fn to_request(&self) -> TransactionRequest {
        TransactionRequest::new()
            .to(self.to)
            .value(self.value)
            .data(self.data.clone())
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
    }
}

/// Builds unsigned transfers
pub struct TransactionBuilder;

impl TransactionBuilder {
    /// Assemble a transaction, rejecting gas limits below the intrinsic cost
    pub fn build(
        nonce: u64,
        gas_price: U256,
        gas_limit: u64,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> TransferResult<UnsignedTransaction> {
        if gas_limit == 0 {
            return Err(TransferError::Signing("Gas limit must be nonzero".to_string()));
        }

        let intrinsic = gas::intrinsic_gas(&data);
        if gas_limit < intrinsic {
            return Err(TransferError::Signing(format!(
                "Gas limit {} is below the intrinsic cost {}",
                gas_limit, intrinsic
            )));
        }

        Ok(UnsignedTransaction {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
        })
    }
}
