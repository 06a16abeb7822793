//! Gas accounting for plain value transfers

use ethers::types::U256;

/// Intrinsic cost of a value transfer with an empty payload
pub const TRANSFER_GAS: u64 = 21_000;

/// Calldata cost per zero byte
const ZERO_BYTE_GAS: u64 = 4;
/// Calldata cost per non-zero byte
const NON_ZERO_BYTE_GAS: u64 = 16;

/// Minimum gas a transaction carrying `data` must be given
pub fn intrinsic_gas(data: &[u8]) -> u64 {
    data.iter().fold(TRANSFER_GAS, |gas, byte| {
        gas + if *byte == 0 {
            ZERO_BYTE_GAS
        } else {
            NON_ZERO_BYTE_GAS
        }
    })
}

/// Upper bound on the fee paid, in wei
pub fn max_fee(gas_limit: u64, gas_price: U256) -> U256 {
    gas_price.saturating_mul(U256::from(gas_limit))
}
