//! Single native-asset transfer: build, sign, broadcast, and read back
//! pending balances through a JSON-RPC node.

pub mod chain;
pub mod config;
pub mod error;
pub mod submission;
pub mod tx;

pub use error::{TransferError, TransferResult};
