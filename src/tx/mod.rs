//! Transaction construction, signing and broadcast

mod builder;
pub mod gas;
mod key;
mod sender;
mod signer;

pub use builder::{TransactionBuilder, UnsignedTransaction};
pub use key::{derive_address, KeyMaterial};
pub use sender::{Broadcaster, Rejection};
pub use signer::{recover, RecoveredTransaction, SignatureScheme, SignedTransaction, TransactionSigner};
