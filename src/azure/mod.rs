//! Azure collaborators: CLI credential, Resource Manager client and the
//! storage analyzer built on them.

pub mod auth;
pub mod client;
pub mod filter;
pub mod storage;

#[cfg(test)]
pub(crate) mod fake_arm;

pub use auth::{authenticate, AccountProvider, AzureAccounts};
pub use storage::StorageAnalyzer;
