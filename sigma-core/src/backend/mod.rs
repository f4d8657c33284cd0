//! Collaborators on the chain side of the wallet.
//!
//! - [`ChainBackend`] - read-only view of the Sigma state published on-chain
//! - [`TransparentWallet`] - the transparent wallet that funds mints and
//!   broadcasts transactions
//! - [`MemoryBackend`] and [`MemoryWallet`] - in-memory implementations

mod chain_backend;
mod memory;
mod transparent;

pub use chain_backend::ChainBackend;
pub use memory::{MemoryBackend, MemoryBackendError, MemoryWallet};
pub use transparent::TransparentWallet;
