//! Persistence of the wallet's private coins.
//!
//! The store is always rewritten as a whole, so a partially applied update is
//! never visible.
//!
//! - [`CoinStore`] - persistence interface
//! - [`MemoryCoinStore`] - in-memory store, for tests and tooling
//! - [`FileCoinStore`] - JSON files in a wallet directory

mod coin_store;
mod file;
mod memory;

pub use coin_store::CoinStore;
pub use file::FileCoinStore;
pub use memory::MemoryCoinStore;
