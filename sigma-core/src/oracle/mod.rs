//! Cryptographic oracle for Sigma mints and spends.
//!
//! The commitment scheme and the one-out-of-many spend proof are not
//! implemented here. The wallet only talks to them through [`SigmaOracle`].
//!
//! - [`SigmaOracle`] - mint commitment derivation and spend proving
//! - [`DummyOracle`] - deterministic hash-based stand-in, for tests and tooling

mod dummy_oracle;
mod oracle;

pub use dummy_oracle::DummyOracle;
pub use oracle::{MintSecret, SigmaOracle};
