use bitcoin::{secp256k1::SecretKey, Amount};

use crate::{
    builder::{SignedSpend, UnsignedSpend},
    coin::SpendCoin,
    error::Result,
};

/// Commitment and serial number derived for one coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSecret {
    pub commitment: Vec<u8>,
    pub serial_number: Vec<u8>,
}

/// Narrow interface to the zero-knowledge machinery.
///
/// Implementations must be deterministic in `mint`: the same
/// `(denomination, private_key, index)` always yields the same secret, since
/// restore depends on re-deriving every coin from the master key.
#[async_trait::async_trait]
pub trait SigmaOracle: Send + Sync {
    /// Derive the commitment and serial number of the coin at `index`.
    async fn mint(
        &self,
        denomination: Amount,
        private_key: &SecretKey,
        index: u32,
    ) -> Result<MintSecret>;

    /// Produce the spend proofs for every input of `unsigned`.
    ///
    /// `coins` is ordered like the transaction inputs. A failure for any coin
    /// fails the whole call.
    async fn prove(
        &self,
        unsigned: &UnsignedSpend,
        coins: &[SpendCoin],
        private_key: &SecretKey,
    ) -> Result<SignedSpend>;
}
