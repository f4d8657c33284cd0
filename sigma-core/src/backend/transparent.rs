use bitcoin::{ScriptBuf, Transaction, Txid};

use crate::{
    builder::{UnsignedTransaction, Utxo},
    error::Result,
};

/// The transparent wallet the Sigma wallet lives next to.
///
/// It owns the keys of the transparent outputs, so signing of mint
/// transactions happens on its side.
#[async_trait::async_trait]
pub trait TransparentWallet: Send + Sync {
    async fn unspent_outputs(&self) -> Result<Vec<Utxo>>;

    /// Script that receives change of transactions we build.
    async fn change_script(&self) -> Result<ScriptBuf>;

    /// Sign every input of `unsigned` and broadcast it.
    async fn sign_and_broadcast(&self, unsigned: &UnsignedTransaction) -> Result<Txid>;

    /// Broadcast a transaction that is already signed.
    async fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
}
