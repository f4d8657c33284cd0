use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bitcoin::{
    bip32::{self, ChildNumber},
    secp256k1::{Secp256k1, SecretKey},
    Amount, Network,
};

use crate::{
    backend::{ChainBackend, TransparentWallet},
    coin::{self, Balance, PrivateCoin},
    config::WalletConfig,
    error::{Error, Result},
    oracle::SigmaOracle,
    store::CoinStore,
};

mod metadata;
mod mint;
mod restore;
mod spend;

#[cfg(test)]
pub(crate) mod fixtures;

pub use mint::MintTransaction;

/// BIP44 coin type of Firo.
const COIN_TYPE: u32 = 136;
/// Purpose-level branch holding the Sigma master key.
const SIGMA_BRANCH: u32 = 2;

/// A Sigma wallet: the private coins derived from one master key, and the
/// collaborators needed to mint, spend and restore them.
pub struct SigmaAccount<B, O, S, T>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    backend: B,
    oracle: O,
    store: S,
    wallet: T,
    config: WalletConfig,
    private_key: SecretKey,
    stop: Arc<AtomicBool>,
}

impl<B, O, S, T> SigmaAccount<B, O, S, T>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    pub fn new(
        backend: B,
        oracle: O,
        store: S,
        wallet: T,
        private_key: SecretKey,
        config: WalletConfig,
    ) -> Self {
        Self {
            backend,
            oracle,
            store,
            wallet,
            config,
            private_key,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Derive the Sigma master key at `m/44'/136'/account'/2'` of `seed`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_from_seed(
        seed: &[u8],
        network: Network,
        account: u32,
        backend: B,
        oracle: O,
        store: S,
        wallet: T,
        config: WalletConfig,
    ) -> Result<Self> {
        let secp = Secp256k1::new();
        let master_xpriv =
            bip32::Xpriv::new_master(network, seed).map_err(|_| Error::SeedDerivation)?;

        let path = [
            ChildNumber::from_hardened_idx(44)?,
            ChildNumber::from_hardened_idx(COIN_TYPE)?,
            ChildNumber::from_hardened_idx(account)?,
            ChildNumber::from_hardened_idx(SIGMA_BRANCH)?,
        ];
        let private_key = master_xpriv
            .derive_priv(&secp, &path)
            .map_err(|_| Error::KeyDerivation("sigma"))?
            .private_key;

        Ok(Self::new(backend, oracle, store, wallet, private_key, config))
    }

    /// Share `stop` with the caller, so a long restore can be interrupted.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn interrupt_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn wallet(&self) -> &T {
        &self.wallet
    }

    pub async fn coins(&self) -> Result<Vec<PrivateCoin>> {
        self.store.load_coins().await
    }

    pub async fn balance(&self) -> Result<Balance> {
        Ok(Balance::from_coins(&self.coins().await?))
    }

    /// Sum of the transparent wallet's unspent outputs.
    pub async fn transparent_balance(&self) -> Result<Amount> {
        Ok(self
            .wallet
            .unspent_outputs()
            .await?
            .iter()
            .map(|u| u.value)
            .sum())
    }

    /// First derivation index no stored coin uses.
    pub async fn next_index(&self) -> Result<u32> {
        Ok(coin::next_index(&self.coins().await?))
    }
}
