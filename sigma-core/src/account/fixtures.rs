use bitcoin::{hashes::Hash, secp256k1::SecretKey, Amount, BlockHash, ScriptBuf, Txid};

use super::SigmaAccount;
use crate::{
    backend::{MemoryBackend, MemoryWallet},
    config::WalletConfig,
    oracle::DummyOracle,
    store::MemoryCoinStore,
    FeeRate,
};

pub(crate) type TestAccount = SigmaAccount<MemoryBackend, DummyOracle, MemoryCoinStore, MemoryWallet>;

pub(crate) fn change_script() -> ScriptBuf {
    ScriptBuf::from_bytes(vec![0x51])
}

pub(crate) fn private_key() -> SecretKey {
    SecretKey::from_slice(&[7; 32]).unwrap()
}

pub(crate) fn fee_rate() -> FeeRate {
    FeeRate::from_sat_per_vb(1.0)
}

pub(crate) fn account_with(oracle: DummyOracle, backend: MemoryBackend) -> TestAccount {
    SigmaAccount::new(
        backend,
        oracle,
        MemoryCoinStore::new(),
        MemoryWallet::new(change_script()),
        private_key(),
        WalletConfig::default(),
    )
}

pub(crate) fn account() -> TestAccount {
    account_with(DummyOracle::new(), MemoryBackend::new())
}

/// Close one group per denomination, numbered `group_id`.
pub(crate) fn close_groups(backend: &MemoryBackend, group_id: i32) {
    for denomination in WalletConfig::default().denominations() {
        backend.close_group(denomination, group_id, BlockHash::all_zeros());
    }
}

/// Mint `amount` from a fresh transparent output, mine it at `height` and
/// make the coins spendable.
pub(crate) async fn mint_spendable(account: &TestAccount, amount: Amount, height: u32) -> Txid {
    account.wallet().fund(amount + Amount::from_sat(1_000_000), Some(height));
    let txid = account.mint(amount, fee_rate()).await.unwrap();

    let tx = account
        .wallet()
        .broadcasted()
        .into_iter()
        .find(|tx| tx.compute_txid() == txid)
        .unwrap();
    account.backend().add_mints_from(&tx, height);
    close_groups(account.backend(), 1);

    account
        .backend()
        .set_height(height + account.config().group_confirmations);
    account.refresh_group_metadata().await.unwrap();
    txid
}
