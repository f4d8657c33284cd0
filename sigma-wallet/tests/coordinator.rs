use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use sigma_core::{
    Balance, DummyOracle, MemoryBackend, MemoryCoinStore, MemoryWallet, SigmaAccount, TxOutput,
    WalletConfig,
    bitcoin::{Amount, BlockHash, ScriptBuf, hashes::Hash, secp256k1::SecretKey},
};
use sigma_wallet::{Coordinator, CoinStore, Notifier, SharedAccount};

type Account = SharedAccount<MemoryBackend, DummyOracle, MemoryCoinStore, MemoryWallet>;

#[derive(Clone, Default)]
struct RecordingNotifier {
    balances: Arc<Mutex<Vec<Balance>>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.balances.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn balance_changed(&self, balance: Balance) {
        self.balances.lock().unwrap().push(balance);
    }
}

fn change_script() -> ScriptBuf {
    ScriptBuf::from_bytes(vec![0x51])
}

fn shared_account(backend: MemoryBackend, config: WalletConfig) -> Account {
    Arc::new(tokio::sync::Mutex::new(SigmaAccount::new(
        backend,
        DummyOracle::new(),
        MemoryCoinStore::new(),
        MemoryWallet::new(change_script()),
        SecretKey::from_slice(&[9; 32]).unwrap(),
        config,
    )))
}

fn coordinator(
    account: &Account,
    notifier: &RecordingNotifier,
    interval: Duration,
) -> Coordinator<MemoryBackend, DummyOracle, MemoryCoinStore, MemoryWallet, RecordingNotifier> {
    Coordinator::new(account.clone(), notifier.clone(), interval)
}

#[tokio::test]
async fn cycle_mints_idle_balance_and_notifies() {
    let account = shared_account(MemoryBackend::new(), WalletConfig::default());
    account
        .lock()
        .await
        .wallet()
        .fund(Amount::from_sat(25_300_000), Some(1));
    let notifier = RecordingNotifier::default();
    let coordinator = coordinator(&account, &notifier, Duration::from_secs(60));

    let report = coordinator.run_cycle().await.unwrap();
    assert!(report.restored);
    let (amount, _) = report.minted.unwrap();
    // one smallest denomination stays transparent
    assert_eq!(amount, Amount::from_sat(20_000_000));
    assert_eq!(report.balance.pending, Amount::from_sat(20_000_000));
    assert_eq!(notifier.count(), 1);

    let report = coordinator.run_cycle().await.unwrap();
    assert!(!report.restored);
    assert_eq!(report.minted, None);
    assert_eq!(notifier.count(), 2);
    assert_eq!(
        notifier.balances.lock().unwrap()[1].pending,
        Amount::from_sat(20_000_000)
    );
}

#[tokio::test]
async fn short_funds_retry_one_denomination_less() {
    let config = WalletConfig {
        mint_fee_rate: 30_000.0,
        ..Default::default()
    };
    let account = shared_account(MemoryBackend::new(), config);
    account
        .lock()
        .await
        .wallet()
        .fund(Amount::from_sat(25_000_000), Some(1));
    let coordinator = coordinator(
        &account,
        &RecordingNotifier::default(),
        Duration::from_secs(60),
    );

    let report = coordinator.run_cycle().await.unwrap();
    let (amount, _) = report.minted.unwrap();
    assert_eq!(amount, Amount::from_sat(15_000_000));
}

#[tokio::test]
async fn failed_restore_skips_mint() {
    let backend = MemoryBackend::new();
    let account = shared_account(backend.clone(), WalletConfig::default());
    account
        .lock()
        .await
        .wallet()
        .fund(Amount::from_sat(30_000_000), Some(1));
    let notifier = RecordingNotifier::default();
    let coordinator = coordinator(&account, &notifier, Duration::from_secs(60));

    backend.set_offline(true);
    let report = coordinator.run_cycle().await.unwrap();
    assert!(!report.restored);
    assert_eq!(report.minted, None);
    assert_eq!(notifier.count(), 1);
    assert!(!account.lock().await.store().is_restored().await.unwrap());

    backend.set_offline(false);
    let report = coordinator.run_cycle().await.unwrap();
    assert!(report.restored);
    assert!(report.minted.is_some());
}

#[tokio::test]
async fn minted_coins_become_spendable() {
    let backend = MemoryBackend::new();
    let account = shared_account(backend.clone(), WalletConfig::default());
    account
        .lock()
        .await
        .wallet()
        .fund(Amount::from_sat(160_000_000), Some(1));
    let coordinator = coordinator(
        &account,
        &RecordingNotifier::default(),
        Duration::from_secs(60),
    );

    let report = coordinator.run_cycle().await.unwrap();
    let (amount, txid) = report.minted.unwrap();
    assert_eq!(amount, Amount::from_sat(155_000_000));

    // the chain picks the mint up and forms groups
    let mint_tx = {
        let account = account.lock().await;
        account
            .wallet()
            .broadcasted()
            .into_iter()
            .find(|tx| tx.compute_txid() == txid)
            .unwrap()
    };
    assert_eq!(backend.add_mints_from(&mint_tx, 200), 3);
    for denomination in WalletConfig::default().denominations() {
        backend.close_group(denomination, 1, BlockHash::all_zeros());
    }
    backend.set_height(205);

    let report = coordinator.run_cycle().await.unwrap();
    assert_eq!(report.promoted, 3);
    assert_eq!(report.balance.spendable, Amount::from_sat(155_000_000));

    // user operations take the same lock
    let signed = account
        .lock()
        .await
        .spend(
            &[TxOutput::standard(
                ScriptBuf::from_bytes(vec![0x00, 0x14]),
                Amount::from_sat(45_000_000),
            )],
            sigma_core::FeeRate::from_sat_per_vb(1.0),
        )
        .await
        .unwrap();
    // the 50M coin covers it, the rest is too small for a change coin
    assert_eq!(signed.tx.input.len(), 1);
    assert!(signed.change_coins.is_empty());

    let balance = account.lock().await.balance().await.unwrap();
    assert_eq!(balance.spendable, Amount::from_sat(105_000_000));
}

async fn wait_for_cycles(notifier: &RecordingNotifier, cycles: usize) {
    for _ in 0..500 {
        if notifier.count() >= cycles {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("coordinator did not run {cycles} cycles");
}

#[tokio::test]
async fn shutdown_stops_a_waiting_loop() {
    let account = shared_account(MemoryBackend::new(), WalletConfig::default());
    let notifier = RecordingNotifier::default();
    let handle = coordinator(&account, &notifier, Duration::from_secs(3600)).start();

    wait_for_cycles(&notifier, 1).await;
    assert!(!handle.is_stopped());

    // the hour long wait is cut short
    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn stop_prevents_further_cycles() {
    let account = shared_account(MemoryBackend::new(), WalletConfig::default());
    let notifier = RecordingNotifier::default();
    let handle = coordinator(&account, &notifier, Duration::from_millis(5)).start();

    wait_for_cycles(&notifier, 3).await;
    handle.stop();
    assert!(handle.is_stopped());

    for _ in 0..500 {
        if handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_finished());

    let cycles = notifier.count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), cycles);
}
