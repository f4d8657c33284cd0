//! Periodic wallet maintenance.
//!
//! One task per wallet runs a cycle, waits for the interval, and runs the
//! next one. A cycle:
//!
//! 1. restores the coin set if it was never restored
//! 2. mints idle transparent balance
//! 3. promotes pending coins whose group is deep enough
//! 4. reports the balance to the [`Notifier`]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bitcoin::{Amount, Txid};
use log::{error, info, warn};
use sigma_core::{
    Balance, ChainBackend, CoinStore, Notifier, Result, SigmaAccount, SigmaOracle,
    TransparentWallet,
};
use tokio::{
    sync::{Mutex, Notify},
    task::{JoinError, JoinHandle},
    time::timeout,
};

/// Account shared between the coordinator and user operations. Holding the
/// lock serializes every operation on the coin store.
pub type SharedAccount<B, O, S, T> = Arc<Mutex<SigmaAccount<B, O, S, T>>>;

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub restored: bool,
    /// Amount and txid of the automatic mint, if one happened.
    pub minted: Option<(Amount, Txid)>,
    /// Coins that became spendable.
    pub promoted: usize,
    pub balance: Balance,
}

pub struct Coordinator<B, O, S, T, N>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
    N: Notifier,
{
    account: SharedAccount<B, O, S, T>,
    notifier: N,
    interval: Duration,
}

impl<B, O, S, T, N> Coordinator<B, O, S, T, N>
where
    B: ChainBackend + 'static,
    O: SigmaOracle + 'static,
    S: CoinStore + 'static,
    T: TransparentWallet + 'static,
    N: Notifier + 'static,
{
    pub fn new(account: SharedAccount<B, O, S, T>, notifier: N, interval: Duration) -> Self {
        Self {
            account,
            notifier,
            interval,
        }
    }

    pub fn account(&self) -> SharedAccount<B, O, S, T> {
        self.account.clone()
    }

    /// Run one cycle while holding the account lock.
    ///
    /// A failed restore only skips the mint. Any other error ends the cycle
    /// early and is returned.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let account = self.account.lock().await;
        let mut report = CycleReport::default();

        let restored = match account.restore_if_needed().await {
            Ok(ran) => {
                report.restored = ran;
                true
            }
            Err(e) => {
                warn!("restore failed, skipping mint this cycle: {}", e);
                false
            }
        };

        if restored {
            report.minted = auto_mint(&account).await?;
        }

        report.promoted = account.refresh_group_metadata().await?;
        report.balance = account.balance().await?;
        self.notifier.balance_changed(report.balance).await;

        Ok(report)
    }

    /// Spawn the cycle loop on the current tokio runtime. The first cycle
    /// starts immediately.
    pub fn start(self) -> CoordinatorHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let join = tokio::spawn({
            let stop = stop.clone();
            let wake = wake.clone();
            async move {
                while !stop.load(Ordering::Relaxed) {
                    match self.run_cycle().await {
                        Ok(report) => info!(
                            "cycle done: minted {:?}, promoted {}, balance {:?}",
                            report.minted.map(|(amount, _)| amount),
                            report.promoted,
                            report.balance
                        ),
                        Err(e) => error!("cycle aborted: {}", e),
                    }

                    // a stop wakes us up early
                    let _ = timeout(self.interval, wake.notified()).await;
                }
                info!("coordinator stopped");
            }
        });

        CoordinatorHandle { stop, wake, join }
    }
}

/// Mint everything but one smallest denomination of the transparent
/// balance, retrying with one denomination less when funds run short.
async fn auto_mint<B, O, S, T>(account: &SigmaAccount<B, O, S, T>) -> Result<Option<(Amount, Txid)>>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    let config = account.config();
    let denomination = config.smallest_denomination();
    let balance = account.transparent_balance().await?;
    if balance <= denomination {
        return Ok(None);
    }

    let mut amount = denomination * (balance.to_sat() / denomination.to_sat()) - denomination;
    let mut retries = config.auto_mint_retries;
    while amount >= denomination {
        match account.mint(amount, config.mint_fee_rate()).await {
            Ok(txid) => return Ok(Some((amount, txid))),
            Err(e) if e.is_insufficient_funds() && retries > 0 => {
                info!("cannot mint {}, retrying with {} less: {}", amount, denomination, e);
                retries -= 1;
                amount -= denomination;
            }
            Err(e) if e.is_insufficient_funds() => {
                warn!("giving up on minting {}: {}", amount, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Handle to a running coordinator.
pub struct CoordinatorHandle {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    join: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Prevent further cycles. A cycle already running completes.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(self) -> std::result::Result<(), JoinError> {
        self.stop();
        self.join.await
    }
}
