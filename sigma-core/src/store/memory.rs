use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use super::CoinStore;
use crate::{
    coin::PrivateCoin,
    error::{Error, Result},
};

#[derive(Debug, Default)]
struct StoreState {
    coins: Vec<PrivateCoin>,
    restored: bool,
}

#[derive(Debug, Default)]
pub struct MemoryCoinStore {
    state: Mutex<StoreState>,
    fail_writes: AtomicBool,
}

impl MemoryCoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coins(coins: Vec<PrivateCoin>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                coins,
                restored: false,
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make `save_coins` and `mark_restored` fail until set back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::other("store is read-only")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CoinStore for MemoryCoinStore {
    async fn load_coins(&self) -> Result<Vec<PrivateCoin>> {
        Ok(self.state().coins.clone())
    }

    async fn save_coins(&self, coins: &[PrivateCoin]) -> Result<()> {
        self.check_writable()?;
        self.state().coins = coins.to_vec();
        Ok(())
    }

    async fn is_restored(&self) -> Result<bool> {
        Ok(self.state().restored)
    }

    async fn mark_restored(&self) -> Result<()> {
        self.check_writable()?;
        self.state().restored = true;
        Ok(())
    }
}
