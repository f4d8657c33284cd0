use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::CoinStore;
use crate::{coin::PrivateCoin, error::Result};

const COINS_FILE: &str = "coins.json";
const RESTORE_MARKER_FILE: &str = "restored.json";

#[derive(Debug, Serialize, Deserialize)]
struct RestoreMarker {
    restored: bool,
}

/// Coin store backed by JSON files in one directory.
///
/// Every write goes to a temporary file first, which is then renamed over the
/// target. File access is blocking `std::fs`, done inline on the calling task.
#[derive(Debug, Clone)]
pub struct FileCoinStore {
    dir: PathBuf,
}

impl FileCoinStore {
    /// Open the store in `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn write_atomic<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));

        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &target)?;

        debug!("wrote {}", target.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl CoinStore for FileCoinStore {
    async fn load_coins(&self) -> Result<Vec<PrivateCoin>> {
        let path = self.dir.join(COINS_FILE);
        if !path.exists() {
            return Ok(vec![]);
        }
        let json = fs::read(path)?;
        Ok(serde_json::from_slice(&json)?)
    }

    async fn save_coins(&self, coins: &[PrivateCoin]) -> Result<()> {
        self.write_atomic(COINS_FILE, coins)
    }

    async fn is_restored(&self) -> Result<bool> {
        let path = self.dir.join(RESTORE_MARKER_FILE);
        if !path.exists() {
            return Ok(false);
        }
        let marker: RestoreMarker = serde_json::from_slice(&fs::read(path)?)?;
        Ok(marker.restored)
    }

    async fn mark_restored(&self) -> Result<()> {
        self.write_atomic(RESTORE_MARKER_FILE, &RestoreMarker { restored: true })
    }
}
