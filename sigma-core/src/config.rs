//! Wallet configuration.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides:
//!
//! ```json
//! { "group_confirmations": 6, "cycle_interval_secs": 30 }
//! ```

use std::{path::Path, time::Duration};

use bitcoin::Amount;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DENOMINATIONS, DUST_THRESHOLD, GROUP_CONFIRMATIONS, RESTORE_GAP_LIMIT},
    error::{Error, Result},
    FeeRate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Ascending denomination ladder, in satoshis.
    pub denominations: Vec<u64>,
    pub group_confirmations: u32,
    pub restore_gap_limit: u32,
    pub cycle_interval_secs: u64,
    /// Fee rate used by automatic mints, in sat/vB.
    pub mint_fee_rate: f32,
    /// Maximum number of parent outputs a CPFP child spends, 0 for unbounded.
    pub cpfp_limit: usize,
    /// How many times an auto-mint is retried with one denomination less.
    pub auto_mint_retries: u32,
    pub dust_threshold: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            denominations: DENOMINATIONS.to_vec(),
            group_confirmations: GROUP_CONFIRMATIONS,
            restore_gap_limit: RESTORE_GAP_LIMIT,
            cycle_interval_secs: 60,
            mint_fee_rate: 1.0,
            cpfp_limit: 0,
            auto_mint_retries: 1,
            dust_threshold: DUST_THRESHOLD.to_sat(),
        }
    }
}

impl WalletConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.denominations.is_empty() {
            return Err(Error::Config("denomination ladder is empty".to_string()));
        }
        if self.denominations.contains(&0) {
            return Err(Error::Config("denomination of zero".to_string()));
        }
        if !self.denominations.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::Config(
                "denomination ladder must be strictly ascending".to_string(),
            ));
        }
        if self.mint_fee_rate.is_nan() || self.mint_fee_rate < 0.0 {
            return Err(Error::Config(format!(
                "invalid mint fee rate {}",
                self.mint_fee_rate
            )));
        }
        Ok(())
    }

    pub fn denominations(&self) -> impl DoubleEndedIterator<Item = Amount> + '_ {
        self.denominations.iter().map(|d| Amount::from_sat(*d))
    }

    pub fn smallest_denomination(&self) -> Amount {
        Amount::from_sat(self.denominations.first().copied().unwrap_or(DENOMINATIONS[0]))
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn mint_fee_rate(&self) -> FeeRate {
        FeeRate::from_sat_per_vb(self.mint_fee_rate)
    }

    pub fn dust_threshold(&self) -> Amount {
        Amount::from_sat(self.dust_threshold)
    }
}
