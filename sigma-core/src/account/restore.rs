use bitcoin::Amount;
use log::info;

use super::SigmaAccount;
use crate::{
    backend::{ChainBackend, TransparentWallet},
    coin::{create_private_coin, CoinGroup, PrivateCoin},
    error::{Error, Result},
    oracle::SigmaOracle,
    store::CoinStore,
};

impl<B, O, S, T> SigmaAccount<B, O, S, T>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    /// Restore once: only runs when the store has no restore marker.
    ///
    /// # Returns
    /// * Whether a restore ran
    pub async fn restore_if_needed(&self) -> Result<bool> {
        if self.store.is_restored().await? {
            return Ok(false);
        }
        self.restore().await?;
        Ok(true)
    }

    /// Rebuild the coin set from the master key and the published groups.
    ///
    /// Derivation indices are scanned from 0 until `restore_gap_limit`
    /// consecutive indices matched nothing and at least as many indices as
    /// there are published commitments were tried. Stored coins that were
    /// not found, such as mints still waiting for a group, are kept.
    ///
    /// # Returns
    /// * The number of coins found on-chain
    pub async fn restore(&self) -> Result<usize> {
        let groups = self.coin_groups().await?;
        let used_serials = self.backend.used_serials().await?;

        let total_commitments: usize = groups
            .iter()
            .map(|g| g.anonymity_set.commitments.len())
            .sum();
        let mut denominations: Vec<Amount> = vec![];
        for group in &groups {
            if !denominations.contains(&group.denomination) {
                denominations.push(group.denomination);
            }
        }

        info!(
            "restore: {} groups, {} commitments",
            groups.len(),
            total_commitments
        );

        let mut found: Vec<PrivateCoin> = vec![];
        let mut misses = 0;
        let mut index: u32 = 0;
        while misses < self.config.restore_gap_limit || (index as usize) < total_commitments {
            // stop scanning and return if interrupted
            if self.interrupt_requested() {
                return Err(Error::Interrupted);
            }

            let mut hit = false;
            for &denomination in &denominations {
                let mut coin =
                    create_private_coin(&self.oracle, denomination, &self.private_key, index)
                        .await?;
                let Some(group) = groups
                    .iter()
                    .find(|g| g.denomination == denomination && g.contains(&coin.commitment))
                else {
                    continue;
                };

                coin.group_id = group.id;
                coin.is_spend = used_serials.contains(&coin.serial_number);
                found.push(coin);
                hit = true;
            }

            if hit {
                misses = 0;
            } else {
                misses += 1;
            }
            index += 1;

            if index % 100 == 0 {
                info!("restore: scanned {} indices, found {} coins", index, found.len());
            }
        }

        let restored = found.len();
        let mut coins = self.store.load_coins().await?;
        for coin in &mut found {
            if let Some(stored) = coins.iter().find(|c| c.commitment == coin.commitment) {
                merge_stored(coin, stored);
            }
        }
        coins.retain(|c| !found.iter().any(|f| f.commitment == c.commitment));
        found.extend(coins);

        self.store.save_coins(&found).await?;
        self.store.mark_restored().await?;

        info!(
            "restore finished after {} indices: {} coins, {} spent",
            index,
            restored,
            found.iter().filter(|c| c.is_spend).count()
        );
        Ok(restored)
    }

    /// Every published group, with its anonymity set.
    async fn coin_groups(&self) -> Result<Vec<CoinGroup>> {
        let mut groups = vec![];
        for latest in self.backend.latest_groups().await? {
            for id in 0..=latest.id {
                if let Some(anonymity_set) =
                    self.backend.anonymity_set(latest.denomination, id).await?
                {
                    groups.push(CoinGroup {
                        denomination: latest.denomination,
                        id,
                        anonymity_set,
                    });
                }
            }
        }
        Ok(groups)
    }
}

/// Carry what only the local record knows into a coin found on-chain.
/// A spend recorded locally stays spent even if its serial is not published.
fn merge_stored(found: &mut PrivateCoin, stored: &PrivateCoin) {
    if stored.is_spend {
        found.is_spend = true;
    }
    found.spend_txid = stored.spend_txid.or(found.spend_txid);
    found.mint_txid = stored.mint_txid.or(found.mint_txid);
    found.mint_height = stored.mint_height.or(found.mint_height);
}
