use log::{debug, info};

use super::SigmaAccount;
use crate::{
    backend::{ChainBackend, TransparentWallet},
    coin::MintQuery,
    constants::UNASSIGNED_GROUP,
    error::Result,
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
    /// Move pending coins into their anonymity-set group once they are deep
    /// enough in the chain.
    ///
    /// # Returns
    /// * The number of coins that became spendable
    pub async fn refresh_group_metadata(&self) -> Result<usize> {
        let mut coins = self.store.load_coins().await?;

        let queries: Vec<MintQuery> = coins
            .iter()
            .filter(|c| c.is_pending() && !c.commitment.is_empty())
            .map(|c| c.mint_query())
            .collect();
        if queries.is_empty() {
            return Ok(0);
        }

        let height = self.backend.block_height().await?.to_consensus_u32();
        let metadata = self.backend.mint_metadata(&queries).await?;

        let mut changed = false;
        let mut promoted = 0;
        for coin in coins.iter_mut().filter(|c| c.is_pending()) {
            let Some(meta) = metadata.iter().find(|m| m.commitment == coin.commitment) else {
                continue;
            };

            if meta.height.is_some() && coin.mint_height != meta.height {
                coin.mint_height = meta.height;
                changed = true;
            }

            let deep_enough = coin
                .mint_height
                .is_some_and(|h| height.saturating_sub(h) >= self.config.group_confirmations);
            if meta.group_id != UNASSIGNED_GROUP && deep_enough {
                coin.group_id = meta.group_id;
                promoted += 1;
                changed = true;
            }
        }

        if changed {
            self.store.save_coins(&coins).await?;
        }

        if promoted > 0 {
            info!("{} coins became spendable at height {}", promoted, height);
        } else {
            debug!("no coins promoted at height {}", height);
        }
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::constants::UNASSIGNED_GROUP;
    use bitcoin::Amount;

    #[tokio::test]
    async fn group_is_assigned_only_after_confirmations() {
        let account = account();
        account.wallet().fund(Amount::from_sat(200_000_000), Some(1));
        let txid = account
            .mint(Amount::from_sat(150_000_000), fee_rate())
            .await
            .unwrap();

        // not mined yet
        account.backend().set_height(100);
        assert_eq!(account.refresh_group_metadata().await.unwrap(), 0);

        let tx = account.wallet().broadcasted()[0].clone();
        assert_eq!(tx.compute_txid(), txid);
        assert_eq!(account.backend().add_mints_from(&tx, 100), 2);
        close_groups(account.backend(), 1);

        account.backend().set_height(104);
        assert_eq!(account.refresh_group_metadata().await.unwrap(), 0);
        let coins = account.coins().await.unwrap();
        assert!(coins.iter().all(|c| c.group_id == UNASSIGNED_GROUP));
        assert!(coins.iter().all(|c| c.mint_height == Some(100)));

        account.backend().set_height(105);
        assert_eq!(account.refresh_group_metadata().await.unwrap(), 2);
        let coins = account.coins().await.unwrap();
        assert!(coins.iter().all(|c| c.group_id == 1));
        assert_eq!(
            account.balance().await.unwrap().spendable,
            Amount::from_sat(150_000_000)
        );

        // nothing pending anymore
        assert_eq!(account.refresh_group_metadata().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mined_but_ungrouped_coins_stay_pending() {
        let account = account();
        account.wallet().fund(Amount::from_sat(20_000_000), Some(1));
        account
            .mint(Amount::from_sat(10_000_000), fee_rate())
            .await
            .unwrap();

        let tx = account.wallet().broadcasted()[0].clone();
        account.backend().add_mints_from(&tx, 10);
        account.backend().set_height(500);

        assert_eq!(account.refresh_group_metadata().await.unwrap(), 0);
        assert_eq!(
            account.balance().await.unwrap().pending,
            Amount::from_sat(10_000_000)
        );
    }
}
