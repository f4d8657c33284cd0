use bitcoin::{Amount, Txid};
use log::info;

use super::SigmaAccount;
use crate::{
    backend::{ChainBackend, TransparentWallet},
    builder::{BuildPolicy, CpfpTarget, TxBuilder, TxOutput, UnsignedTransaction},
    coin::{mint_commitments_for_value, PrivateCoin},
    error::{Error, Result},
    oracle::SigmaOracle,
    store::CoinStore,
    FeeRate,
};

/// A funded mint transaction together with the coins it creates.
#[derive(Debug, Clone)]
pub struct MintTransaction {
    pub unsigned: UnsignedTransaction,
    /// Coins carried by the commitment outputs, in output order.
    pub coins: Vec<PrivateCoin>,
    pub next_index: u32,
}

impl<B, O, S, T> SigmaAccount<B, O, S, T>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    /// Build a transaction minting `amount`, funded by the transparent wallet.
    ///
    /// The amount is split over the denomination ladder. Whatever is left
    /// below the smallest denomination stays transparent.
    pub async fn build_mint_transaction(
        &self,
        amount: Amount,
        fee_rate: FeeRate,
        policy: BuildPolicy,
    ) -> Result<MintTransaction> {
        let start_index = self.next_index().await?;
        let (coins, next_index) = mint_commitments_for_value(
            &self.oracle,
            &self.config.denominations,
            amount,
            &self.private_key,
            start_index,
        )
        .await?;
        if coins.is_empty() {
            return Err(Error::InvalidDenomination(amount));
        }

        let outputs: Vec<TxOutput> = coins.iter().map(TxOutput::commitment).collect();
        let utxos = self.wallet.unspent_outputs().await?;
        let change_script = self.wallet.change_script().await?;

        let unsigned = TxBuilder::new(&utxos, change_script, fee_rate)
            .policy(policy)
            .dust_threshold(self.config.dust_threshold())
            .build(&outputs)?;

        Ok(MintTransaction {
            unsigned,
            coins,
            next_index,
        })
    }

    /// Mint `amount` and record the new coins as pending.
    ///
    /// # Returns
    /// * The txid of the broadcast mint transaction
    pub async fn mint(&self, amount: Amount, fee_rate: FeeRate) -> Result<Txid> {
        let MintTransaction { unsigned, coins, .. } = self
            .build_mint_transaction(amount, fee_rate, BuildPolicy::default())
            .await?;

        let txid = self.wallet.sign_and_broadcast(&unsigned).await?;

        let mut stored = self.store.load_coins().await?;
        let minted = coins.len();
        stored.extend(coins.into_iter().map(|mut coin| {
            coin.mark_minted(txid);
            coin
        }));
        self.store.save_coins(&stored).await?;

        info!(
            "minted {} in {} coins, txid {}, fee {}",
            amount, minted, txid, unsigned.fee
        );
        Ok(txid)
    }

    /// Speed up the unconfirmed transaction `parent` by spending its outputs
    /// back to the transparent wallet at `fee_rate`.
    ///
    /// At most `cpfp_limit` parent outputs are spent, largest first.
    pub async fn bump_fee_cpfp(&self, parent: Txid, fee_rate: FeeRate) -> Result<Txid> {
        let utxos = self.wallet.unspent_outputs().await?;
        let change_script = self.wallet.change_script().await?;
        let policy = BuildPolicy {
            cpfp: Some(CpfpTarget {
                parent,
                limit: self.config.cpfp_limit,
            }),
            ..Default::default()
        };

        let unsigned = TxBuilder::new(&utxos, change_script, fee_rate)
            .policy(policy)
            .dust_threshold(self.config.dust_threshold())
            .build(&[])?;
        let txid = self.wallet.sign_and_broadcast(&unsigned).await?;

        info!("bumped {} with child {}, fee {}", parent, txid, unsigned.fee);
        Ok(txid)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::{
        builder::BuildPolicy,
        coin::CoinState,
        constants::{OP_SIGMAMINT, UNASSIGNED_GROUP},
        error::Error,
    };
    use bitcoin::{hashes::Hash, Amount, Txid};

    #[tokio::test]
    async fn mint_records_pending_coins() {
        let account = account();
        account.wallet().fund(Amount::from_sat(200_000_000), Some(1));

        let txid = account
            .mint(Amount::from_sat(150_000_000), fee_rate())
            .await
            .unwrap();

        let coins = account.coins().await.unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].value, Amount::from_sat(100_000_000));
        assert_eq!(coins[1].value, Amount::from_sat(50_000_000));
        assert_eq!((coins[0].index, coins[1].index), (0, 1));
        for coin in &coins {
            assert_eq!(coin.group_id, UNASSIGNED_GROUP);
            assert_eq!(coin.mint_txid, Some(txid));
            assert_eq!(coin.state(), CoinState::Minted);
        }

        let balance = account.balance().await.unwrap();
        assert_eq!(balance.pending, Amount::from_sat(150_000_000));
        assert_eq!(balance.spendable, Amount::ZERO);

        let tx = &account.wallet().broadcasted()[0];
        let commitments = tx
            .output
            .iter()
            .filter(|o| o.script_pubkey.as_bytes()[0] == OP_SIGMAMINT)
            .count();
        assert_eq!(commitments, 2);

        // the next mint continues the index sequence
        assert_eq!(account.next_index().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn build_mint_leaves_remainder_transparent() {
        let account = account();
        account.wallet().fund(Amount::from_sat(20_000_000), Some(1));

        let mint = account
            .build_mint_transaction(
                Amount::from_sat(17_000_000),
                fee_rate(),
                BuildPolicy::default(),
            )
            .await
            .unwrap();

        assert_eq!(mint.coins.len(), 2);
        assert_eq!(mint.next_index, 2);
        assert_eq!(
            mint.unsigned.output_value() - mint.unsigned.change().unwrap().value,
            Amount::from_sat(15_000_000)
        );
        // building alone stores nothing
        assert!(account.coins().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mint_without_funds_fails_and_stores_nothing() {
        let account = account();
        account.wallet().fund(Amount::from_sat(5_000_000), Some(1));

        let res = account.mint(Amount::from_sat(5_000_000), fee_rate()).await;
        assert!(matches!(res, Err(Error::InsufficientFunds { .. })));
        assert!(account.coins().await.unwrap().is_empty());
        assert!(account.wallet().broadcasted().is_empty());
    }

    #[tokio::test]
    async fn amount_below_ladder_is_rejected() {
        let account = account();
        account.wallet().fund(Amount::from_sat(20_000_000), Some(1));

        let res = account.mint(Amount::from_sat(4_999_999), fee_rate()).await;
        assert!(matches!(res, Err(Error::InvalidDenomination(a)) if a == Amount::from_sat(4_999_999)));
    }

    #[tokio::test]
    async fn stuck_mint_is_bumped_through_its_change() {
        let account = account();
        account.wallet().fund(Amount::from_sat(30_000_000), None);
        let mint_txid = account
            .mint(Amount::from_sat(20_000_000), fee_rate())
            .await
            .unwrap();

        let child_txid = account
            .bump_fee_cpfp(mint_txid, crate::FeeRate::from_sat_per_vb(20.0))
            .await
            .unwrap();

        let broadcast = account.wallet().broadcasted();
        assert_eq!(broadcast.len(), 2);
        let child = &broadcast[1];
        assert_eq!(child.compute_txid(), child_txid);
        assert_eq!(child.input.len(), 1);
        assert_eq!(child.input[0].previous_output.txid, mint_txid);
        assert_eq!(child.output.len(), 1);
        assert_eq!(child.output[0].script_pubkey, change_script());

        let res = account
            .bump_fee_cpfp(Txid::all_zeros(), fee_rate())
            .await;
        assert!(matches!(res, Err(Error::TransactionNotFound(_))));
    }
}
