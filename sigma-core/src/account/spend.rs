use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, OutPoint, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Witness,
};
use futures::future::try_join_all;
use log::{info, warn};

use super::SigmaAccount;
use crate::{
    backend::{ChainBackend, TransparentWallet},
    builder::{SignedSpend, TxOutput, UnsignedSpend},
    coin::{
        create_private_coin, decompose, next_index, select_coins_to_spend, Balance, PrivateCoin,
        SpendCoin,
    },
    constants::SIGMA_SPEND_SCRIPT_WEIGHT,
    error::{Error, Result},
    oracle::SigmaOracle,
    store::CoinStore,
    FeeRate,
};

impl<B, O, S, T> SigmaAccount<B, O, S, T>
where
    B: ChainBackend,
    O: SigmaOracle,
    S: CoinStore,
    T: TransparentWallet,
{
    /// Build a transaction spending `coins` to `outputs`.
    ///
    /// The fee is paid from the coins. What is left over is minted back as
    /// change coins in the same transaction, and a residue below the smallest
    /// denomination goes to a transparent change output, or to the fee when
    /// it is dust.
    pub async fn build_spend_transaction(
        &self,
        coins: &[PrivateCoin],
        outputs: &[TxOutput],
        fee_rate: FeeRate,
    ) -> Result<UnsignedSpend> {
        if outputs.is_empty() {
            return Err(Error::NoOutputs);
        }
        if outputs.iter().any(TxOutput::is_commitment) {
            return Err(Error::InvalidOutputs("spend outputs must be transparent"));
        }
        if let Some(coin) = coins.iter().find(|c| !c.is_approved()) {
            return Err(Error::InvalidOutputs(if coin.is_spend {
                "coin is already spent"
            } else {
                "coin is not in a group yet"
            }));
        }

        let input: Amount = coins.iter().map(|c| c.value).sum();
        let requested: Amount = outputs.iter().map(TxOutput::value).sum();
        let inputs = spend_inputs(coins);
        let requested_outs: Vec<TxOut> = outputs.iter().map(TxOutput::to_txout).collect();

        let base_fee = spend_fee(&inputs, &requested_outs, fee_rate);
        let Some(overshoot) = input.checked_sub(requested + base_fee) else {
            return Err(Error::InsufficientFunds {
                missing: requested + base_fee - input,
            });
        };

        let change_script = self.wallet.change_script().await?;
        let dust = self.config.dust_threshold();

        // drop the smallest change coin until the rest still pays for itself
        let (mut denominations, _) = decompose(overshoot, &self.config.denominations);
        let (residue, fee) = loop {
            let change: Amount = denominations.iter().copied().sum();
            let mut outs = requested_outs.clone();
            outs.extend(denominations.iter().map(|d| change_placeholder(*d)));
            let fee = spend_fee(&inputs, &outs, fee_rate);

            let Some(rest) = input.checked_sub(requested + change + fee) else {
                if denominations.pop().is_none() {
                    break (Amount::ZERO, overshoot + base_fee);
                }
                continue;
            };

            outs.push(TxOut {
                value: rest,
                script_pubkey: change_script.clone(),
            });
            let residue_fee = spend_fee(&inputs, &outs, fee_rate);
            let residue = rest
                .checked_sub(residue_fee - fee)
                .unwrap_or(Amount::ZERO);
            if residue > Amount::ZERO && residue >= dust {
                break (residue, residue_fee);
            }
            break (Amount::ZERO, rest + fee);
        };

        let mut index = next_index(&self.store.load_coins().await?);
        let mut change_coins = Vec::with_capacity(denominations.len());
        for denomination in denominations {
            change_coins.push(
                create_private_coin(&self.oracle, denomination, &self.private_key, index).await?,
            );
            index += 1;
        }

        let mut tx_outputs = requested_outs;
        tx_outputs.extend(change_coins.iter().map(|c| TxOutput::commitment(c).to_txout()));
        if residue > Amount::ZERO {
            tx_outputs.push(TxOut {
                value: residue,
                script_pubkey: change_script,
            });
        }

        Ok(UnsignedSpend {
            tx: Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: inputs,
                output: tx_outputs,
            },
            coins: coins.to_vec(),
            change_coins,
            fee,
        })
    }

    /// Prove every input of `unsigned` against its group's anonymity set.
    pub async fn sign_spend(&self, unsigned: &UnsignedSpend) -> Result<SignedSpend> {
        let sets = try_join_all(
            unsigned
                .coins
                .iter()
                .map(|c| self.backend.anonymity_set(c.value, c.group_id)),
        )
        .await?;

        let spend_coins = unsigned
            .coins
            .iter()
            .zip(sets)
            .map(|(coin, set)| {
                let anonymity_set = set.ok_or(Error::GroupNotFound {
                    denomination: coin.value,
                    group_id: coin.group_id,
                })?;
                Ok(SpendCoin {
                    coin: coin.clone(),
                    anonymity_set,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.oracle
            .prove(unsigned, &spend_coins, &self.private_key)
            .await
    }

    /// Pay `outputs` from the spendable coins.
    ///
    /// Coins are marked spent and change coins stored only after the
    /// broadcast went through.
    pub async fn spend(&self, outputs: &[TxOutput], fee_rate: FeeRate) -> Result<SignedSpend> {
        let coins = self.store.load_coins().await?;
        let spendable = Balance::from_coins(&coins).spendable;
        let requested: Amount = outputs.iter().map(TxOutput::value).sum();
        let requested_outs: Vec<TxOut> = outputs.iter().map(TxOutput::to_txout).collect();

        // a selection of more coins costs more fee, so grow the fee until it is covered
        let mut fee = Amount::ZERO;
        let unsigned = loop {
            let target = requested + fee;
            let selected = select_coins_to_spend(&coins, target);
            if selected.is_empty() {
                return Err(Error::InsufficientFunds {
                    missing: target.checked_sub(spendable).unwrap_or(Amount::ZERO),
                });
            }

            let needed = spend_fee(&spend_inputs(&selected), &requested_outs, fee_rate);
            if needed > fee {
                fee = needed;
                continue;
            }
            break self
                .build_spend_transaction(&selected, outputs, fee_rate)
                .await?;
        };

        let signed = self.sign_spend(&unsigned).await?;
        let txid = self.wallet.broadcast(&signed.tx).await?;
        if txid != signed.txid {
            warn!("broadcast returned {} for spend {}", txid, signed.txid);
        }

        let mut stored = coins;
        for coin in stored.iter_mut() {
            if unsigned.coins.iter().any(|c| c.commitment == coin.commitment) {
                coin.mark_spent(signed.txid);
            }
        }
        stored.extend(signed.change_coins.iter().cloned().map(|mut coin| {
            coin.mark_minted(signed.txid);
            coin
        }));
        self.store.save_coins(&stored).await?;

        info!(
            "spent {} coins for {}, txid {}, fee {}, {} change coins",
            unsigned.coins.len(),
            requested,
            signed.txid,
            unsigned.fee,
            signed.change_coins.len()
        );
        Ok(signed)
    }
}

/// One input per coin: no previous output, the group id in the sequence and
/// an empty script until the proof is attached.
fn spend_inputs(coins: &[PrivateCoin]) -> Vec<TxIn> {
    coins
        .iter()
        .map(|c| TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence(c.group_id as u32),
            witness: Witness::new(),
        })
        .collect()
}

/// Stand-in for a change coin's output while its commitment is not derived yet.
fn change_placeholder(value: Amount) -> TxOut {
    TxOutput::Commitment {
        commitment: vec![0; 32],
        value,
    }
    .to_txout()
}

fn spend_fee(inputs: &[TxIn], outputs: &[TxOut], fee_rate: FeeRate) -> Amount {
    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs.to_vec(),
        output: outputs.to_vec(),
    };
    let weight = tx.weight().to_wu() + inputs.len() as u64 * SIGMA_SPEND_SCRIPT_WEIGHT;
    Amount::from_sat(fee_rate.implied_fee(weight))
}
