use bdk_coin_select::{
    Candidate, ChangePolicy, CoinSelector, DrainWeights, FeeRate, Target, TargetFee,
    TargetOutputs,
};
use bitcoin::{
    absolute::LockTime, consensus::encode::serialize, transaction::Version, Amount, ScriptBuf,
    Transaction, TxIn, TxOut, Witness,
};
use log::debug;

use super::{BuildPolicy, CpfpTarget, SelectionStrategy, TxOutput, UnsignedTransaction, Utxo};
use crate::{
    constants::{
        COINBASE_MATURITY, DUST_THRESHOLD, FINAL_SEQUENCE, P2PKH_INPUT_WEIGHT,
        P2PKH_SCRIPT_SIG_WEIGHT, RBF_SEQUENCE,
    },
    error::{Error, Result},
};

pub struct TxBuilder<'a> {
    utxos: &'a [Utxo],
    change_script: ScriptBuf,
    fee_rate: FeeRate,
    policy: BuildPolicy,
    dust_threshold: Amount,
}

impl<'a> TxBuilder<'a> {
    pub fn new(utxos: &'a [Utxo], change_script: ScriptBuf, fee_rate: FeeRate) -> Self {
        Self {
            utxos,
            change_script,
            fee_rate,
            policy: BuildPolicy::default(),
            dust_threshold: DUST_THRESHOLD,
        }
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dust_threshold(mut self, dust_threshold: Amount) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }

    /// Fund `outputs` from the available utxos.
    pub fn build(&self, outputs: &[TxOutput]) -> Result<UnsignedTransaction> {
        let unsigned = match self.policy.cpfp {
            Some(cpfp) => self.build_cpfp(cpfp, outputs)?,
            None if outputs.is_empty() => return Err(Error::NoOutputs),
            None if self.policy.subtract_fee_from_outputs => self.build_subtract_fee(outputs)?,
            None => self.build_standard(outputs)?,
        };

        if let Some(height) = self.policy.target_height {
            check_context(&unsigned, height)?;
        }

        debug!(
            "built tx with {} inputs, {} outputs, fee {}",
            unsigned.tx.input.len(),
            unsigned.tx.output.len(),
            unsigned.fee
        );

        Ok(unsigned)
    }

    fn build_standard(&self, outputs: &[TxOutput]) -> Result<UnsignedTransaction> {
        let txouts: Vec<TxOut> = outputs.iter().map(TxOutput::to_txout).collect();
        let target = Target {
            fee: TargetFee::from_feerate(self.fee_rate),
            outputs: fund_outputs(&txouts),
        };

        let utxos = self.ordered_utxos();
        let candidates = candidates(&utxos);
        let mut selector = CoinSelector::new(&candidates);
        selector.select_until_target_met(target)?;

        let change_policy =
            ChangePolicy::min_value(DrainWeights::TR_KEYSPEND, self.dust_threshold.to_sat());
        let drain = selector.drain(target, change_policy);

        let inputs: Vec<Utxo> = selector.apply_selection(&utxos).cloned().collect();

        let mut txouts = txouts;
        let mut change_index = None;
        if drain.is_some() {
            change_index = Some(txouts.len());
            txouts.push(TxOut {
                value: Amount::from_sat(drain.value),
                script_pubkey: self.change_script.clone(),
            });
        }

        self.finish(inputs, txouts, change_index)
    }

    fn build_subtract_fee(&self, outputs: &[TxOutput]) -> Result<UnsignedTransaction> {
        let standard: Vec<usize> = outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_commitment())
            .map(|(i, _)| i)
            .collect();
        if standard.is_empty() {
            return Err(Error::InvalidOutputs(
                "no standard output to subtract the fee from",
            ));
        }

        let mut txouts: Vec<TxOut> = outputs.iter().map(TxOutput::to_txout).collect();
        // the outputs carry the fee, so only their value has to be covered
        let target = Target {
            fee: TargetFee::from_feerate(FeeRate::from_sat_per_vb(0.0)),
            outputs: fund_outputs(&txouts),
        };

        let utxos = self.ordered_utxos();
        let candidates = candidates(&utxos);
        let mut selector = CoinSelector::new(&candidates);
        selector.select_until_target_met(target)?;
        let inputs: Vec<Utxo> = selector.apply_selection(&utxos).cloned().collect();

        let input_value: Amount = inputs.iter().map(|u| u.value).sum();
        let output_value: Amount = txouts.iter().map(|o| o.value).sum();
        let excess = input_value - output_value;

        let mut fee = self.estimate_fee(&self.assemble(&inputs, txouts.clone()));

        // excess beyond the fee goes back to change, never below dust
        let mut change = None;
        if excess.checked_sub(fee).is_some_and(|left| left >= self.dust_threshold) {
            let mut with_change = txouts.clone();
            with_change.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: self.change_script.clone(),
            });
            fee = self.estimate_fee(&self.assemble(&inputs, with_change));
            change = Some(
                excess
                    .checked_sub(fee)
                    .filter(|value| *value >= self.dust_threshold)
                    .unwrap_or(self.dust_threshold),
            );
        }

        let needed = fee + change.unwrap_or(Amount::ZERO);
        let shortfall = needed.checked_sub(excess).unwrap_or(Amount::ZERO);

        let n = standard.len() as u64;
        let share = shortfall.to_sat() / n;
        let rest = shortfall.to_sat() % n;
        for (pos, i) in standard.into_iter().enumerate() {
            let deduction = Amount::from_sat(share + if pos == 0 { rest } else { 0 });
            let out = &mut txouts[i];
            match out.value.checked_sub(deduction) {
                Some(value) if value >= self.dust_threshold => out.value = value,
                _ => {
                    return Err(Error::InsufficientFunds {
                        missing: (deduction + self.dust_threshold) - out.value,
                    })
                }
            }
        }

        let mut change_index = None;
        if let Some(value) = change {
            change_index = Some(txouts.len());
            txouts.push(TxOut {
                value,
                script_pubkey: self.change_script.clone(),
            });
        }

        self.finish(inputs, txouts, change_index)
    }

    fn build_cpfp(&self, cpfp: CpfpTarget, outputs: &[TxOutput]) -> Result<UnsignedTransaction> {
        let mut inputs: Vec<Utxo> = self
            .utxos
            .iter()
            .filter(|u| u.outpoint.txid == cpfp.parent)
            .cloned()
            .collect();
        if inputs.is_empty() {
            return Err(Error::TransactionNotFound(cpfp.parent));
        }

        inputs.sort_by(|a, b| b.value.cmp(&a.value));
        if cpfp.limit > 0 {
            inputs.truncate(cpfp.limit);
        }

        let mut txouts: Vec<TxOut> = outputs.iter().map(TxOutput::to_txout).collect();
        let change_index = txouts.len();
        txouts.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: self.change_script.clone(),
        });

        let input_value: Amount = inputs.iter().map(|u| u.value).sum();
        let requested: Amount = outputs.iter().map(TxOutput::value).sum();
        let fee = self.estimate_fee(&self.assemble(&inputs, txouts.clone()));

        let needed = requested + fee + self.dust_threshold;
        if input_value < needed {
            return Err(Error::InsufficientFunds {
                missing: needed - input_value,
            });
        }
        txouts[change_index].value = input_value - requested - fee;

        self.finish(inputs, txouts, Some(change_index))
    }

    fn finish(
        &self,
        inputs: Vec<Utxo>,
        outputs: Vec<TxOut>,
        change_index: Option<usize>,
    ) -> Result<UnsignedTransaction> {
        let tx = self.assemble(&inputs, outputs);

        let input_value: Amount = inputs.iter().map(|u| u.value).sum();
        let output_value: Amount = tx.output.iter().map(|o| o.value).sum();
        let fee = input_value.checked_sub(output_value).ok_or_else(|| {
            Error::insufficient_funds((output_value - input_value).to_sat())
        })?;

        Ok(UnsignedTransaction {
            tx,
            inputs,
            fee,
            change_index,
        })
    }

    fn assemble(&self, inputs: &[Utxo], outputs: Vec<TxOut>) -> Transaction {
        let sequence = if self.policy.rbf {
            RBF_SEQUENCE
        } else {
            FINAL_SEQUENCE
        };

        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs
                .iter()
                .map(|u| TxIn {
                    previous_output: u.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs,
        }
    }

    fn estimate_fee(&self, tx: &Transaction) -> Amount {
        let weight = tx.weight().to_wu() + tx.input.len() as u64 * P2PKH_SCRIPT_SIG_WEIGHT;
        Amount::from_sat(self.fee_rate.implied_fee(weight))
    }

    fn ordered_utxos(&self) -> Vec<Utxo> {
        let mut utxos = self.utxos.to_vec();
        match self.policy.strategy {
            SelectionStrategy::LargestFirst => utxos.sort_by(|a, b| b.value.cmp(&a.value)),
            SelectionStrategy::OldestFirst => {
                utxos.sort_by_key(|u| u.confirm_height.unwrap_or(u32::MAX))
            }
            SelectionStrategy::InOrder => {}
        }
        utxos
    }
}

/// Check that every input of `unsigned` may be spent in a block at `height`.
pub fn check_context(unsigned: &UnsignedTransaction, height: u32) -> Result<()> {
    for utxo in &unsigned.inputs {
        match utxo.confirm_height {
            Some(confirmed) if confirmed > height => {
                return Err(Error::ContextCheckFailed(format!(
                    "input {} confirmed at {} after target height {}",
                    utxo.outpoint, confirmed, height
                )));
            }
            Some(confirmed) if utxo.is_coinbase && height - confirmed + 1 < COINBASE_MATURITY => {
                return Err(Error::ContextCheckFailed(format!(
                    "coinbase input {} is immature at height {}",
                    utxo.outpoint, height
                )));
            }
            None if utxo.is_coinbase => {
                return Err(Error::ContextCheckFailed(format!(
                    "coinbase input {} is unconfirmed",
                    utxo.outpoint
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

fn candidates(utxos: &[Utxo]) -> Vec<Candidate> {
    utxos
        .iter()
        .map(|u| Candidate {
            value: u.value.to_sat(),
            weight: P2PKH_INPUT_WEIGHT,
            input_count: 1,
            is_segwit: false,
        })
        .collect()
}

fn fund_outputs(txouts: &[TxOut]) -> TargetOutputs {
    TargetOutputs::fund_outputs(
        txouts
            .iter()
            .map(|o| (serialize(o).len() as u64 * 4, o.value.to_sat())),
    )
}
