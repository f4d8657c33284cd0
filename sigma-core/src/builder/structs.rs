use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, TxOut, Txid};

use crate::{coin::PrivateCoin, constants::OP_SIGMAMINT};

/// Unspent transparent output handed over by the transparent wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
    /// `None` while unconfirmed.
    pub confirm_height: Option<u32>,
    pub is_coinbase: bool,
}

/// An output as requested by the caller.
///
/// Commitment outputs are distinct from standard ones from the start, so a
/// built transaction never has its scripts rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutput {
    Standard {
        script_pubkey: ScriptBuf,
        value: Amount,
    },
    Commitment {
        commitment: Vec<u8>,
        value: Amount,
    },
}

impl TxOutput {
    pub fn standard(script_pubkey: ScriptBuf, value: Amount) -> Self {
        Self::Standard {
            script_pubkey,
            value,
        }
    }

    pub fn commitment(coin: &PrivateCoin) -> Self {
        Self::Commitment {
            commitment: coin.commitment.clone(),
            value: coin.value,
        }
    }

    pub fn value(&self) -> Amount {
        match self {
            Self::Standard { value, .. } | Self::Commitment { value, .. } => *value,
        }
    }

    pub fn is_commitment(&self) -> bool {
        matches!(self, Self::Commitment { .. })
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        match self {
            Self::Standard { script_pubkey, .. } => script_pubkey.clone(),
            Self::Commitment { commitment, .. } => {
                let mut script = Vec::with_capacity(commitment.len() + 1);
                script.push(OP_SIGMAMINT);
                script.extend_from_slice(commitment);
                ScriptBuf::from_bytes(script)
            }
        }
    }

    pub fn to_txout(&self) -> TxOut {
        TxOut {
            value: self.value(),
            script_pubkey: self.script_pubkey(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    #[default]
    LargestFirst,
    /// Lowest confirmation height first, unconfirmed outputs last.
    OldestFirst,
    /// Keep the order the outputs were given in.
    InOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpfpTarget {
    pub parent: Txid,
    /// Maximum number of parent outputs to spend, 0 for all of them.
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPolicy {
    pub strategy: SelectionStrategy,
    pub subtract_fee_from_outputs: bool,
    pub rbf: bool,
    pub cpfp: Option<CpfpTarget>,
    /// Height the transaction must be valid at, if any.
    pub target_height: Option<u32>,
}

/// Funded transaction with empty input scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// Spent outputs, ordered like `tx.input`.
    pub inputs: Vec<Utxo>,
    pub fee: Amount,
    pub change_index: Option<usize>,
}

impl UnsignedTransaction {
    pub fn input_value(&self) -> Amount {
        self.inputs.iter().map(|u| u.value).sum()
    }

    pub fn output_value(&self) -> Amount {
        self.tx.output.iter().map(|o| o.value).sum()
    }

    pub fn change(&self) -> Option<&TxOut> {
        self.change_index.and_then(|i| self.tx.output.get(i))
    }
}

/// Spend transaction waiting for its proofs.
#[derive(Debug, Clone)]
pub struct UnsignedSpend {
    pub tx: Transaction,
    /// Coins consumed, ordered like `tx.input`.
    pub coins: Vec<PrivateCoin>,
    /// Coins minted by the commitment outputs of `tx`.
    pub change_coins: Vec<PrivateCoin>,
    pub fee: Amount,
}

#[derive(Debug, Clone)]
pub struct SignedSpend {
    pub tx: Transaction,
    pub txid: Txid,
    pub change_coins: Vec<PrivateCoin>,
}
