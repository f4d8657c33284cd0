use std::collections::HashSet;

use bitcoin::{Amount, BlockHash, Txid};
use serde::{Deserialize, Serialize};

use crate::constants::UNASSIGNED_GROUP;

/// Serial numbers already revealed on-chain.
pub type UsedSerials = HashSet<Vec<u8>>;

/// One denominated blinded coin owned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateCoin {
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
    pub index: u32,
    #[serde(with = "hex::serde")]
    pub commitment: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub serial_number: Vec<u8>,
    pub group_id: i32,
    pub is_spend: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_height: Option<u32>,
}

/// Lifecycle position of a stored coin. Coins that were created but never
/// broadcast only live inside an unsigned mint and are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinState {
    /// On-chain, waiting for a group.
    Minted,
    GroupAssigned,
    Spent,
}

impl PrivateCoin {
    pub fn state(&self) -> CoinState {
        if self.is_spend {
            CoinState::Spent
        } else if self.group_id == UNASSIGNED_GROUP {
            CoinState::Minted
        } else {
            CoinState::GroupAssigned
        }
    }

    /// Spendable: assigned to a group and not spent yet.
    pub fn is_approved(&self) -> bool {
        self.group_id != UNASSIGNED_GROUP && !self.is_spend
    }

    pub fn is_pending(&self) -> bool {
        self.group_id == UNASSIGNED_GROUP && !self.is_spend
    }

    /// Record the coin as broadcast in `txid`, not yet grouped.
    pub fn mark_minted(&mut self, txid: Txid) {
        self.mint_txid = Some(txid);
        self.group_id = UNASSIGNED_GROUP;
    }

    /// Spending is one-way: a spent coin keeps its first spend txid.
    pub fn mark_spent(&mut self, txid: Txid) {
        if !self.is_spend {
            self.is_spend = true;
            self.spend_txid = Some(txid);
        }
    }

    pub fn mint_query(&self) -> MintQuery {
        MintQuery {
            denomination: self.value,
            commitment: self.commitment.clone(),
        }
    }
}

/// Published commitment set a spend proof is anonymized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymitySet {
    pub block_hash: BlockHash,
    pub commitments: Vec<Vec<u8>>,
}

/// A coin about to be spent, together with the set its proof hides it in.
#[derive(Debug, Clone)]
pub struct SpendCoin {
    pub coin: PrivateCoin,
    pub anonymity_set: AnonymitySet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupInfo {
    pub denomination: Amount,
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinGroup {
    pub denomination: Amount,
    pub id: i32,
    pub anonymity_set: AnonymitySet,
}

impl CoinGroup {
    pub fn contains(&self, commitment: &[u8]) -> bool {
        self.anonymity_set
            .commitments
            .iter()
            .any(|c| c.as_slice() == commitment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintQuery {
    pub denomination: Amount,
    pub commitment: Vec<u8>,
}

/// Chain view of a mint: which group it joined and when it was mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintMetadata {
    pub commitment: Vec<u8>,
    pub group_id: i32,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub spendable: Amount,
    pub pending: Amount,
}

impl Balance {
    pub fn from_coins<'a>(coins: impl IntoIterator<Item = &'a PrivateCoin>) -> Self {
        let mut balance = Balance::default();
        for coin in coins {
            if coin.is_approved() {
                balance.spendable += coin.value;
            } else if coin.is_pending() {
                balance.pending += coin.value;
            }
        }
        balance
    }

    pub fn total(&self) -> Amount {
        self.spendable + self.pending
    }
}
