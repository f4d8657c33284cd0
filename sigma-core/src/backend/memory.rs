use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bitcoin::{
    absolute::Height,
    hashes::{sha256d, Hash},
    Amount, BlockHash, OutPoint, ScriptBuf, Transaction, Txid,
};

use super::{ChainBackend, TransparentWallet};
use crate::{
    builder::{UnsignedTransaction, Utxo},
    coin::{AnonymitySet, CoinGroup, GroupInfo, MintMetadata, MintQuery, UsedSerials},
    constants::{OP_SIGMAMINT, UNASSIGNED_GROUP},
    error::{Error, Result},
};

#[derive(Debug, thiserror::Error)]
pub enum MemoryBackendError {
    #[error("backend is offline")]
    Offline,
    #[error("unknown input {0}")]
    UnknownInput(OutPoint),
    #[error("invalid height {0}")]
    InvalidHeight(u32),
}

#[derive(Debug)]
struct PublishedMint {
    denomination: Amount,
    commitment: Vec<u8>,
    height: u32,
    group_id: Option<i32>,
}

#[derive(Debug, Default)]
struct ChainState {
    height: u32,
    offline: bool,
    used_serials: UsedSerials,
    mints: Vec<PublishedMint>,
    groups: Vec<CoinGroup>,
}

/// Chain view kept in memory. Mints are published with [`Self::add_mint`]
/// and join a group once [`Self::close_group`] is called for their
/// denomination. Clones share the same chain.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<ChainState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn online(&self) -> Result<MutexGuard<'_, ChainState>> {
        let state = self.state();
        if state.offline {
            return Err(Error::backend(MemoryBackendError::Offline));
        }
        Ok(state)
    }

    /// Make every query fail until set back.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    pub fn set_height(&self, height: u32) {
        self.state().height = height;
    }

    pub fn add_mint(&self, denomination: Amount, commitment: Vec<u8>, height: u32) {
        self.state().mints.push(PublishedMint {
            denomination,
            commitment,
            height,
            group_id: None,
        });
    }

    /// Publish the commitment outputs of `tx` as mined at `height`.
    ///
    /// # Returns
    /// * The number of mints found
    pub fn add_mints_from(&self, tx: &Transaction, height: u32) -> usize {
        let mut found = 0;
        for output in &tx.output {
            if let Some((&OP_SIGMAMINT, commitment)) = output.script_pubkey.as_bytes().split_first()
            {
                self.add_mint(output.value, commitment.to_vec(), height);
                found += 1;
            }
        }
        found
    }

    pub fn add_used_serial(&self, serial: Vec<u8>) {
        self.state().used_serials.insert(serial);
    }

    /// Gather every ungrouped mint of `denomination` into group `group_id`.
    /// Nothing happens when there is no such mint.
    ///
    /// # Returns
    /// * The number of commitments in the new group
    pub fn close_group(&self, denomination: Amount, group_id: i32, block_hash: BlockHash) -> usize {
        let mut state = self.state();

        let mut commitments = vec![];
        for mint in state
            .mints
            .iter_mut()
            .filter(|m| m.denomination == denomination && m.group_id.is_none())
        {
            mint.group_id = Some(group_id);
            commitments.push(mint.commitment.clone());
        }

        let len = commitments.len();
        if len == 0 {
            return 0;
        }
        state.groups.push(CoinGroup {
            denomination,
            id: group_id,
            anonymity_set: AnonymitySet {
                block_hash,
                commitments,
            },
        });
        len
    }
}

#[async_trait::async_trait]
impl ChainBackend for MemoryBackend {
    async fn used_serials(&self) -> Result<UsedSerials> {
        Ok(self.online()?.used_serials.clone())
    }

    async fn latest_groups(&self) -> Result<Vec<GroupInfo>> {
        let state = self.online()?;

        let mut latest: Vec<GroupInfo> = vec![];
        for group in &state.groups {
            match latest.iter_mut().find(|g| g.denomination == group.denomination) {
                Some(info) => info.id = info.id.max(group.id),
                None => latest.push(GroupInfo {
                    denomination: group.denomination,
                    id: group.id,
                }),
            }
        }
        Ok(latest)
    }

    async fn anonymity_set(
        &self,
        denomination: Amount,
        group_id: i32,
    ) -> Result<Option<AnonymitySet>> {
        Ok(self
            .online()?
            .groups
            .iter()
            .find(|g| g.denomination == denomination && g.id == group_id)
            .map(|g| g.anonymity_set.clone()))
    }

    async fn mint_metadata(&self, queries: &[MintQuery]) -> Result<Vec<MintMetadata>> {
        let state = self.online()?;

        Ok(queries
            .iter()
            .filter_map(|q| {
                state
                    .mints
                    .iter()
                    .find(|m| m.denomination == q.denomination && m.commitment == q.commitment)
            })
            .map(|m| MintMetadata {
                commitment: m.commitment.clone(),
                group_id: m.group_id.unwrap_or(UNASSIGNED_GROUP),
                height: Some(m.height),
            })
            .collect())
    }

    async fn block_height(&self) -> Result<Height> {
        let height = self.online()?.height;
        Height::from_consensus(height)
            .map_err(|_| Error::backend(MemoryBackendError::InvalidHeight(height)))
    }
}

#[derive(Debug, Default)]
struct WalletState {
    utxos: Vec<Utxo>,
    broadcast: Vec<Transaction>,
    funded: u32,
}

/// Transparent wallet kept in memory. It owns every output paying to its
/// change script and "signs" by leaving input scripts empty.
#[derive(Debug)]
pub struct MemoryWallet {
    change_script: ScriptBuf,
    state: Mutex<WalletState>,
}

impl MemoryWallet {
    pub fn new(change_script: ScriptBuf) -> Self {
        Self {
            change_script,
            state: Mutex::new(WalletState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive `value` from outside the wallet.
    pub fn fund(&self, value: Amount, confirm_height: Option<u32>) -> OutPoint {
        let mut state = self.state();
        state.funded += 1;

        let outpoint = OutPoint {
            txid: Txid::from_raw_hash(sha256d::Hash::hash(&state.funded.to_le_bytes())),
            vout: 0,
        };
        state.utxos.push(Utxo {
            outpoint,
            value,
            script_pubkey: self.change_script.clone(),
            confirm_height,
            is_coinbase: false,
        });
        outpoint
    }

    pub fn balance(&self) -> Amount {
        self.state().utxos.iter().map(|u| u.value).sum()
    }

    /// Every transaction broadcast so far, oldest first.
    pub fn broadcasted(&self) -> Vec<Transaction> {
        self.state().broadcast.clone()
    }

    fn apply(&self, state: &mut WalletState, tx: &Transaction) -> Txid {
        let txid = tx.compute_txid();

        state
            .utxos
            .retain(|u| !tx.input.iter().any(|i| i.previous_output == u.outpoint));
        for (vout, output) in tx.output.iter().enumerate() {
            if output.script_pubkey == self.change_script {
                state.utxos.push(Utxo {
                    outpoint: OutPoint {
                        txid,
                        vout: vout as u32,
                    },
                    value: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    confirm_height: None,
                    is_coinbase: false,
                });
            }
        }
        state.broadcast.push(tx.clone());

        txid
    }
}

#[async_trait::async_trait]
impl TransparentWallet for MemoryWallet {
    async fn unspent_outputs(&self) -> Result<Vec<Utxo>> {
        Ok(self.state().utxos.clone())
    }

    async fn change_script(&self) -> Result<ScriptBuf> {
        Ok(self.change_script.clone())
    }

    async fn sign_and_broadcast(&self, unsigned: &UnsignedTransaction) -> Result<Txid> {
        let mut state = self.state();
        if let Some(unknown) = unsigned
            .tx
            .input
            .iter()
            .find(|i| !state.utxos.iter().any(|u| u.outpoint == i.previous_output))
        {
            return Err(Error::backend(MemoryBackendError::UnknownInput(
                unknown.previous_output,
            )));
        }
        Ok(self.apply(&mut state, &unsigned.tx))
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let mut state = self.state();
        Ok(self.apply(&mut state, tx))
    }
}
