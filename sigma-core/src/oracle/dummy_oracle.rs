use bitcoin::{
    hashes::{sha256, Hash, HashEngine},
    secp256k1::SecretKey,
    Amount, ScriptBuf,
};

use super::{MintSecret, SigmaOracle};
use crate::{
    builder::{SignedSpend, UnsignedSpend},
    coin::SpendCoin,
    constants::OP_SIGMASPEND,
    error::{Error, Result},
};

/// Hash-based oracle. Commitments and serials are tagged sha256 digests of
/// the key, denomination and index, and "proofs" bind the serial to the
/// anonymity set. Deterministic, so it can drive restore tests.
#[derive(Debug, Default, Clone)]
pub struct DummyOracle {
    fail_prove: bool,
}

impl DummyOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// An oracle whose `prove` always fails.
    pub fn with_failing_prover() -> Self {
        Self { fail_prove: true }
    }

    fn tagged_hash(tag: &[u8], private_key: &SecretKey, denomination: Amount, index: u32) -> Vec<u8> {
        let mut engine = sha256::HashEngine::default();
        engine.input(tag);
        engine.input(&private_key.secret_bytes());
        engine.input(&denomination.to_sat().to_le_bytes());
        engine.input(&index.to_le_bytes());
        sha256::Hash::from_engine(engine).to_byte_array().to_vec()
    }
}

#[async_trait::async_trait]
impl SigmaOracle for DummyOracle {
    async fn mint(
        &self,
        denomination: Amount,
        private_key: &SecretKey,
        index: u32,
    ) -> Result<MintSecret> {
        if denomination == Amount::ZERO {
            return Err(Error::Oracle("zero denomination".to_string()));
        }
        Ok(MintSecret {
            commitment: Self::tagged_hash(b"sigma/commitment", private_key, denomination, index),
            serial_number: Self::tagged_hash(b"sigma/serial", private_key, denomination, index),
        })
    }

    async fn prove(
        &self,
        unsigned: &UnsignedSpend,
        coins: &[SpendCoin],
        _private_key: &SecretKey,
    ) -> Result<SignedSpend> {
        if self.fail_prove {
            return Err(Error::Oracle("prover unavailable".to_string()));
        }
        if coins.len() != unsigned.tx.input.len() {
            return Err(Error::Oracle(format!(
                "{} coins for {} inputs",
                coins.len(),
                unsigned.tx.input.len()
            )));
        }

        let mut tx = unsigned.tx.clone();
        for (input, spend) in tx.input.iter_mut().zip(coins) {
            let set = &spend.anonymity_set;
            if !set.commitments.contains(&spend.coin.commitment) {
                return Err(Error::Oracle(format!(
                    "coin {} is not in its anonymity set",
                    spend.coin.index
                )));
            }

            let mut engine = sha256::HashEngine::default();
            engine.input(set.block_hash.as_byte_array());
            for commitment in &set.commitments {
                engine.input(commitment);
            }
            let proof = sha256::Hash::from_engine(engine);

            let mut script = vec![OP_SIGMASPEND];
            script.extend_from_slice(&spend.coin.serial_number);
            script.extend_from_slice(proof.as_byte_array());
            input.script_sig = ScriptBuf::from_bytes(script);
        }

        let txid = tx.compute_txid();
        Ok(SignedSpend {
            tx,
            txid,
            change_coins: unsigned.change_coins.clone(),
        })
    }
}
