use bitcoin::{secp256k1::SecretKey, Amount};

use super::{decompose, PrivateCoin};
use crate::{error::Result, oracle::SigmaOracle};

/// Derive the coin of `value` at derivation `index`.
///
/// The record starts in group 0, not spent. Callers that broadcast the coin
/// move it to the unassigned group with [`PrivateCoin::mark_minted`].
pub async fn create_private_coin(
    oracle: &dyn SigmaOracle,
    value: Amount,
    private_key: &SecretKey,
    index: u32,
) -> Result<PrivateCoin> {
    let secret = oracle.mint(value, private_key, index).await?;

    Ok(PrivateCoin {
        value,
        index,
        commitment: secret.commitment,
        serial_number: secret.serial_number,
        group_id: 0,
        is_spend: false,
        spend_txid: None,
        mint_txid: None,
        mint_height: None,
    })
}

/// Create the coins minting `value` over `ladder`, one derivation index per
/// coin starting at `start_index`.
///
/// Returns the coins, largest first, and the next unused index. Whatever is
/// left below the smallest denomination is not minted.
pub async fn mint_commitments_for_value(
    oracle: &dyn SigmaOracle,
    ladder: &[u64],
    value: Amount,
    private_key: &SecretKey,
    start_index: u32,
) -> Result<(Vec<PrivateCoin>, u32)> {
    let (denominations, _) = decompose(value, ladder);

    let mut coins = Vec::with_capacity(denominations.len());
    let mut index = start_index;
    for denomination in denominations {
        coins.push(create_private_coin(oracle, denomination, private_key, index).await?);
        index += 1;
    }

    Ok((coins, index))
}

/// First derivation index not used by any of `coins`.
pub fn next_index<'a>(coins: impl IntoIterator<Item = &'a PrivateCoin>) -> u32 {
    coins
        .into_iter()
        .map(|c| c.index + 1)
        .max()
        .unwrap_or(0)
}
