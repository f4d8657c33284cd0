use bitcoin::{absolute::Height, Amount};

use crate::{
    coin::{AnonymitySet, GroupInfo, MintMetadata, MintQuery, UsedSerials},
    error::Result,
};

/// Chain queries needed by the Sigma wallet.
#[async_trait::async_trait]
pub trait ChainBackend: Send + Sync {
    /// Serial numbers revealed by every spend seen on-chain.
    async fn used_serials(&self) -> Result<UsedSerials>;

    /// Latest group of every denomination.
    ///
    /// # Returns
    /// * One entry per denomination that has at least one group
    async fn latest_groups(&self) -> Result<Vec<GroupInfo>>;

    /// Get the anonymity set of one group
    ///
    /// # Arguments
    /// * `denomination` - Denomination of the group
    /// * `group_id` - Id of the group
    ///
    /// # Returns
    /// * `None` if the group does not exist
    async fn anonymity_set(
        &self,
        denomination: Amount,
        group_id: i32,
    ) -> Result<Option<AnonymitySet>>;

    /// Look up where our mints ended up.
    ///
    /// # Returns
    /// * Metadata for every query whose commitment the chain knows, in any order
    async fn mint_metadata(&self, queries: &[MintQuery]) -> Result<Vec<MintMetadata>>;

    /// Get the current blockchain tip height
    async fn block_height(&self) -> Result<Height>;
}
