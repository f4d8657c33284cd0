use crate::{coin::PrivateCoin, error::Result};

/// Trait for persisting the private coin set and the restore marker.
#[async_trait::async_trait]
pub trait CoinStore: Send + Sync {
    /// Load every stored coin, in insertion order.
    async fn load_coins(&self) -> Result<Vec<PrivateCoin>>;

    /// Replace the stored coin set with `coins`.
    ///
    /// # Arguments
    /// * `coins` - The complete new coin set
    async fn save_coins(&self, coins: &[PrivateCoin]) -> Result<()>;

    /// Whether a restore already completed for this wallet.
    async fn is_restored(&self) -> Result<bool>;

    /// Record that a restore completed. Only called after the restored coins
    /// were saved.
    async fn mark_restored(&self) -> Result<()>;
}
