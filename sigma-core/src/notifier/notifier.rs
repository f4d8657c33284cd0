use crate::coin::Balance;

/// Trait for observers of the private balance.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Called after every coordinator cycle with the current balance.
    async fn balance_changed(&self, balance: Balance);
}
