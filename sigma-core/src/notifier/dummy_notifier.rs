use super::Notifier;
use crate::coin::Balance;

#[derive(Default)]
pub struct DummyNotifier;

impl DummyNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for DummyNotifier {
    async fn balance_changed(&self, _balance: Balance) {}
}
