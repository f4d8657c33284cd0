//! Notifications about wallet state changes.
//!
//! - [`Notifier`] - receives balance updates from the coordinator
//! - [`DummyNotifier`] - ignores them

mod dummy_notifier;
mod notifier;

pub use dummy_notifier::DummyNotifier;
pub use notifier::Notifier;
