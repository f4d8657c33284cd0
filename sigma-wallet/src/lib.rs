pub mod coordinator;

pub use coordinator::{Coordinator, CoordinatorHandle, CycleReport, SharedAccount};

// re-export traits for consumers who need to provide valid implementors
pub use sigma_core::{ChainBackend, CoinStore, Notifier, SigmaOracle, TransparentWallet};

// re-export libraries for consumers
pub use bitcoin;
pub use sigma_core;
