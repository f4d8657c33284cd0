use bitcoin::{Amount, Txid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Key material
    #[error("failed to generate master key from seed")]
    SeedDerivation,
    #[error("failed to derive {0} key")]
    KeyDerivation(&'static str),

    // Transaction building
    #[error("insufficient funds: missing {missing}")]
    InsufficientFunds { missing: Amount },
    #[error("transaction failed context checks: {0}")]
    ContextCheckFailed(String),
    #[error("no outputs to fund")]
    NoOutputs,
    #[error("transaction {0} not found")]
    TransactionNotFound(Txid),
    #[error("invalid outputs: {0}")]
    InvalidOutputs(&'static str),
    #[error("{0} is below the smallest denomination")]
    InvalidDenomination(Amount),
    #[error("no group {group_id} for denomination {denomination}")]
    GroupNotFound { denomination: Amount, group_id: i32 },

    #[error("operation interrupted")]
    Interrupted,

    // Cryptographic oracle
    #[error("oracle: {0}")]
    Oracle(String),

    // Configuration
    #[error("config: {0}")]
    Config(String),

    // Wrapped external errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),

    // Backend pass-through for collaborator implementations
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn insufficient_funds(missing: u64) -> Self {
        Error::InsufficientFunds {
            missing: Amount::from_sat(missing),
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, Error::InsufficientFunds { .. })
    }

    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Backend(Box::new(e))
    }
}

impl From<bdk_coin_select::InsufficientFunds> for Error {
    fn from(e: bdk_coin_select::InsufficientFunds) -> Self {
        Error::insufficient_funds(e.missing)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
