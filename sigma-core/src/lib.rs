#![allow(clippy::module_inception)]

mod account;
mod backend;
mod builder;
mod coin;
mod config;
pub mod constants;
mod error;
mod notifier;
mod oracle;
mod store;

pub use bdk_coin_select::FeeRate;
pub use bitcoin;

pub use account::{MintTransaction, SigmaAccount};
pub use backend::*;
pub use builder::*;
pub use coin::*;
pub use config::WalletConfig;
pub use error::{Error, Result};
pub use notifier::*;
pub use oracle::*;
pub use store::*;
