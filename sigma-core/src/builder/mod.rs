//! Transparent transaction construction.
//!
//! [`TxBuilder`] funds a list of [`TxOutput`]s from the wallet's unspent
//! outputs. It is the substrate for mint transactions (commitment outputs)
//! and for the transparent side of spend transactions.
//!
//! Policies are bundled in [`BuildPolicy`]:
//!
//! - selection strategy (largest first, oldest first, caller order)
//! - subtract the fee from the outputs instead of adding it on top
//! - replace-by-fee signalling on every input
//! - child-pays-for-parent: spend a parent's outputs into a single change output
//! - consensus context checks against a target height

mod structs;
mod tx_builder;

pub use structs::*;
pub use tx_builder::{check_context, TxBuilder};
