//! Private coin model and the pure parts of its lifecycle.

mod denomination;
mod lifecycle;
mod selection;
mod structs;

pub use denomination::decompose;
pub use lifecycle::{create_private_coin, mint_commitments_for_value, next_index};
pub use selection::{approved_coins, select_coins_to_spend};
pub use structs::*;
