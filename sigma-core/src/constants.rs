use bitcoin::{Amount, Sequence};

/// Denomination ladder in satoshis, ascending.
pub const DENOMINATIONS: [u64; 6] = [
    5_000_000,
    10_000_000,
    50_000_000,
    100_000_000,
    1_000_000_000,
    2_500_000_000,
];

/// Confirmations a mint needs before its commitment may join a group.
pub const GROUP_CONFIRMATIONS: u32 = 5;

/// Consecutive unused derivation indices after which restore stops.
pub const RESTORE_GAP_LIMIT: u32 = 100;

/// `group_id` of a coin that is not yet eligible for spending.
pub const UNASSIGNED_GROUP: i32 = -1;

pub const COINBASE_MATURITY: u32 = 100;

pub const DUST_THRESHOLD: Amount = Amount::from_sat(546);

pub const OP_SIGMAMINT: u8 = 0xc3;
pub const OP_SIGMASPEND: u8 = 0xc4;

pub const RBF_SEQUENCE: Sequence = Sequence::ENABLE_RBF_NO_LOCKTIME;
pub const FINAL_SEQUENCE: Sequence = Sequence::MAX;

// weight estimates used for fee calculation before signing
pub const P2PKH_SCRIPT_SIG_WEIGHT: u64 = 4 * 107;
pub const P2PKH_INPUT_WEIGHT: u64 = 4 * (32 + 4 + 1 + 107 + 4);
pub const SIGMA_SPEND_SCRIPT_WEIGHT: u64 = 4 * 1_350;
