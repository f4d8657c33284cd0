use bitcoin::Amount;

/// Split `value` greedily over an ascending denomination ladder, largest
/// denomination first.
///
/// Returns the denominations to mint, largest first, and the remainder that
/// is smaller than the smallest denomination.
pub fn decompose(value: Amount, ladder: &[u64]) -> (Vec<Amount>, Amount) {
    let mut remaining = value.to_sat();
    let mut parts = vec![];

    for &denomination in ladder.iter().rev() {
        if denomination == 0 {
            continue;
        }
        let count = remaining / denomination;
        parts.extend((0..count).map(|_| Amount::from_sat(denomination)));
        remaining -= count * denomination;
    }

    (parts, Amount::from_sat(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DENOMINATIONS;

    #[test]
    fn splits_largest_first() {
        let (parts, remainder) = decompose(Amount::from_sat(150_000_000), &DENOMINATIONS);

        assert_eq!(
            parts,
            vec![Amount::from_sat(100_000_000), Amount::from_sat(50_000_000)]
        );
        assert_eq!(remainder, Amount::ZERO);
    }

    #[test]
    fn repeats_denominations_and_keeps_remainder() {
        let (parts, remainder) = decompose(Amount::from_sat(5_017_000_123), &DENOMINATIONS);

        assert_eq!(parts[0], Amount::from_sat(2_500_000_000));
        assert_eq!(parts[1], Amount::from_sat(2_500_000_000));
        assert_eq!(parts[2], Amount::from_sat(10_000_000));
        assert_eq!(parts[3], Amount::from_sat(5_000_000));
        assert_eq!(parts.len(), 4);
        assert_eq!(remainder, Amount::from_sat(2_000_123));
    }

    #[test]
    fn parts_and_remainder_add_up() {
        for sats in [0, 4_999_999, 5_000_000, 65_000_000, 3_765_432_100] {
            let value = Amount::from_sat(sats);
            let (parts, remainder) = decompose(value, &DENOMINATIONS);

            assert_eq!(parts.iter().copied().sum::<Amount>() + remainder, value);
            assert!(remainder < Amount::from_sat(DENOMINATIONS[0]));
            assert!(parts.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
