use std::cmp::Reverse;

use bitcoin::Amount;

use super::PrivateCoin;

/// Coins that may be spent: assigned to a group and not spent yet.
pub fn approved_coins(coins: &[PrivateCoin]) -> Vec<PrivateCoin> {
    coins.iter().filter(|c| c.is_approved()).cloned().collect()
}

/// Pick the fewest approved coins whose sum covers `target`.
///
/// Coins are ranked by value (descending), then group id, then index. The
/// number of coins `k` is the smallest prefix of that ranking that reaches
/// the target. The `k` slots are then filled one by one with the smallest
/// coin that still lets the remaining slots, filled with the largest coins
/// left, reach the target. This keeps the coin count minimal while leaving
/// as little overshoot as the count allows.
///
/// Returns an empty vector when the approved coins cannot cover the target.
pub fn select_coins_to_spend(coins: &[PrivateCoin], target: Amount) -> Vec<PrivateCoin> {
    let mut ranked: Vec<&PrivateCoin> = coins.iter().filter(|c| c.is_approved()).collect();
    ranked.sort_by_key(|c| (Reverse(c.value), c.group_id, c.index));

    let mut prefix = Amount::ZERO;
    let Some(count) = ranked.iter().position(|c| {
        prefix += c.value;
        prefix >= target
    }) else {
        return vec![];
    };
    let count = count + 1;

    // candidates for a slot, smallest value first, ties in rank order
    let mut ascending: Vec<usize> = (0..ranked.len()).collect();
    ascending.sort_by_key(|&i| (ranked[i].value, i));

    let mut used = vec![false; ranked.len()];
    let mut selected = Vec::with_capacity(count);
    let mut sum = Amount::ZERO;

    for slot in 0..count {
        let others = count - slot - 1;

        let pick = ascending.iter().copied().filter(|&i| !used[i]).find(|&i| {
            let best_rest: Amount = (0..ranked.len())
                .filter(|&j| j != i && !used[j])
                .take(others)
                .map(|j| ranked[j].value)
                .sum();
            sum + ranked[i].value + best_rest >= target
        });

        // the largest unused coin always fits, so a pick exists
        let Some(i) = pick else {
            return vec![];
        };
        used[i] = true;
        sum += ranked[i].value;
        selected.push(i);
    }

    selected.sort_unstable();
    selected.into_iter().map(|i| ranked[i].clone()).collect()
}
