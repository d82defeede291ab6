//! Transition costs between tracker states
//!
//! Cost grows with circle-of-fifths distance, is discounted for diatonic motion and
//! common cadences, and penalized when borrowed chords are involved.

use super::notes::circle_of_fifths_distance;
use super::vocabulary::ChordCandidate;
use crate::analysis::result::Key;

/// Base cost of any chord change
const BASE_COST: f32 = 0.4;
/// Cost per circle-of-fifths step between roots
const FIFTHS_STEP_COST: f32 = 0.08;
/// Discount when both chords are diatonic
const DIATONIC_DISCOUNT: f32 = 0.12;
/// Penalty when both chords are borrowed
const BOTH_BORROWED_PENALTY: f32 = 0.30;
/// Penalty when exactly one chord is borrowed
const ONE_BORROWED_PENALTY: f32 = 0.18;

/// Cadential motions as (from interval, to interval, bonus); intervals above the tonic
const CADENCES: [(u8, u8, f32); 4] = [
    (7, 0, 0.15), // V -> I
    (5, 7, 0.10), // IV -> V
    (2, 7, 0.10), // ii -> V
    (5, 0, 0.08), // IV -> I
];

/// Bonus for a cadential root motion `from -> to` in `key` (0.0 if none applies)
pub fn cadence_bonus(from_root: u8, to_root: u8, key: &Key) -> f32 {
    let tonic = key.tonic();
    let from = (from_root + 12 - tonic) % 12;
    let to = (to_root + 12 - tonic) % 12;
    CADENCES
        .iter()
        .find(|&&(f, t, _)| f == from && t == to)
        .map_or(0.0, |&(_, _, bonus)| bonus)
}

/// Cost of moving from `a` to `b` (0 for staying on the same label, never negative)
pub fn transition_cost(a: &ChordCandidate, b: &ChordCandidate, key: &Key) -> f32 {
    if a.label == b.label {
        return 0.0;
    }
    let mut cost = BASE_COST + FIFTHS_STEP_COST * circle_of_fifths_distance(a.root, b.root) as f32;
    cost += match (a.borrowed, b.borrowed) {
        (false, false) => -DIATONIC_DISCOUNT,
        (true, true) => BOTH_BORROWED_PENALTY,
        _ => ONE_BORROWED_PENALTY,
    };
    cost -= cadence_bonus(a.root, b.root, key);
    cost.max(0.0)
}

/// Full `N x N` cost matrix for a vocabulary (`matrix[from][to]`)
pub fn transition_matrix(candidates: &[ChordCandidate], key: &Key) -> Vec<Vec<f32>> {
    candidates
        .iter()
        .map(|a| candidates.iter().map(|b| transition_cost(a, b, key)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::vocabulary::candidates_for_key;

    fn find<'a>(cands: &'a [ChordCandidate], label: &str) -> &'a ChordCandidate {
        cands.iter().find(|c| c.label == label).unwrap()
    }

    #[test]
    fn test_self_transition_free() {
        let key = Key::Major(0);
        let cands = candidates_for_key(&key);
        for c in &cands {
            assert_eq!(transition_cost(c, c, &key), 0.0);
        }
    }

    #[test]
    fn test_costs() {
        let key = Key::Major(0);
        let cands = candidates_for_key(&key);
        let (c, g, f, dm, bb) = (
            find(&cands, "C"),
            find(&cands, "G"),
            find(&cands, "F"),
            find(&cands, "Dm"),
            find(&cands, "Bb"),
        );
        // C -> G: 0.4 + 0.08 - 0.12
        assert!((transition_cost(c, g, &key) - 0.36).abs() < 1e-6);
        // G -> C: same distance, minus V->I bonus
        assert!((transition_cost(g, c, &key) - 0.21).abs() < 1e-6);
        // F -> G: 0.4 + 0.16 - 0.12 - 0.10
        assert!((transition_cost(f, g, &key) - 0.34).abs() < 1e-6);
        // Dm -> G: 0.4 + 0.08 - 0.12 - 0.10
        assert!((transition_cost(dm, g, &key) - 0.26).abs() < 1e-6);
        // C -> Bb (borrowed): 0.4 + 0.16 + 0.18
        assert!((transition_cost(c, bb, &key) - 0.74).abs() < 1e-6);
    }

    #[test]
    fn test_cadence_bonus_is_key_relative() {
        assert_eq!(cadence_bonus(2, 7, &Key::Major(7)), 0.15); // D -> G in G
        assert_eq!(cadence_bonus(7, 0, &Key::Major(7)), 0.0);
        assert_eq!(cadence_bonus(4, 9, &Key::Minor(9)), 0.15); // E -> Am
    }

    #[test]
    fn test_matrix_shape() {
        let key = Key::Minor(2);
        let cands = candidates_for_key(&key);
        let m = transition_matrix(&cands, &key);
        assert_eq!(m.len(), cands.len());
        assert!(m.iter().all(|row| row.len() == cands.len() && row.iter().all(|&c| c >= 0.0)));
    }
}
