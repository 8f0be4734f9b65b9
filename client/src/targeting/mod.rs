//! The targeting engine (§4.7): a `TargetingStrategy` trait with a shared
//! candidate-set/scoring base and five implementors, rather than the
//! virtual-inheritance hierarchy of the system this was distilled from.
//!
//! Every strategy is "bound to one opponent's board" — it is handed a fresh
//! [`shared::Board`] view (and the match [`shared::Configuration`]) on every
//! call and returns the next cell to shoot, or `None` to pass.

mod heuristic;
mod parity;
mod placement_search;
mod random;
mod skipper;

pub use heuristic::Heuristic;
pub use parity::Parity;
pub use placement_search::PlacementSearch;
pub use random::Random;
pub use skipper::Skipper;

use rand::seq::SliceRandom;
use shared::geometry::{Coordinate, Direction};
use shared::{Board, Configuration};

/// A targeting strategy bound to one opponent's board for the lifetime of a
/// match. `new_game` resets any per-match state (e.g. the parity bit);
/// `target` is called once per turn this bot is to move against this board.
pub trait TargetingStrategy {
    fn name(&self) -> &'static str;

    /// Called once when a fresh opponent board is first tracked, to pick a
    /// new random parity bit and clear any per-board caches.
    fn new_game(&mut self);

    /// `None` means pass/skip.
    fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate>;
}

/// Reads `EDGE_WEIGHT` once; `Heuristic`/`PlacementSearch` use it to bias
/// search-branch scoring toward (or away from) the board's interior.
/// Invalid or absent values default to `0.0` (no bias), matching this
/// crate's "never panic on a malformed environment" posture.
pub fn edge_weight_from_env() -> f64 {
    std::env::var("EDGE_WEIGHT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

/// Step 1 of the selection pipeline: every untouched cell whose parity
/// matches `parity`, unioned with every untouched cell adjacent to a hit
/// (frenzy), regardless of parity.
pub fn candidates(board: &Board, config: &Configuration, parity: bool) -> Vec<Coordinate> {
    let area = config.ship_area();
    let mut out = Vec::new();
    for idx in 0..area.area() {
        let coord = area.to_coord(idx);
        if board.get_square(coord) != Some(shared::ship::NONE) {
            continue;
        }
        if coord.parity() == parity || board.adjacent_hits(coord) > 0 {
            out.push(coord);
        }
    }
    out
}

/// `weight = 100 * ln(remain + 1)`, shared by both scoring branches.
pub fn weight(board: &Board, config: &Configuration) -> f64 {
    let remain = config.point_goal().saturating_sub(board.hit_count());
    100.0 * ((remain + 1) as f64).ln()
}

pub(super) fn max_len(config: &Configuration) -> f64 {
    config.longest_ship().map(|s| s.length()).unwrap_or(2) as f64
}

/// Base search-branch score (no adjacent hits): `floor(weight *
/// avgFreeSpan / maxLen)`, where `avgFreeSpan` is the sum of the four
/// directional free runs (each truncated to `maxLen`) divided by `4*maxLen`.
/// `edge_weight` (see [`edge_weight_from_env`]) additionally biases the
/// result toward cells farther from every board edge.
pub fn search_score(board: &Board, config: &Configuration, coord: Coordinate, edge_weight: f64) -> f64 {
    let max_len = max_len(config);
    let span: u32 = Direction::ALL
        .iter()
        .map(|&d| board.free_run(coord, d).min(max_len as u32))
        .sum();
    let avg_free_span = span as f64 / (4.0 * max_len);
    let base = (weight(board, config) * avg_free_span / max_len).floor();

    if edge_weight == 0.0 {
        return base;
    }
    let min_edge_dist = Direction::ALL
        .iter()
        .map(|&d| board.dist_to_edge(coord, d))
        .min()
        .unwrap_or(0) as f64;
    base * (1.0 + edge_weight * min_edge_dist)
}

/// Base frenzy-branch score: the naive behavior before `Heuristic`'s full
/// preference table. Extends an existing hit line of length >= 2, or
/// treats any adjacent hit as a flat strong preference.
pub fn base_frenzy_score(board: &Board, config: &Configuration, coord: Coordinate) -> f64 {
    let w = weight(board, config);
    let max_len = max_len(config);
    let line_len = board.max_inline_hits(coord) as f64;
    if line_len >= 2.0 {
        return w * (2.0 + (max_len - max_len.min(line_len)));
    }
    if board.adjacent_hits(coord) >= 1 {
        return w * 99.0;
    }
    0.0
}

/// Scores every candidate with `search` when it has no adjacent hits, or
/// `frenzy` otherwise, then shuffles and stable-sorts descending so ties
/// break randomly (step 3 of the selection pipeline).
pub fn pick_best<F, G>(board: &Board, coords: Vec<Coordinate>, mut search: F, mut frenzy: G) -> Option<Coordinate>
where
    F: FnMut(Coordinate) -> f64,
    G: FnMut(Coordinate) -> f64,
{
    let mut scored: Vec<(Coordinate, f64)> = coords
        .into_iter()
        .map(|c| {
            let score = if board.adjacent_hits(c) > 0 { frenzy(c) } else { search(c) };
            (c, score)
        })
        .collect();
    scored.shuffle(&mut rand::thread_rng());
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().next().map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::configuration::ConfigurationBuilder;
    use shared::ship::Ship;

    fn small_config() -> Configuration {
        ConfigurationBuilder::new("test")
            .min_players(2)
            .max_players(2)
            .board_size(10, 10)
            .add_ship(Ship::new(b'A', 5).unwrap())
            .add_ship(Ship::new(b'B', 4).unwrap())
            .add_ship(Ship::new(b'C', 3).unwrap())
            .add_ship(Ship::new(b'D', 3).unwrap())
            .add_ship(Ship::new(b'E', 2).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn candidates_include_parity_and_frenzy_cells() {
        let config = small_config();
        let mut board = Board::new(0, "opponent".to_string(), &config);
        board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
        board.shoot(Coordinate::new(1, 1));

        let coords = candidates(&board, &config, true);
        // (2,1) is off-parity with `true` ((2+1)%2==1 != parity-of-true-cells)
        // but adjacent to the hit at (1,1), so it must be included.
        assert!(coords.contains(&Coordinate::new(2, 1)));
    }

    #[test]
    fn search_score_prefers_more_open_cells() {
        let config = small_config();
        let board = Board::new(0, "opponent".to_string(), &config);
        let center = search_score(&board, &config, Coordinate::new(5, 5), 0.0);
        let corner = search_score(&board, &config, Coordinate::new(1, 1), 0.0);
        assert!(center >= corner);
    }

    #[test]
    fn frenzy_score_rewards_both_line_extension_and_lone_hits() {
        let config = small_config();
        let mut board = Board::new(0, "opponent".to_string(), &config);
        board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
        board.shoot(Coordinate::new(1, 1));
        board.shoot(Coordinate::new(2, 1));
        board.shoot(Coordinate::new(3, 1));

        // extends the known 3-long hit line
        let extend_long = base_frenzy_score(&board, &config, Coordinate::new(4, 1));
        // adjacent to the lone hit at (1,1) from the unexplored perpendicular side
        let lone_case = base_frenzy_score(&board, &config, Coordinate::new(1, 2));
        assert!(extend_long > 0.0);
        assert!(lone_case > 0.0);
        // not adjacent to any hit at all
        let cold = base_frenzy_score(&board, &config, Coordinate::new(8, 8));
        assert_eq!(cold, 0.0);
    }
}
