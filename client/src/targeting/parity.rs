use rand::Rng;
use shared::geometry::Coordinate;
use shared::{Board, Configuration};

use super::{base_frenzy_score, candidates, pick_best, search_score, TargetingStrategy};

/// The base search/frenzy scoring described in §4.7, with no placement
/// search and none of `Heuristic`'s extra frenzy patterns.
#[derive(Clone)]
pub struct Parity {
    parity: bool,
}

impl Parity {
    pub fn new() -> Self {
        Parity { parity: rand::thread_rng().gen_bool(0.5) }
    }
}

impl Default for Parity {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetingStrategy for Parity {
    fn name(&self) -> &'static str {
        "parity"
    }

    fn new_game(&mut self) {
        self.parity = rand::thread_rng().gen_bool(0.5);
    }

    fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate> {
        let coords = candidates(board, config, self.parity);
        pick_best(
            board,
            coords,
            |c| search_score(board, config, c, 0.0),
            |c| base_frenzy_score(board, config, c),
        )
    }
}
