use rand::seq::SliceRandom;
use rand::Rng;
use shared::geometry::Coordinate;
use shared::{Board, Configuration};

use super::{candidates, TargetingStrategy};

/// Ignores scoring entirely; uniformly picks among the candidate set.
#[derive(Clone)]
pub struct Random {
    parity: bool,
}

impl Random {
    pub fn new() -> Self {
        Random { parity: rand::thread_rng().gen_bool(0.5) }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetingStrategy for Random {
    fn name(&self) -> &'static str {
        "random"
    }

    fn new_game(&mut self) {
        self.parity = rand::thread_rng().gen_bool(0.5);
    }

    fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate> {
        let mut coords = candidates(board, config, self.parity);
        coords.shuffle(&mut rand::thread_rng());
        coords.into_iter().next()
    }
}
