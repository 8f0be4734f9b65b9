use std::cell::RefCell;
use std::collections::HashMap;

use rand::Rng;
use shared::geometry::{Coordinate, Direction};
use shared::ship::is_miss;
use shared::{Board, Configuration};

use super::heuristic::frenzy_score;
use super::{candidates, edge_weight_from_env, pick_best, search_score, TargetingStrategy};

/// Below this many legal placements for the as-yet-unsunk roster, the
/// per-cell counts are too sparse to trust; `PlacementSearch` falls back to
/// plain `Heuristic` scoring rather than multiplying by noise.
const IMPROBABILITY_LIMIT: u32 = 15;

/// Wraps `Heuristic` with a DFS count of legal remaining-ship placements per
/// cell, multiplying the frenzy score by how many of those placements cover
/// it. Falls back to unmultiplied `Heuristic` scoring when the count is
/// IMPROBABLE (below [`IMPROBABILITY_LIMIT`]) or too little is known yet
/// (`hit_count < 2`).
#[derive(Clone)]
pub struct PlacementSearch {
    parity: bool,
    edge_weight: f64,
    /// Keyed by the board's descriptor string: the legal-placement count is
    /// purely a function of the board's hit/miss/unknown cells, so a second
    /// call against the same descriptor reuses the prior DFS result.
    cache: RefCell<HashMap<String, Vec<u32>>>,
}

impl PlacementSearch {
    pub fn new() -> Self {
        PlacementSearch {
            parity: rand::thread_rng().gen_bool(0.5),
            edge_weight: edge_weight_from_env(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The remaining ship roster: every configured ship length, minus one
    /// entry per hit run that is already capped by a miss or the board edge
    /// on both ends (a greedy approximation of "this ship is sunk").
    fn remaining_lengths(board: &Board, config: &Configuration) -> Vec<u32> {
        let mut lengths: Vec<u32> = config.ships().iter().map(|s| s.length()).collect();
        let area = config.ship_area();

        for idx in 0..area.area() {
            let start = area.to_coord(idx);
            let Some(sq) = board.get_square(start) else { continue };
            if !shared::ship::is_hit(sq) {
                continue;
            }
            for &dir in &[Direction::East, Direction::South] {
                let before = opposite(dir);
                if board.get_square(start.shift(before)).map(shared::ship::is_hit).unwrap_or(false) {
                    // not the start of this run
                    continue;
                }
                let run = 1 + board.hit_run(start, dir);
                let end = start.shift_by(dir, run - 1);
                let capped_start = board.get_square(start.shift(before)).map(|s| s != shared::ship::NONE).unwrap_or(true);
                let capped_end = board.get_square(end.shift(dir)).map(|s| s != shared::ship::NONE).unwrap_or(true);
                if capped_start && capped_end {
                    if let Some(pos) = lengths.iter().position(|&l| l == run) {
                        lengths.remove(pos);
                    }
                }
            }
        }
        lengths
    }

    /// Per-cell count of placements, over every remaining ship length and
    /// both orientations, that fit on the board and touch no miss.
    fn legal_counts(board: &Board, config: &Configuration) -> Vec<u32> {
        let area = config.ship_area();
        let mut counts = vec![0u32; area.area()];
        let lengths = Self::remaining_lengths(board, config);

        for length in lengths {
            for &dir in &[Direction::East, Direction::South] {
                for idx in 0..area.area() {
                    let start = area.to_coord(idx);
                    if board.dist_to_edge(start, dir) + 1 < length {
                        continue;
                    }
                    let mut cells = Vec::with_capacity(length as usize);
                    let mut fits = true;
                    let mut cur = start;
                    for i in 0..length {
                        if i > 0 {
                            cur = cur.shift(dir);
                        }
                        match board.get_square(cur) {
                            Some(sq) if is_miss(sq) => {
                                fits = false;
                                break;
                            }
                            Some(_) => cells.push(cur),
                            None => {
                                fits = false;
                                break;
                            }
                        }
                    }
                    if fits {
                        for cell in cells {
                            if let Some(i) = area.to_index(cell) {
                                counts[i] += 1;
                            }
                        }
                    }
                }
            }
        }
        counts
    }

    fn legal_at(&self, board: &Board, config: &Configuration, coord: Coordinate) -> (u32, u32) {
        let key = board.descriptor();
        let mut cache = self.cache.borrow_mut();
        let counts = cache.entry(key).or_insert_with(|| Self::legal_counts(board, config));
        let area = config.ship_area();
        let total: u32 = counts.iter().sum();
        let at = area.to_index(coord).and_then(|i| counts.get(i)).copied().unwrap_or(0);
        (at, total)
    }
}

fn opposite(dir: Direction) -> Direction {
    match dir {
        Direction::North => Direction::South,
        Direction::South => Direction::North,
        Direction::East => Direction::West,
        Direction::West => Direction::East,
    }
}

impl Default for PlacementSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetingStrategy for PlacementSearch {
    fn name(&self) -> &'static str {
        "placement-search"
    }

    fn new_game(&mut self) {
        self.parity = rand::thread_rng().gen_bool(0.5);
        self.cache.borrow_mut().clear();
    }

    fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate> {
        let coords = candidates(board, config, self.parity);
        let edge_weight = self.edge_weight;

        if board.hit_count() < 2 {
            return pick_best(
                board,
                coords,
                |c| search_score(board, config, c, edge_weight),
                |c| frenzy_score(board, config, c, edge_weight),
            );
        }

        let (_, total) = self.legal_at(board, config, coords.first().copied().unwrap_or(Coordinate::invalid()));
        if total < IMPROBABILITY_LIMIT {
            return pick_best(
                board,
                coords,
                |c| search_score(board, config, c, edge_weight),
                |c| frenzy_score(board, config, c, edge_weight),
            );
        }

        pick_best(
            board,
            coords,
            |c| search_score(board, config, c, edge_weight),
            |c| {
                let (legal, total) = self.legal_at(board, config, c);
                let multiplier = 1.0 + legal as f64 / total.max(1) as f64;
                frenzy_score(board, config, c, edge_weight) * multiplier
            },
        )
    }
}
