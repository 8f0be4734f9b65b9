use rand::Rng;
use shared::geometry::{Coordinate, Direction};
use shared::ship::is_hit;
use shared::{Board, Configuration};

use super::{candidates, edge_weight_from_env, max_len, pick_best, search_score, weight, TargetingStrategy};

/// The full frenzy preference table (§4.7), ported branch-for-branch from
/// `frenzyScore()`: in-line with an existing hit run, or one of the
/// perpendicular-neighbor configurations, each falling back to a
/// `search_score`-scaled weight rather than a flat one except for the
/// "adjacent to a lone hit" and "elbow" rows, which use fixed multipliers.
#[derive(Clone)]
pub struct Heuristic {
    parity: bool,
    edge_weight: f64,
}

impl Heuristic {
    pub fn new() -> Self {
        Heuristic { parity: rand::thread_rng().gen_bool(0.5), edge_weight: edge_weight_from_env() }
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Self::new()
    }
}

fn hit_at(board: &Board, coord: Coordinate) -> bool {
    board.get_square(coord).map(is_hit).unwrap_or(false)
}

/// Length of the hit-line through `coord` along the given axis, counting
/// `coord` itself when it is a hit. Distinct from `Board::horizontal_hits`/
/// `vertical_hits`, which only count the runs either side of `coord` — this
/// is used against a neighbor cell that may itself be the hit in question,
/// so a lone untouched-on-both-sides hit still reads as line length 1
/// rather than 0.
fn hit_line_len(board: &Board, coord: Coordinate, horizontal: bool) -> u32 {
    let run = if horizontal { board.horizontal_hits(coord) } else { board.vertical_hits(coord) };
    run + hit_at(board, coord) as u32
}

/// The frenzy-branch score for one candidate cell, per the table above.
/// Exposed so `PlacementSearch` can reuse it underneath its legality filter.
pub fn frenzy_score(board: &Board, config: &Configuration, coord: Coordinate, edge_weight: f64) -> f64 {
    let w = weight(board, config);
    let long_ship = max_len(config);

    let line_len = board.max_inline_hits(coord);
    if line_len > 1 {
        // in-line with 2+ sequential hits: extend it.
        let line_len = line_len as f64;
        return w * (2.0 + (long_ship - long_ship.min(line_len)));
    }

    // Perpendicular hit-line presence one step out in each direction: is
    // the neighbor in that direction itself a hit forming a line (length
    // >= 1, counting a lone hit as a line of length 1)?
    let np = hit_line_len(board, coord.shift(Direction::North), true);
    let sp = hit_line_len(board, coord.shift(Direction::South), true);
    let ep = hit_line_len(board, coord.shift(Direction::East), false);
    let wp = hit_line_len(board, coord.shift(Direction::West), false);

    if np + sp + ep + wp == 1 {
        // adjacent to a lone hit: score by how many free cells extend past it.
        let free = if hit_at(board, coord.shift(Direction::North)) {
            board.adjacent_free(coord.shift(Direction::North))
        } else if hit_at(board, coord.shift(Direction::South)) {
            board.adjacent_free(coord.shift(Direction::South))
        } else if hit_at(board, coord.shift(Direction::East)) {
            board.adjacent_free(coord.shift(Direction::East))
        } else {
            board.adjacent_free(coord.shift(Direction::West))
        };
        let score = match free {
            1 => 99.0,
            2 => 2.0,
            3 => 1.8,
            _ => 1.5,
        };
        return score * w;
    }

    match [np, sp, ep, wp].iter().filter(|&&n| n == 0).count() {
        0 => search_score(board, config, coord, edge_weight) * 1.4,
        1 => search_score(board, config, coord, edge_weight) * 1.5,
        2 => {
            if np > 0 && sp > 0 {
                let corners_all_hit = hit_at(board, coord.shift(Direction::North).shift(Direction::East))
                    && hit_at(board, coord.shift(Direction::North).shift(Direction::West))
                    && hit_at(board, coord.shift(Direction::South).shift(Direction::East))
                    && hit_at(board, coord.shift(Direction::South).shift(Direction::West));
                if corners_all_hit {
                    // between two parallel horizontal hit lines.
                    search_score(board, config, coord, edge_weight) * 1.3
                } else {
                    w * 1.5 // possible elbow pattern
                }
            } else if ep > 0 && wp > 0 {
                let corners_all_hit = hit_at(board, coord.shift(Direction::North).shift(Direction::East))
                    && hit_at(board, coord.shift(Direction::North).shift(Direction::West))
                    && hit_at(board, coord.shift(Direction::South).shift(Direction::East))
                    && hit_at(board, coord.shift(Direction::South).shift(Direction::West));
                if corners_all_hit {
                    // between two parallel vertical hit lines.
                    search_score(board, config, coord, edge_weight) * 1.3
                } else {
                    w * 1.5 // possible elbow pattern
                }
            } else {
                w * 1.5 // inside the bend of an elbow
            }
        }
        3 => {
            // adjacent to exactly one perpendicular hit line.
            let (a, b) = if np > 0 {
                (
                    hit_at(board, coord.shift(Direction::North).shift(Direction::East)),
                    hit_at(board, coord.shift(Direction::North).shift(Direction::West)),
                )
            } else if sp > 0 {
                (
                    hit_at(board, coord.shift(Direction::South).shift(Direction::East)),
                    hit_at(board, coord.shift(Direction::South).shift(Direction::West)),
                )
            } else if ep > 0 {
                (
                    hit_at(board, coord.shift(Direction::East).shift(Direction::North)),
                    hit_at(board, coord.shift(Direction::East).shift(Direction::South)),
                )
            } else {
                (
                    hit_at(board, coord.shift(Direction::West).shift(Direction::North)),
                    hit_at(board, coord.shift(Direction::West).shift(Direction::South)),
                )
            };
            if a && b {
                search_score(board, config, coord, edge_weight) * 1.1 // probably the side of a ship
            } else {
                search_score(board, config, coord, edge_weight) * 1.8 // end of a line: possible elbow
            }
        }
        _ => 0.0,
    }
}

impl TargetingStrategy for Heuristic {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn new_game(&mut self) {
        self.parity = rand::thread_rng().gen_bool(0.5);
    }

    fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate> {
        let coords = candidates(board, config, self.parity);
        let edge_weight = self.edge_weight;
        pick_best(
            board,
            coords,
            |c| search_score(board, config, c, edge_weight),
            |c| frenzy_score(board, config, c, edge_weight),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::configuration::ConfigurationBuilder;
    use shared::ship::Ship;

    fn config() -> Configuration {
        ConfigurationBuilder::new("test")
            .min_players(2)
            .max_players(2)
            .board_size(10, 10)
            .add_ship(Ship::new(b'A', 5).unwrap())
            .add_ship(Ship::new(b'B', 4).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn extending_a_confirmed_line_scores_by_remaining_capacity() {
        let config = config();
        let mut board = Board::new(0, "opponent".to_string(), &config);
        board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
        board.shoot(Coordinate::new(1, 1));
        board.shoot(Coordinate::new(2, 1));

        // line_len == 2 against a longest ship of 5: score == w * (2 + (5 - 2)).
        let extend = frenzy_score(&board, &config, Coordinate::new(3, 1), 0.0);
        let w = weight(&board, &config);
        assert_approx_eq!(extend, w * 5.0);
    }

    #[test]
    fn a_lone_hit_boxed_to_one_free_side_scores_far_above_a_midship_hit() {
        let config = config();
        // A hit in the middle of a placed ship has free cells on both
        // perpendicular sides but ship cells on both in-line sides: exactly
        // 2 free sides past the hit, the table's middle lone-hit preference.
        let mut mid_board = Board::new(0, "opponent".to_string(), &config);
        mid_board.place_ship(Ship::new(b'B', 4).unwrap(), Coordinate::new(5, 5), Direction::East);
        mid_board.shoot(Coordinate::new(6, 5));
        let mid = frenzy_score(&mid_board, &config, Coordinate::new(6, 4), 0.0);
        let w = weight(&mid_board, &config);
        assert_approx_eq!(mid, w * 2.0);

        // A lone hit boxed against the board's corner has only one free
        // neighbor past it, the table's highest lone-hit preference (99).
        let mut boxed_board = Board::new(0, "opponent".to_string(), &config);
        boxed_board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
        boxed_board.shoot(Coordinate::new(1, 1));
        let boxed = frenzy_score(&boxed_board, &config, Coordinate::new(2, 1), 0.0);
        let w = weight(&boxed_board, &config);
        assert_approx_eq!(boxed, w * 99.0);

        assert!(boxed > mid);
    }

    #[test]
    fn targets_a_cell_adjacent_to_a_hit() {
        let config = config();
        let mut board = Board::new(0, "opponent".to_string(), &config);
        board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(5, 5), Direction::East);
        board.shoot(Coordinate::new(5, 5));

        let mut strategy = Heuristic::new();
        let choice = strategy.target(&board, &config).unwrap();
        assert!(board.adjacent_hits(choice) > 0);
    }
}
