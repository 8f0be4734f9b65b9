//! Per-player board state: the ship area descriptor, identity, and the
//! pure queries the targeting engine and server loop both read from it.
//!
//! The descriptor is stored as a flat `Vec<u8>` of ASCII descriptor
//! characters (row-major) rather than a matrix of enums, per the design
//! note that masking/shooting/wire-framing should all be O(1) over the
//! same byte representation.

use crate::configuration::Configuration;
use crate::error::GameError;
use crate::geometry::{Coordinate, Direction, Rectangle};
use crate::ship;
use crate::ship::Ship;
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of `Board::place_ship`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceResult {
    Placed,
    OutOfBounds,
    Overlap,
}

/// Outcome of `Board::shoot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootResult {
    Hit(u8),
    Miss,
    Illegal,
}

#[derive(Debug, Clone)]
pub struct Board {
    name: String,
    handle: i64,
    descriptor: Vec<u8>,
    ship_area: Rectangle,
    status: String,
    score: u32,
    skips: u32,
    turns: u32,
    to_move: bool,
    hit_taunts: Vec<String>,
    miss_taunts: Vec<String>,
}

impl Board {
    pub fn new(handle: i64, name: String, config: &Configuration) -> Board {
        let area = config.ship_area();
        Board {
            name,
            handle,
            descriptor: vec![ship::NONE; area.area()],
            ship_area: area,
            status: String::new(),
            score: 0,
            skips: 0,
            turns: 0,
            to_move: false,
            hit_taunts: Vec::new(),
            miss_taunts: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> i64 {
        self.handle
    }

    pub fn set_handle(&mut self, handle: i64) {
        self.handle = handle;
    }

    pub fn is_connected(&self) -> bool {
        self.handle >= 0
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn set_score(&mut self, value: u32) {
        self.score = value;
    }

    pub fn inc_score(&mut self, value: u32) {
        self.score += value;
    }

    pub fn skips(&self) -> u32 {
        self.skips
    }

    pub fn set_skips(&mut self, value: u32) {
        self.skips = value;
    }

    pub fn inc_skips(&mut self, value: u32) {
        self.skips += value;
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn inc_turns(&mut self, value: u32) {
        self.turns += value;
    }

    pub fn is_to_move(&self) -> bool {
        self.to_move
    }

    pub fn set_to_move(&mut self, value: bool) {
        self.to_move = value;
    }

    pub fn ship_area(&self) -> Rectangle {
        self.ship_area
    }

    pub fn descriptor(&self) -> String {
        String::from_utf8_lossy(&self.descriptor).into_owned()
    }

    pub fn add_hit_taunt(&mut self, value: String) {
        if value.is_empty() {
            self.hit_taunts.clear();
        } else {
            self.hit_taunts.push(value);
        }
    }

    pub fn add_miss_taunt(&mut self, value: String) {
        if value.is_empty() {
            self.miss_taunts.clear();
        } else {
            self.miss_taunts.push(value);
        }
    }

    pub fn clear_hit_taunts(&mut self) {
        self.hit_taunts.clear();
    }

    pub fn clear_miss_taunts(&mut self) {
        self.miss_taunts.clear();
    }

    pub fn has_hit_taunts(&self) -> bool {
        !self.hit_taunts.is_empty()
    }

    pub fn has_miss_taunts(&self) -> bool {
        !self.miss_taunts.is_empty()
    }

    /// Picks one taunt at random, the same way the source's `rand()`-driven
    /// taunt selection worked.
    pub fn random_hit_taunt(&self) -> Option<&str> {
        self.hit_taunts
            .choose(&mut rand::thread_rng())
            .map(|s| s.as_str())
    }

    pub fn random_miss_taunt(&self) -> Option<&str> {
        self.miss_taunts
            .choose(&mut rand::thread_rng())
            .map(|s| s.as_str())
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self.descriptor.len() == self.ship_area.area()
            && self.descriptor.iter().all(|&c| is_descriptor_char(c))
    }

    pub fn is_dead(&self) -> bool {
        !self.is_connected() || self.hit_count() >= self.ship_point_count()
    }

    pub fn hit_count(&self) -> u32 {
        self.descriptor.iter().filter(|&&c| ship::is_hit(c)).count() as u32
    }

    pub fn miss_count(&self) -> u32 {
        self.descriptor.iter().filter(|&&c| ship::is_miss(c)).count() as u32
    }

    pub fn ship_point_count(&self) -> u32 {
        self.descriptor.iter().filter(|&&c| ship::is_ship(c)).count() as u32
    }

    pub fn get_square(&self, coord: Coordinate) -> Option<u8> {
        self.ship_area
            .to_index(coord)
            .map(|i| self.descriptor[i])
    }

    pub fn set_square(&mut self, coord: Coordinate, value: u8) -> Option<u8> {
        let idx = self.ship_area.to_index(coord)?;
        let previous = self.descriptor[idx];
        self.descriptor[idx] = value;
        Some(previous)
    }

    /// Replace the whole descriptor atomically; fails (leaving the board
    /// unchanged) on wrong length or an invalid character.
    pub fn update_descriptor(&mut self, new_descriptor: &str) -> bool {
        let bytes = new_descriptor.as_bytes();
        if bytes.len() != self.ship_area.area() || !bytes.iter().all(|&c| is_descriptor_char(c)) {
            return false;
        }
        self.descriptor = bytes.to_vec();
        true
    }

    /// Merge misses and hit-marks from `descriptor` into this board,
    /// leaving untouched cells as they are. Only `0`/`X`/lowercase cells in
    /// the incoming descriptor are meaningful.
    pub fn add_hits_and_misses(&mut self, descriptor: &str) -> bool {
        let bytes = descriptor.as_bytes();
        if bytes.len() != self.descriptor.len() {
            return false;
        }
        for (i, &incoming) in bytes.iter().enumerate() {
            if ship::is_miss(incoming) {
                self.descriptor[i] = ship::MISS;
            } else if ship::is_hit(incoming) {
                self.descriptor[i] = ship::hit(self.descriptor[i]);
            }
        }
        true
    }

    /// Applies `ship::mask` to every cell; idempotent.
    pub fn masked_descriptor(&self) -> String {
        self.descriptor
            .iter()
            .map(|&c| ship::mask(c) as char)
            .collect()
    }

    /// Shoot a single cell. `.` -> miss; `A..W` -> hit; anything already
    /// resolved (or out of the ship area) is `Illegal`.
    pub fn shoot(&mut self, coord: Coordinate) -> (ShootResult, Option<u8>) {
        let Some(idx) = self.ship_area.to_index(coord) else {
            return (ShootResult::Illegal, None);
        };
        let previous = self.descriptor[idx];
        if previous == ship::NONE {
            self.descriptor[idx] = ship::MISS;
            (ShootResult::Miss, Some(previous))
        } else if ship::is_valid_id(previous) {
            self.descriptor[idx] = ship::hit(previous);
            (ShootResult::Hit(previous), Some(previous))
        } else {
            (ShootResult::Illegal, Some(previous))
        }
    }

    /// Place a single ship starting at `start`, extending `dir` for
    /// `ship.length()` cells. Every cell must land inside the ship area and
    /// currently be `.`. Equivalent to
    /// `place_ship_checked(ship, start, dir, true)`.
    pub fn place_ship(&mut self, ship: Ship, start: Coordinate, dir: Direction) -> PlaceResult {
        self.place_ship_checked(ship, start, dir, true)
    }

    /// As `place_ship`, but when `allow_adjacent` is `false` also rejects
    /// placements where a new ship cell would share a side with an
    /// existing ship cell belonging to a different ship.
    pub fn place_ship_checked(
        &mut self,
        ship: Ship,
        start: Coordinate,
        dir: Direction,
        allow_adjacent: bool,
    ) -> PlaceResult {
        let mut indices = Vec::with_capacity(ship.length() as usize);
        let mut cursor = start;
        for i in 0..ship.length() {
            let Some(idx) = self.ship_area.to_index(cursor) else {
                return PlaceResult::OutOfBounds;
            };
            if self.descriptor[idx] != ship::NONE {
                return PlaceResult::Overlap;
            }
            if !allow_adjacent && self.has_foreign_ship_neighbor(cursor) {
                return PlaceResult::Overlap;
            }
            indices.push(idx);
            if i + 1 < ship.length() {
                cursor = cursor.shift(dir);
            }
        }
        for idx in indices {
            self.descriptor[idx] = ship.id();
        }
        PlaceResult::Placed
    }

    fn has_foreign_ship_neighbor(&self, coord: Coordinate) -> bool {
        Direction::ALL.iter().any(|&dir| {
            self.ship_area
                .to_index(coord.shift(dir))
                .map(|idx| ship::is_valid_id(self.descriptor[idx]))
                .unwrap_or(false)
        })
    }

    pub fn remove_ship(&mut self, ship: Ship) -> bool {
        let mut removed = false;
        for cell in self.descriptor.iter_mut() {
            if *cell == ship.id() {
                *cell = ship::NONE;
                removed = true;
            }
        }
        removed
    }

    pub fn clear_descriptor(&mut self) {
        self.descriptor = vec![ship::NONE; self.ship_area.area()];
    }

    /// Random ship placement: sort ships longest-first, up to 1000 attempts
    /// per ship (uniform start + South/East direction), then reject the
    /// whole board if its exposed-perimeter ratio falls below `msa` percent
    /// and retry (bounded at 10000 total board attempts).
    pub fn add_random_ships(&mut self, config: &Configuration, msa: u32) -> Result<(), GameError> {
        const PER_SHIP_ATTEMPTS: u32 = 1000;
        const TOTAL_BOARD_ATTEMPTS: u32 = 10000;

        let mut ships: Vec<Ship> = config.ships().to_vec();
        ships.sort_by(|a, b| b.length().cmp(&a.length()));

        let width = self.ship_area.width();
        let height = self.ship_area.height();
        let mut rng = rand::thread_rng();

        for _ in 0..TOTAL_BOARD_ATTEMPTS {
            self.clear_descriptor();
            let mut placed_all = true;

            for &ship in &ships {
                let mut placed = false;
                for _ in 0..PER_SHIP_ATTEMPTS {
                    let x = rng.gen_range(1..=width);
                    let y = rng.gen_range(1..=height);
                    let dir = if rng.gen_bool(0.5) {
                        Direction::South
                    } else {
                        Direction::East
                    };
                    let result = self.place_ship_checked(
                        ship,
                        Coordinate::new(x, y),
                        dir,
                        config.allow_adjacent(),
                    );
                    if result == PlaceResult::Placed {
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    placed_all = false;
                    break;
                }
            }

            if placed_all && self.exposed_perimeter_ratio() >= msa {
                return Ok(());
            }
        }

        Err(GameError::Config(
            "failed to place ships within retry bound".to_string(),
        ))
    }

    /// Count of `A..W` cells with at least one non-ship neighbor or border,
    /// divided by the placed fleet's own max possible surface area,
    /// expressed as a percentage `0..100` to compare directly against the
    /// percentage-normalized `msa` parameter.
    fn exposed_perimeter_ratio(&self) -> u32 {
        let exposed = self.exposed_perimeter_count();
        let max = self.max_possible_surface_area();
        if max == 0 {
            0
        } else {
            (exposed * 100) / max
        }
    }

    fn exposed_perimeter_count(&self) -> u32 {
        let mut count = 0u32;
        for idx in 0..self.descriptor.len() {
            if !ship::is_valid_id(self.descriptor[idx]) {
                continue;
            }
            let coord = self.ship_area.to_coord(idx);
            let exposed = Direction::ALL.iter().any(|&dir| {
                let neighbor = coord.shift(dir);
                match self.ship_area.to_index(neighbor) {
                    Some(n_idx) => !ship::is_valid_id(self.descriptor[n_idx]),
                    None => true,
                }
            });
            if exposed {
                count += 1;
            }
        }
        count
    }

    /// `2 * totalShipCells + 2 * distinctShipCount`, matching
    /// `Configuration::max_surface_area`'s `Σ(2*len + 2)` formula.
    fn max_possible_surface_area(&self) -> u32 {
        let total_cells = self
            .descriptor
            .iter()
            .filter(|&&c| ship::is_valid_id(c))
            .count() as u32;
        let distinct_ships: std::collections::HashSet<u8> = self
            .descriptor
            .iter()
            .copied()
            .filter(|&c| ship::is_valid_id(c))
            .collect();
        2 * total_cells + 2 * distinct_ships.len() as u32
    }

    pub fn adjacent_hits(&self, coord: Coordinate) -> u32 {
        Direction::ALL
            .iter()
            .filter(|&&dir| {
                self.ship_area
                    .to_index(coord.shift(dir))
                    .map(|idx| ship::is_hit(self.descriptor[idx]))
                    .unwrap_or(false)
            })
            .count() as u32
    }

    pub fn adjacent_free(&self, coord: Coordinate) -> u32 {
        Direction::ALL
            .iter()
            .filter(|&&dir| {
                self.ship_area
                    .to_index(coord.shift(dir))
                    .map(|idx| self.descriptor[idx] == ship::NONE)
                    .unwrap_or(false)
            })
            .count() as u32
    }

    /// Length of the contiguous run of hit cells starting at the neighbor
    /// of `coord` in direction `dir` and continuing in that same direction.
    pub fn hit_run(&self, coord: Coordinate, dir: Direction) -> u32 {
        let mut count = 0;
        let mut cursor = coord.shift(dir);
        while let Some(idx) = self.ship_area.to_index(cursor) {
            if !ship::is_hit(self.descriptor[idx]) {
                break;
            }
            count += 1;
            cursor = cursor.shift(dir);
        }
        count
    }

    /// Length of the contiguous run of untouched (`.`) cells starting at
    /// the neighbor of `coord` in direction `dir`.
    pub fn free_run(&self, coord: Coordinate, dir: Direction) -> u32 {
        let mut count = 0;
        let mut cursor = coord.shift(dir);
        while let Some(idx) = self.ship_area.to_index(cursor) {
            if self.descriptor[idx] != ship::NONE {
                break;
            }
            count += 1;
            cursor = cursor.shift(dir);
        }
        count
    }

    /// Distance from `coord` to the ship area's edge in direction `dir`.
    pub fn dist_to_edge(&self, coord: Coordinate, dir: Direction) -> u32 {
        let mut count = 0;
        let mut cursor = coord;
        loop {
            let next = cursor.shift(dir);
            if !self.ship_area.contains(next) {
                break;
            }
            count += 1;
            cursor = next;
        }
        count
    }

    pub fn horizontal_hits(&self, coord: Coordinate) -> u32 {
        self.hit_run(coord, Direction::West) + self.hit_run(coord, Direction::East)
    }

    pub fn vertical_hits(&self, coord: Coordinate) -> u32 {
        self.hit_run(coord, Direction::North) + self.hit_run(coord, Direction::South)
    }

    pub fn max_inline_hits(&self, coord: Coordinate) -> u32 {
        self.horizontal_hits(coord).max(self.vertical_hits(coord))
    }
}

fn is_descriptor_char(c: u8) -> bool {
    c == ship::NONE
        || c == ship::MISS
        || c == ship::HIT
        || ship::is_valid_id(c)
        || ship::is_valid_id(c.to_ascii_uppercase())
}
