//! Immutable game parameters agreed on before a match starts: board size,
//! ship roster, player-count bounds, and the derived point goal / maximum
//! surface area used by random placement and the targeting engine.

use crate::geometry::Rectangle;
use crate::ship::Ship;

/// Immutable once built. Use `ConfigurationBuilder` (or `Configuration::classic`)
/// to construct one; every field here has already been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    name: String,
    min_players: u32,
    max_players: u32,
    ship_area: Rectangle,
    ships: Vec<Ship>,
    allow_adjacent: bool,
}

impl Configuration {
    /// The canonical 10x10 board with the classic five-ship roster
    /// (`A5,B4,C3,D3,E2`), matching this crate's `--config classic` preset.
    pub fn classic() -> Configuration {
        ConfigurationBuilder::new("classic")
            .min_players(2)
            .max_players(9)
            .board_size(10, 10)
            .add_ship(Ship::new(b'A', 5).expect("literal ship is valid"))
            .add_ship(Ship::new(b'B', 4).expect("literal ship is valid"))
            .add_ship(Ship::new(b'C', 3).expect("literal ship is valid"))
            .add_ship(Ship::new(b'D', 3).expect("literal ship is valid"))
            .add_ship(Ship::new(b'E', 2).expect("literal ship is valid"))
            .build()
            .expect("classic preset is internally consistent")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_players(&self) -> u32 {
        self.min_players
    }

    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    pub fn ship_area(&self) -> Rectangle {
        self.ship_area
    }

    pub fn board_width(&self) -> u32 {
        self.ship_area.width()
    }

    pub fn board_height(&self) -> u32 {
        self.ship_area.height()
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn allow_adjacent(&self) -> bool {
        self.allow_adjacent
    }

    /// Sum of all ship lengths: the number of hits needed to sink every
    /// opponent ship.
    pub fn point_goal(&self) -> u32 {
        self.ships.iter().map(|s| s.length()).sum()
    }

    /// `Σ (2*len + 2)` — the densest "fully boxed in" perimeter a fleet of
    /// this size could expose; used to normalize the min-surface-area ratio.
    pub fn max_surface_area(&self) -> u32 {
        self.ships.iter().map(|s| 2 * s.length() + 2).sum()
    }

    pub fn longest_ship(&self) -> Option<Ship> {
        self.ships.iter().copied().max_by_key(|s| s.length())
    }

    pub fn shortest_ship(&self) -> Option<Ship> {
        self.ships.iter().copied().min_by_key(|s| s.length())
    }

    fn is_valid(&self) -> bool {
        let w = self.board_width();
        let h = self.board_height();
        let max_dim = (crate::ship::MAX_ID - crate::ship::MIN_ID) as u32 + 1;
        self.min_players >= 2
            && self.max_players >= self.min_players
            && w <= max_dim
            && h <= max_dim
            && (self.point_goal() + self.max_surface_area()) <= (w * h)
            && !self.ships.is_empty()
    }
}

/// Builds a `Configuration`, validating once at `build()` time rather than
/// on every field access.
pub struct ConfigurationBuilder {
    name: String,
    min_players: u32,
    max_players: u32,
    width: u32,
    height: u32,
    ships: Vec<Ship>,
    allow_adjacent: bool,
}

impl ConfigurationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ConfigurationBuilder {
            name: name.into(),
            min_players: 2,
            max_players: 2,
            width: 10,
            height: 10,
            ships: Vec::new(),
            allow_adjacent: true,
        }
    }

    pub fn min_players(mut self, value: u32) -> Self {
        self.min_players = value;
        self
    }

    pub fn max_players(mut self, value: u32) -> Self {
        self.max_players = value;
        self
    }

    pub fn board_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn add_ship(mut self, ship: Ship) -> Self {
        self.ships.push(ship);
        self
    }

    /// Resolves the Open Question on ship adjacency: `false` forbids two
    /// ship cells from sharing a side (see `Board::add_random_ships`'s
    /// min-surface-area filter); default is `true`.
    pub fn allow_adjacent(mut self, value: bool) -> Self {
        self.allow_adjacent = value;
        self
    }

    pub fn build(self) -> Result<Configuration, crate::error::GameError> {
        let config = Configuration {
            name: self.name,
            min_players: self.min_players,
            max_players: self.max_players,
            ship_area: Rectangle::sized(self.width, self.height),
            ships: self.ships,
            allow_adjacent: self.allow_adjacent,
        };
        if config.is_valid() {
            Ok(config)
        } else {
            Err(crate::error::GameError::Config(format!(
                "invalid configuration '{}'",
                config.name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_preset_is_valid() {
        let config = Configuration::classic();
        assert_eq!(config.point_goal(), 17);
        assert_eq!(config.board_width(), 10);
        assert_eq!(config.board_height(), 10);
        assert!(config.is_valid());
    }

    #[test]
    fn builder_rejects_too_few_min_players() {
        let result = ConfigurationBuilder::new("bad")
            .min_players(1)
            .max_players(4)
            .board_size(10, 10)
            .add_ship(Ship::new(b'A', 5).unwrap())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_board_too_small_for_fleet() {
        let result = ConfigurationBuilder::new("tiny")
            .min_players(2)
            .max_players(2)
            .board_size(2, 2)
            .add_ship(Ship::new(b'A', 5).unwrap())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_empty_fleet() {
        let result = ConfigurationBuilder::new("empty")
            .min_players(2)
            .max_players(2)
            .board_size(10, 10)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn longest_and_shortest_ship_are_correct() {
        let config = Configuration::classic();
        assert_eq!(config.longest_ship().unwrap().length(), 5);
        assert_eq!(config.shortest_ship().unwrap().length(), 2);
    }

    #[test]
    fn max_surface_area_matches_formula() {
        let config = ConfigurationBuilder::new("one-ship")
            .min_players(2)
            .max_players(2)
            .board_size(10, 10)
            .add_ship(Ship::new(b'A', 5).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.max_surface_area(), 2 * 5 + 2);
    }
}
