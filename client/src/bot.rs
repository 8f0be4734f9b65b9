//! The capability set a bot (in-process or shell) exposes to the
//! [`crate::driver`], and [`EngineBot`], the in-process adapter from a
//! [`crate::targeting::TargetingStrategy`] to a full bot.

use std::collections::HashMap;

use shared::geometry::Coordinate;
use shared::{Board, Configuration};

use crate::targeting::TargetingStrategy;

/// Everything the driver needs to ask of a bot over the life of one match.
/// A human player doesn't implement this; only in-process and shell bots do.
pub trait Bot {
    fn name(&self) -> &str;

    /// A fresh match against `config` has begun; `you` is this bot's own
    /// player name.
    fn new_game(&mut self, config: &Configuration, you: &str);

    /// Another player (or this bot itself) has joined the lobby.
    fn player_joined(&mut self, name: &str);

    /// The match has started in the given turn order.
    fn start_game(&mut self, order: &[String]);

    fn finish_game(&mut self);

    /// A `B` update arrived for `name`'s board.
    fn update_board(&mut self, name: &str, board: &Board);

    /// It is now `name`'s turn.
    fn next_turn(&mut self, name: &str);

    /// `shooter` hit or missed at `target`'s `square`.
    fn on_hit(&mut self, shooter: &str, target: &str, square: &str);

    fn on_message(&mut self, from: &str, text: &str);

    /// This bot's move: `(target player, coordinate)`, or `None` to skip.
    fn best_shot(&mut self, you: &str) -> Option<(String, Coordinate)>;
}

/// Adapts one [`TargetingStrategy`] into a [`Bot`] by tracking a separate
/// strategy instance per opponent (each opponent's board is an independent
/// hunt) plus a mirror of every board the server has described.
pub struct EngineBot<S: TargetingStrategy + Clone> {
    name: String,
    template: S,
    config: Option<Configuration>,
    boards: HashMap<String, Board>,
    strategies: HashMap<String, S>,
    order: Vec<String>,
}

impl<S: TargetingStrategy + Clone> EngineBot<S> {
    pub fn new(name: impl Into<String>, template: S) -> Self {
        EngineBot {
            name: name.into(),
            template,
            config: None,
            boards: HashMap::new(),
            strategies: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn strategy_for(&mut self, opponent: &str) -> &mut S {
        self.strategies.entry(opponent.to_string()).or_insert_with(|| {
            let mut s = self.template.clone();
            s.new_game();
            s
        })
    }
}

impl<S: TargetingStrategy + Clone> Bot for EngineBot<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self, config: &Configuration, _you: &str) {
        self.config = Some(config.clone());
        self.boards.clear();
        self.strategies.clear();
        self.order.clear();
    }

    fn player_joined(&mut self, name: &str) {
        if let Some(config) = &self.config {
            self.boards
                .entry(name.to_string())
                .or_insert_with(|| Board::new(0, name.to_string(), config));
        }
    }

    fn start_game(&mut self, order: &[String]) {
        self.order = order.to_vec();
    }

    fn finish_game(&mut self) {
        self.strategies.clear();
    }

    fn update_board(&mut self, name: &str, board: &Board) {
        self.boards.insert(name.to_string(), board.clone());
    }

    fn next_turn(&mut self, _name: &str) {}

    fn on_hit(&mut self, _shooter: &str, _target: &str, _square: &str) {}

    fn on_message(&mut self, _from: &str, _text: &str) {}

    fn best_shot(&mut self, you: &str) -> Option<(String, Coordinate)> {
        let config = self.config.clone()?;
        let opponents: Vec<String> = self
            .order
            .iter()
            .filter(|n| n.as_str() != you)
            .cloned()
            .collect();

        for opponent in opponents {
            let board = match self.boards.get(&opponent) {
                Some(b) if !b.is_dead() && b.is_connected() => b.clone(),
                _ => continue,
            };
            let strategy = self.strategy_for(&opponent);
            if let Some(coord) = strategy.target(&board, &config) {
                return Some((opponent, coord));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targeting::Random;
    use shared::configuration::ConfigurationBuilder;
    use shared::ship::Ship;

    fn config() -> Configuration {
        ConfigurationBuilder::new("test")
            .min_players(2)
            .max_players(2)
            .board_size(5, 5)
            .add_ship(Ship::new(b'A', 2).unwrap())
            .build()
            .unwrap()
    }

    #[derive(Clone)]
    struct Wrapped(Random);
    impl TargetingStrategy for Wrapped {
        fn name(&self) -> &'static str {
            self.0.name()
        }
        fn new_game(&mut self) {
            self.0.new_game()
        }
        fn target(&mut self, board: &Board, config: &Configuration) -> Option<Coordinate> {
            self.0.target(board, config)
        }
    }

    #[test]
    fn picks_a_shot_against_a_live_opponent() {
        let config = config();
        let mut bot = EngineBot::new("bot", Wrapped(Random::new()));
        bot.new_game(&config, "bot");
        bot.player_joined("bot");
        bot.player_joined("opponent");
        bot.start_game(&["bot".to_string(), "opponent".to_string()]);
        bot.update_board("opponent", &Board::new(0, "opponent".to_string(), &config));

        let shot = bot.best_shot("bot");
        assert!(shot.is_some());
        assert_eq!(shot.unwrap().0, "opponent");
    }

    #[test]
    fn skips_when_every_opponent_is_dead() {
        let config = config();
        let mut bot = EngineBot::new("bot", Wrapped(Random::new()));
        bot.new_game(&config, "bot");
        bot.start_game(&["bot".to_string(), "opponent".to_string()]);
        // an empty board (no ships placed) has zero ship points, so
        // `hit_count() >= ship_point_count()` makes it dead from the start.
        let dead = Board::new(0, "opponent".to_string(), &config);
        assert!(dead.is_dead());
        bot.update_board("opponent", &dead);
        assert!(bot.best_shot("bot").is_none());
    }
}
