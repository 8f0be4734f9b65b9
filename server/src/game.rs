//! The canonical match state machine: joined boards, turn order, the
//! current-to-move player, and the termination check run after every shot
//! and every `next_turn`.
//!
//! `Game` exclusively owns its `Board`s; callers reach a board by index or
//! by name lookup, never by a reference stored across turns.

use std::time::{Instant, SystemTime};

use rand::seq::SliceRandom;
use shared::board::Board;
use shared::configuration::Configuration;
use shared::error::GameError;
use shared::database::{game_record_id, player_record_id, DBRecord, FileSysDatabase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Lobby,
    Running,
    Finished,
    Aborted,
}

/// Per-board summary saved at the end of a match.
#[derive(Debug, Clone)]
pub struct BoardResult {
    pub name: String,
    pub score: u32,
    pub skips: u32,
    pub turns: u32,
    pub first_place: bool,
    pub last_place: bool,
}

pub struct Game {
    config: Configuration,
    title: String,
    status: GameStatus,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    aborted_at: Option<SystemTime>,
    turn_count: u32,
    board_to_move: usize,
    boards: Vec<Board>,
    /// When the current `board_to_move` became the to-move player; reset by
    /// `start`, `next_turn` and `set_next_turn` so the server loop can
    /// auto-skip a connected player who simply never answers their turn.
    turn_started_at: Instant,
}

impl Game {
    pub fn new(config: Configuration, title: impl Into<String>) -> Self {
        Game {
            config,
            title: title.into(),
            status: GameStatus::Lobby,
            started_at: None,
            finished_at: None,
            aborted_at: None,
            turn_count: 0,
            board_to_move: 0,
            boards: Vec::new(),
            turn_started_at: Instant::now(),
        }
    }

    /// How long the current to-move player has held their turn.
    pub fn turn_elapsed(&self) -> std::time::Duration {
        self.turn_started_at.elapsed()
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_lobby(&self) -> bool {
        self.status == GameStatus::Lobby
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn boards_mut(&mut self) -> &mut [Board] {
        &mut self.boards
    }

    pub fn board_index(&self, name: &str) -> Option<usize> {
        self.boards.iter().position(|b| b.name() == name)
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.board_index(name).map(|i| &self.boards[i])
    }

    pub fn board_mut(&mut self, name: &str) -> Option<&mut Board> {
        let idx = self.board_index(name)?;
        Some(&mut self.boards[idx])
    }

    pub fn board_by_handle_mut(&mut self, handle: i64) -> Option<&mut Board> {
        self.boards.iter_mut().find(|b| b.handle() == handle)
    }

    pub fn board_to_move(&self) -> Option<&Board> {
        self.boards.get(self.board_to_move)
    }

    pub fn board_to_move_name(&self) -> Option<&str> {
        self.board_to_move().map(|b| b.name())
    }

    /// Legal only in `Lobby`; rejects a duplicate name.
    pub fn add_board(&mut self, board: Board) -> Result<(), GameError> {
        if !self.is_lobby() {
            return Err(GameError::InvalidState(
                "cannot join after the game has started".to_string(),
            ));
        }
        if self.board_index(board.name()).is_some() {
            return Err(GameError::Validation(format!(
                "name already taken: {}",
                board.name()
            )));
        }
        if self.boards.len() as u32 >= self.config.max_players() {
            return Err(GameError::Validation("game is full".to_string()));
        }
        self.boards.push(board);
        Ok(())
    }

    pub fn player_count(&self) -> usize {
        self.boards.len()
    }

    pub fn can_start(&self) -> bool {
        let n = self.boards.len() as u32;
        self.is_lobby() && n >= self.config.min_players() && n <= self.config.max_players()
    }

    /// Legal only in `Lobby`; requires the configured player-count bounds.
    pub fn start(&mut self, randomize_order: bool) -> Result<(), GameError> {
        if !self.can_start() {
            return Err(GameError::InvalidState(
                "cannot start: player count out of configured bounds".to_string(),
            ));
        }
        if randomize_order {
            self.boards.shuffle(&mut rand::thread_rng());
        }
        self.board_to_move = 0;
        for (i, board) in self.boards.iter_mut().enumerate() {
            board.set_to_move(i == 0);
        }
        self.status = GameStatus::Running;
        self.started_at = Some(SystemTime::now());
        self.turn_started_at = Instant::now();
        Ok(())
    }

    pub fn order(&self) -> Vec<String> {
        self.boards.iter().map(|b| b.name().to_string()).collect()
    }

    /// Advances `board_to_move` modulo board count; increments `turn_count`
    /// when the index wraps back to 0.
    pub fn next_turn(&mut self) {
        if self.boards.is_empty() {
            return;
        }
        if let Some(board) = self.boards.get_mut(self.board_to_move) {
            board.set_to_move(false);
        }
        self.board_to_move = (self.board_to_move + 1) % self.boards.len();
        if self.board_to_move == 0 {
            self.turn_count += 1;
        }
        if let Some(board) = self.boards.get_mut(self.board_to_move) {
            board.set_to_move(true);
        }
        self.turn_started_at = Instant::now();
        self.check_finished();
    }

    /// Sets the to-move player by name. Allowed even when that board is
    /// disconnected: the server loop is responsible for auto-skipping it on
    /// the next tick rather than `set_next_turn` silently refusing or
    /// silently skipping past it (see DESIGN.md).
    pub fn set_next_turn(&mut self, name: &str) -> Result<(), GameError> {
        let idx = self
            .board_index(name)
            .ok_or_else(|| GameError::Validation(format!("no such player: {name}")))?;
        if let Some(board) = self.boards.get_mut(self.board_to_move) {
            board.set_to_move(false);
        }
        self.board_to_move = idx;
        self.boards[idx].set_to_move(true);
        self.turn_started_at = Instant::now();
        Ok(())
    }

    /// Marks `handle`'s board disconnected. In `Lobby` the board is removed
    /// entirely; in `Running` the slot is kept but treated as dead for shot
    /// resolution and auto-skipped on its turn.
    pub fn disconnect(&mut self, handle: i64) -> Option<String> {
        if self.is_lobby() {
            if let Some(idx) = self.boards.iter().position(|b| b.handle() == handle) {
                let name = self.boards[idx].name().to_string();
                self.boards.remove(idx);
                return Some(name);
            }
            return None;
        }
        if let Some(board) = self.board_by_handle_mut(handle) {
            board.set_handle(-1);
            board.set_status("disconnected");
            let name = board.name().to_string();
            self.check_finished();
            Some(name)
        } else {
            None
        }
    }

    pub fn abort(&mut self) {
        self.aborted_at = Some(SystemTime::now());
        self.status = GameStatus::Aborted;
    }

    fn finish(&mut self) {
        self.finished_at = Some(SystemTime::now());
        self.status = GameStatus::Finished;
    }

    pub fn is_board_dead(board: &Board) -> bool {
        board.is_dead()
    }

    pub fn max_score(&self) -> u32 {
        self.boards.iter().map(|b| b.score()).max().unwrap_or(0)
    }

    /// `finished ⇔ aborted ∨ all boards dead ∨ (maxScore ≥ pointGoal ∧ all
    /// boards have equal turn counts)`. Recomputed after every shot and
    /// after every `next_turn`.
    pub fn check_finished(&mut self) {
        if self.status != GameStatus::Running {
            return;
        }
        let all_dead = !self.boards.is_empty() && self.boards.iter().all(|b| b.is_dead());
        let turns: Vec<u32> = self.boards.iter().map(|b| b.turns()).collect();
        let turns_converged = !turns.is_empty()
            && turns.iter().min() == turns.iter().max();
        let goal_reached = self.max_score() >= self.config.point_goal() && turns_converged;
        if all_dead || goal_reached {
            self.finish();
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, GameStatus::Finished | GameStatus::Aborted)
    }

    /// Per-board aggregate counters for the `F`/`R` broadcast and for
    /// persistence; first/last place are computed against final scores.
    pub fn results(&self) -> Vec<BoardResult> {
        let max = self.boards.iter().map(|b| b.score()).max().unwrap_or(0);
        let min = self.boards.iter().map(|b| b.score()).min().unwrap_or(0);
        self.boards
            .iter()
            .map(|b| BoardResult {
                name: b.name().to_string(),
                score: b.score(),
                skips: b.skips(),
                turns: b.turns(),
                first_place: b.score() == max,
                last_place: b.score() == min,
            })
            .collect()
    }

    /// Appends this match's aggregate counters to the per-player and
    /// per-game records in the key=value database.
    pub fn save_results(&self, db: &FileSysDatabase) -> Result<(), GameError> {
        let results = self.results();

        let mut game_record = db.get(&game_record_id(&self.title))?;
        for result in &results {
            game_record.add("player", &result.name)?;
            game_record.add("score", result.score.to_string())?;
        }
        db.sync(&game_record)?;

        for result in &results {
            let mut record = db.get(&player_record_id(&result.name))?;
            record.add("score", result.score.to_string())?;
            record.add("skips", result.skips.to_string())?;
            record.add("turns", result.turns.to_string())?;
            if result.first_place {
                record.add("wins", "1")?;
            }
            if result.last_place {
                record.add("losses", "1")?;
            }
            db.sync(&record)?;
        }
        Ok(())
    }
}

/// `test.<W>x<H>.<bot>-<version>` style record used by the bot tester; kept
/// here rather than in `shared::database` since only the server and the bot
/// tester care about the shape of the counters inside it.
pub fn bot_test_record(record: &mut DBRecord, games: u32, wins: u32, avg_turns: f64) -> Result<(), GameError> {
    record.set("games", games.to_string())?;
    record.set("wins", wins.to_string())?;
    record.set("avg_turns", format!("{avg_turns:.2}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::configuration::ConfigurationBuilder;
    use shared::ship::Ship;

    fn config() -> Configuration {
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

    fn game_with_two_boards() -> Game {
        let cfg = config();
        let mut game = Game::new(cfg.clone(), "friendly");
        game.add_board(Board::new(1, "alice".to_string(), &cfg)).unwrap();
        game.add_board(Board::new(2, "bob".to_string(), &cfg)).unwrap();
        game
    }

    #[test]
    fn add_board_rejects_duplicate_name() {
        let mut game = game_with_two_boards();
        let err = game.add_board(Board::new(3, "alice".to_string(), game.config())).unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn start_requires_player_bounds_and_sets_first_to_move() {
        let mut game = game_with_two_boards();
        game.start(false).unwrap();
        assert!(game.is_running());
        assert_eq!(game.board_to_move_name(), Some("alice"));
        assert!(game.boards()[0].is_to_move());
        assert!(!game.boards()[1].is_to_move());
    }

    #[test]
    fn next_turn_wraps_and_increments_turn_count() {
        let mut game = game_with_two_boards();
        game.start(false).unwrap();
        game.next_turn();
        assert_eq!(game.board_to_move_name(), Some("bob"));
        assert_eq!(game.turn_count(), 0);
        game.next_turn();
        assert_eq!(game.board_to_move_name(), Some("alice"));
        assert_eq!(game.turn_count(), 1);
    }

    #[test]
    fn disconnect_in_lobby_removes_board_entirely() {
        let mut game = game_with_two_boards();
        let removed = game.disconnect(1);
        assert_eq!(removed, Some("alice".to_string()));
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn disconnect_while_running_keeps_slot_but_marks_dead() {
        let mut game = game_with_two_boards();
        game.start(false).unwrap();
        game.disconnect(1);
        assert_eq!(game.player_count(), 2);
        assert!(game.board("alice").unwrap().is_dead());
    }

    #[test]
    fn finishes_when_all_boards_dead() {
        let mut game = game_with_two_boards();
        game.start(false).unwrap();
        game.disconnect(1);
        game.disconnect(2);
        assert!(game.is_finished());
    }

    #[test]
    fn set_next_turn_targets_named_board_even_if_disconnected() {
        let mut game = game_with_two_boards();
        game.start(false).unwrap();
        game.disconnect(2);
        game.set_next_turn("bob").unwrap();
        assert_eq!(game.board_to_move_name(), Some("bob"));
    }
}
