//! In-process bot-tournament harness backing `--test` mode (§6): plays many
//! self-play matches of one targeting strategy against itself purely through
//! [`server::game::Game`], with no socket or child process involved, and
//! records aggregate win/turn counters under the `test.<W>x<H>.<bot>-<version>`
//! database record (§6's database layout).
//!
//! This exists so a strategy's quality can be measured the same way the
//! server or a live bot would exercise it — real `Board`/`Game` state,
//! shot-by-shot — without standing up a listener.

use shared::board::ShootResult;
use shared::configuration::ConfigurationBuilder;
use shared::database::{test_record_id, FileSysDatabase};
use shared::error::GameError;
use shared::ship::Ship;
use shared::Board;

use server::game::{bot_test_record, Game};

use crate::bot::{Bot, EngineBot};
use crate::targeting::TargetingStrategy;

/// Version stamped into the `test.<W>x<H>.<bot>-<version>` record ID,
/// bumped whenever this harness's scoring method changes meaningfully.
pub const TESTER_VERSION: &str = "1";

/// Safety bound on turns per match: well past anything a full board could
/// legitimately need, so a strategy that stalls (always skips) can't hang
/// the harness forever. Matches are aborted rather than counted as a win.
fn max_turns_for(width: u32, height: u32) -> u32 {
    (width * height).saturating_mul(4).max(64)
}

/// Outcome of one `run_self_play` invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub games: u32,
    pub wins: u32,
    pub aborted: u32,
    pub avg_turns: f64,
}

/// A fleet sized the same way `Configuration::classic` is, built against a
/// caller-supplied board size; `build()` rejects a board too small to hold
/// it, the same validation every other `Configuration` goes through.
fn fleet_config(width: u32, height: u32) -> Result<shared::Configuration, GameError> {
    let mut builder = ConfigurationBuilder::new("bot-test")
        .min_players(2)
        .max_players(2)
        .board_size(width, height);
    for (id, length) in [(b'A', 5), (b'B', 4), (b'C', 3), (b'D', 3), (b'E', 2)] {
        let ship = Ship::new(id, length)
            .expect("literal ship id/length in the fixed bot-test roster is always valid");
        builder = builder.add_ship(ship);
    }
    builder.build()
}

/// Plays one match between two fresh `EngineBot`s over the same strategy
/// template, returning `(winner is player "a", turn count, aborted)`.
fn play_one_match<S: TargetingStrategy + Clone>(
    title: impl Into<String>,
    template: &S,
    width: u32,
    height: u32,
) -> Result<(bool, u32, bool), GameError> {
    let config = fleet_config(width, height)?;

    let mut board_a = Board::new(1, "a".to_string(), &config);
    board_a.add_random_ships(&config, 0)?;
    let mut board_b = Board::new(2, "b".to_string(), &config);
    board_b.add_random_ships(&config, 0)?;

    let mut game = Game::new(config.clone(), title.into());
    game.add_board(board_a)?;
    game.add_board(board_b)?;
    game.start(false)?;

    let mut bot_a = EngineBot::new("a", template.clone());
    let mut bot_b = EngineBot::new("b", template.clone());
    bot_a.new_game(&config, "a");
    bot_b.new_game(&config, "b");
    for bot in [&mut bot_a, &mut bot_b] {
        bot.player_joined("a");
        bot.player_joined("b");
        bot.start_game(&game.order());
    }

    let cap = max_turns_for(width, height);
    let mut aborted = false;

    while !game.is_finished() {
        if game.turn_count() > cap {
            game.abort();
            aborted = true;
            break;
        }
        let to_move = game.board_to_move_name().unwrap_or_default().to_string();
        let (bot, opponent) = if to_move == "a" {
            (&mut bot_a, "b")
        } else {
            (&mut bot_b, "a")
        };
        if let Some(board) = game.board(opponent) {
            bot.update_board(opponent, board);
        }

        match bot.best_shot(&to_move) {
            Some((target, coord)) => {
                let target_idx = game
                    .board_index(&target)
                    .ok_or_else(|| GameError::InvalidState(format!("unknown target: {target}")))?;
                let (result, _) = game.boards_mut()[target_idx].shoot(coord);
                if matches!(result, ShootResult::Hit(_)) {
                    let shooter_idx = game.board_index(&to_move).unwrap();
                    game.boards_mut()[shooter_idx].inc_score(1);
                }
                let shooter_idx = game.board_index(&to_move).unwrap();
                game.boards_mut()[shooter_idx].inc_turns(1);
            }
            None => {
                let shooter_idx = game.board_index(&to_move).unwrap();
                game.boards_mut()[shooter_idx].inc_skips(1);
            }
        }
        game.next_turn();
    }

    let a_won = game
        .results()
        .into_iter()
        .find(|r| r.name == "a")
        .map(|r| r.first_place)
        .unwrap_or(false);
    Ok((a_won, game.turn_count(), aborted))
}

/// Runs `count` self-play matches of `template` against itself on a
/// `width`x`height` board, persisting the aggregate into
/// `test.<width>x<height>.<bot_name>-<TESTER_VERSION>` in `db`. `on_progress`
/// is called after every match (1-based index, total) so `--watch` can print
/// a running tally.
pub fn run_self_play<S: TargetingStrategy + Clone>(
    bot_name: &str,
    template: &S,
    width: u32,
    height: u32,
    count: u32,
    db: &FileSysDatabase,
    mut on_progress: impl FnMut(u32, u32, &TestOutcome),
) -> Result<TestOutcome, GameError> {
    let mut wins = 0u32;
    let mut aborted = 0u32;
    let mut total_turns: u64 = 0;

    for i in 0..count {
        let (a_won, turns, was_aborted) =
            play_one_match(format!("bot-test-{i}"), template, width, height)?;
        if was_aborted {
            aborted += 1;
        } else if a_won {
            wins += 1;
        }
        total_turns += turns as u64;

        let running = TestOutcome {
            games: i + 1,
            wins,
            aborted,
            avg_turns: total_turns as f64 / (i + 1) as f64,
        };
        on_progress(i + 1, count, &running);
    }

    let avg_turns = if count == 0 {
        0.0
    } else {
        total_turns as f64 / count as f64
    };
    let outcome = TestOutcome {
        games: count,
        wins,
        aborted,
        avg_turns,
    };

    let mut record = db.get(&test_record_id(width, height, bot_name, TESTER_VERSION))?;
    bot_test_record(&mut record, outcome.games, outcome.wins, outcome.avg_turns)?;
    db.sync(&record)?;

    Ok(outcome)
}
