//! # Integration Test Suite
//!
//! These tests validate that `shared`, `server`, and `client` work together
//! correctly: wire-protocol round trips, a full lobby-to-finish match driven
//! purely through `Game`, and an in-process bot targeting a live board via
//! `EngineBot`. Unlike the unit tests colocated with each module, these
//! exercise several types together the way a real match actually would.

use client::bot::{Bot, EngineBot};
use client::targeting::{Random, TargetingStrategy};
use server::game::{Game, GameStatus};
use shared::board::{Board, ShootResult};
use shared::configuration::ConfigurationBuilder;
use shared::geometry::{Coordinate, Direction};
use shared::ship::Ship;
use shared::{ClientMessage, ServerMessage};

fn classic_two_player_config() -> shared::Configuration {
    ConfigurationBuilder::new("friendly")
        .min_players(2)
        .max_players(2)
        .board_size(10, 10)
        .add_ship(Ship::new(b'A', 5).unwrap())
        .add_ship(Ship::new(b'B', 4).unwrap())
        .add_ship(Ship::new(b'C', 3).unwrap())
        .build()
        .unwrap()
}

/// Drives a full two-player match to completion purely through `Game` and
/// `Board`, the same state machine the server's network loop wraps. Alice's
/// ships are placed where the test can shoot them deterministically; Bob's
/// board starts empty so he dies as soon as one shot is resolved against it.
#[test]
fn full_match_runs_from_lobby_to_finish_through_game_state_machine() {
    let config = classic_two_player_config();
    let mut game = Game::new(config.clone(), "friendly");

    let mut alice = Board::new(1, "alice".to_string(), &config);
    alice.add_random_ships(&config, 0).unwrap();
    game.add_board(alice).unwrap();
    game.add_board(Board::new(2, "bob".to_string(), &config)).unwrap();

    assert!(game.can_start());
    game.start(false).unwrap();
    assert_eq!(game.status(), GameStatus::Running);
    assert_eq!(game.board_to_move_name(), Some("alice"));

    // Bob's board carries no ships, so one resolved shot already kills him
    // (hit_count() >= ship_point_count() == 0) and the match should finish.
    let bob_idx = game.board_index("bob").unwrap();
    let (result, _) = game.boards_mut()[bob_idx].shoot(Coordinate::new(1, 1));
    assert_eq!(result, ShootResult::Miss);
    game.boards_mut()[bob_idx].inc_turns(1);
    game.next_turn();

    assert!(game.board("bob").unwrap().is_dead());
    game.check_finished();
    assert!(game.is_finished());

    let results = game.results();
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.name == "alice"));
    assert!(results.iter().any(|r| r.name == "bob"));
}

/// A disconnect mid-match keeps the player's slot (so standings still
/// reference it) but the board counts as dead for termination purposes, and
/// `set_next_turn` can still target it per the resolved turn-advance rule.
#[test]
fn disconnect_during_match_marks_board_dead_without_removing_it() {
    let config = classic_two_player_config();
    let mut game = Game::new(config.clone(), "friendly");
    game.add_board(Board::new(1, "alice".to_string(), &config)).unwrap();
    game.add_board(Board::new(2, "bob".to_string(), &config)).unwrap();
    game.start(false).unwrap();

    let name = game.disconnect(2);
    assert_eq!(name, Some("bob".to_string()));
    assert_eq!(game.player_count(), 2);
    assert!(game.board("bob").unwrap().is_dead());
    assert!(!game.board("bob").unwrap().is_connected());

    game.set_next_turn("bob").unwrap();
    assert_eq!(game.board_to_move_name(), Some("bob"));
}

/// The wire protocol round-trips a realistic sequence of messages a single
/// turn would actually produce: a shot, the broadcast of both the target's
/// and shooter's boards (target first, per the pinned `B` then `H` order),
/// the hit notice, and the turn handoff.
#[test]
fn one_turn_message_sequence_round_trips_in_order() {
    let shoot = ClientMessage::Shoot {
        target: "bob".to_string(),
        x: 3,
        y: 4,
    };
    let encoded_shoot = shoot.encode().unwrap();
    assert_eq!(ClientMessage::decode(&encoded_shoot).unwrap(), shoot);

    let target_board = ServerMessage::Board {
        name: "bob".to_string(),
        status: String::new(),
        descriptor: "..........".repeat(10),
        score: 0,
        skips: 0,
    };
    let hit = ServerMessage::Hit {
        shooter: "alice".to_string(),
        target: "bob".to_string(),
        square: "X".to_string(),
    };
    let shooter_board = ServerMessage::Board {
        name: "alice".to_string(),
        status: String::new(),
        descriptor: "..........".repeat(10),
        score: 1,
        skips: 0,
    };
    let turn = ServerMessage::Turn { name: "bob".to_string() };

    let sequence = [&target_board, &hit, &shooter_board, &turn];
    for msg in sequence {
        let encoded = msg.encode().unwrap();
        assert_eq!(&ServerMessage::decode(&encoded).unwrap(), msg);
    }
}

/// `GameInfo` carries the boat roster as repeated `boat=` fields; a client
/// reading this before joining must recover exactly the ships the server
/// configured, in order, with no duplicate-count confusion from the
/// redundant `boats=` count field.
#[test]
fn game_info_preserves_boat_roster_for_a_joining_client() {
    let msg = ServerMessage::GameInfo {
        version: "1".to_string(),
        title: "friendly".to_string(),
        min_players: 2,
        max_players: 2,
        joined: 1,
        point_goal: 12,
        width: 10,
        height: 10,
        boats: vec!["A5".to_string(), "B4".to_string(), "C3".to_string()],
        started: false,
    };
    let encoded = msg.encode().unwrap();
    let decoded = ServerMessage::decode(&encoded).unwrap();
    match decoded {
        ServerMessage::GameInfo { boats, started, .. } => {
            assert_eq!(boats, vec!["A5", "B4", "C3"]);
            assert!(!started);
        }
        _ => panic!("expected GameInfo"),
    }
}

/// An `EngineBot` wrapping `Random` picks a live, connected opponent's board
/// to shoot at, exercising the same opponent-selection path the driver
/// relies on during `run_bot`.
#[test]
fn engine_bot_targets_a_live_opponent_board_reported_by_the_driver() {
    let config = classic_two_player_config();
    let mut bot = EngineBot::new("bot", Random::new());
    bot.new_game(&config, "bot");
    bot.player_joined("bot");
    bot.player_joined("opponent");
    bot.start_game(&["bot".to_string(), "opponent".to_string()]);

    let mut opponent_board = Board::new(0, "opponent".to_string(), &config);
    opponent_board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
    bot.update_board("opponent", &opponent_board);

    let shot = bot.best_shot("bot").expect("a live opponent should yield a shot");
    assert_eq!(shot.0, "opponent");
    assert!(config.ship_area().contains(shot.1));
}

/// A full ship-roster placement followed by a complete sink: each hit is
/// reflected in the masked descriptor the way a remote client would see it,
/// and the board only reports dead once the whole fleet is hit.
#[test]
fn sinking_the_full_fleet_marks_the_board_dead() {
    let config = ConfigurationBuilder::new("test")
        .min_players(2)
        .max_players(2)
        .board_size(5, 5)
        .add_ship(Ship::new(b'A', 2).unwrap())
        .build()
        .unwrap();
    let mut board = Board::new(1, "alice".to_string(), &config);
    board.place_ship(Ship::new(b'A', 2).unwrap(), Coordinate::new(1, 1), Direction::East);
    assert!(!board.is_dead());

    board.shoot(Coordinate::new(1, 1));
    assert!(!board.is_dead());
    board.shoot(Coordinate::new(2, 1));
    assert!(board.is_dead());

    let masked = board.masked_descriptor();
    assert_eq!(&masked[0..2], "XX");
}
