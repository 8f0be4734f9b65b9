//! # Performance Benchmark Test Suite
//!
//! These benchmarks validate that the hot paths a live match exercises many
//! times per turn stay cheap: board scanning (`is_dead`/`hit_count`), random
//! fleet placement, wire-message encode/decode, and targeting-strategy
//! candidate scoring. None of these run on a network socket; they measure
//! the pure computation the server and bots do once a shot or a message
//! arrives.
//!
//! Targets are intentionally generous: this suite runs in `cargo test`, not
//! under a dedicated benchmark harness, so it asserts wall-clock ceilings
//! loose enough to absorb CI noise while still catching a real regression
//! (an accidentally quadratic board scan, a targeting strategy that stopped
//! terminating).

use std::time::Instant;

use client::targeting::{Heuristic, PlacementSearch, TargetingStrategy};
use server::game::Game;
use shared::board::Board;
use shared::configuration::ConfigurationBuilder;
use shared::geometry::{Coordinate, Direction};
use shared::ship::Ship;
use shared::{ClientMessage, ServerMessage};

fn classic_config() -> shared::Configuration {
    ConfigurationBuilder::new("bench")
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

/// `add_random_ships` retries up to 10,000 board attempts internally; on a
/// normally-proportioned board it should converge in a handful of attempts,
/// so 200 independent placements should stay well under a second.
#[test]
fn benchmark_random_fleet_placement() {
    let config = classic_config();
    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut board = Board::new(1, "alice".to_string(), &config);
        board.add_random_ships(&config, 0).unwrap();
        assert_eq!(board.ship_point_count(), config.point_goal());
    }

    let duration = start.elapsed();
    println!(
        "random fleet placement: {iterations} boards in {duration:?} ({:.2} us/board)",
        duration.as_micros() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 2000);
}

/// `is_dead`/`hit_count`/`ship_point_count` all scan the descriptor linearly
/// and are called after every shot resolution; on a 10x10 board this should
/// be microseconds even run tens of thousands of times.
#[test]
fn benchmark_board_liveness_scan() {
    let config = classic_config();
    let mut board = Board::new(1, "alice".to_string(), &config);
    board.add_random_ships(&config, 0).unwrap();

    let iterations = 100_000;
    let start = Instant::now();
    let mut dead_count = 0u32;
    for _ in 0..iterations {
        if board.is_dead() {
            dead_count += 1;
        }
    }
    let duration = start.elapsed();
    println!(
        "board liveness scan: {iterations} iterations in {duration:?} ({:.2} ns/iter)",
        duration.as_nanos() as f64 / iterations as f64
    );
    assert_eq!(dead_count, 0);
    assert!(duration.as_millis() < 200);
}

/// Encoding and decoding the wire protocol happens once per message on both
/// ends of every connection; this is the server's per-broadcast cost
/// multiplied by every connected session.
#[test]
fn benchmark_message_encode_decode_roundtrip() {
    let board_msg = ServerMessage::Board {
        name: "alice".to_string(),
        status: String::new(),
        descriptor: "A".repeat(100),
        score: 12,
        skips: 0,
    };
    let shoot_msg = ClientMessage::Shoot {
        target: "bob".to_string(),
        x: 7,
        y: 3,
    };

    let iterations = 50_000;
    let start = Instant::now();
    for _ in 0..iterations {
        let encoded = board_msg.encode().unwrap();
        let _ = ServerMessage::decode(&encoded).unwrap();
        let encoded = shoot_msg.encode().unwrap();
        let _ = ClientMessage::decode(&encoded).unwrap();
    }
    let duration = start.elapsed();
    println!(
        "message round trip: {iterations} pairs in {duration:?} ({:.2} us/pair)",
        duration.as_micros() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 2000);
}

/// `Heuristic::target` is called once per bot turn; this measures the cost
/// against a board that already carries a partially-hit ship, the branch
/// that walks `max_inline_hits`/`adjacent_hits` over every candidate cell.
#[test]
fn benchmark_heuristic_targeting_on_a_partially_hit_board() {
    let config = classic_config();
    let mut board = Board::new(0, "opponent".to_string(), &config);
    board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
    board.shoot(Coordinate::new(1, 1));
    board.shoot(Coordinate::new(2, 1));

    let mut strategy = Heuristic::new();
    let iterations = 5_000;
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = strategy.target(&board, &config);
    }
    let duration = start.elapsed();
    println!(
        "heuristic targeting: {iterations} calls in {duration:?} ({:.2} us/call)",
        duration.as_micros() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 3000);
}

/// `PlacementSearch` runs a per-cell DFS count over every remaining ship
/// length and orientation and caches the result by descriptor; the first
/// call against a fresh descriptor is the expensive one, so this benchmark
/// forces a cache miss every iteration by varying the board.
#[test]
fn benchmark_placement_search_cache_miss_cost() {
    let config = classic_config();
    let mut strategy = PlacementSearch::new();

    let iterations = 50;
    let start = Instant::now();
    for i in 0..iterations {
        let mut board = Board::new(0, "opponent".to_string(), &config);
        board.place_ship(Ship::new(b'A', 5).unwrap(), Coordinate::new(1, 1), Direction::East);
        board.shoot(Coordinate::new(1, 1));
        board.shoot(Coordinate::new(2, 1));
        // Vary one extra cell per iteration so the descriptor, and hence the
        // cache key, differs every time.
        let extra_x = 3 + (i % 6) as u32;
        board.shoot(Coordinate::new(extra_x, 9));
        let _ = strategy.target(&board, &config);
    }
    let duration = start.elapsed();
    println!(
        "placement search (cache miss): {iterations} calls in {duration:?} ({:.2} ms/call)",
        duration.as_millis() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 5000);
}

/// Stress test: a full two-player game played out turn by turn via `Game`
/// and `Board` alone (no sockets), repeated many times, to catch an
/// accidentally quadratic `check_finished`/`next_turn` path.
#[test]
fn stress_test_many_sequential_matches() {
    let config = classic_config();
    let iterations = 100;
    let start = Instant::now();

    for i in 0..iterations {
        let mut game = Game::new(config.clone(), format!("match-{i}"));
        let mut alice = Board::new(1, "alice".to_string(), &config);
        alice.add_random_ships(&config, 0).unwrap();
        game.add_board(alice).unwrap();
        game.add_board(Board::new(2, "bob".to_string(), &config)).unwrap();
        game.start(false).unwrap();

        let bob_idx = game.board_index("bob").unwrap();
        game.boards_mut()[bob_idx].shoot(Coordinate::new(1, 1));
        game.boards_mut()[bob_idx].inc_turns(1);
        game.next_turn();
        game.check_finished();
        assert!(game.is_finished());
    }

    let duration = start.elapsed();
    println!(
        "sequential matches: {iterations} games in {duration:?} ({:.2} ms/game)",
        duration.as_millis() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 5000);
}
