//! # Shared Battleship Library
//!
//! This module contains the data structures, wire protocol, and persistence
//! helpers used by both the game client and server. It serves as the
//! foundation for the networked multiplayer protocol and ensures both ends
//! of a connection agree on the same geometry, board rules, and message
//! shapes.
//!
//! ## Core Components
//!
//! ### Geometry
//! `Coordinate`, `Direction`, and `Rectangle` implement the 1-based grid
//! arithmetic every other module builds on.
//!
//! ### Ship + Board
//! `Ship` defines the descriptor alphabet and masking rules; `Board` owns a
//! player's ship area, resolves shots, and validates placements.
//!
//! ### Configuration
//! `Configuration` is the immutable set of game parameters (board size, ship
//! roster, player bounds) agreed on before a match starts.
//!
//! ### Wire protocol
//! `ClientMessage`/`ServerMessage` plus `encode`/`decode` implement the
//! line-oriented, `|`-delimited text codec described in the protocol
//! catalog. Unlike the predecessor of this workspace, the wire format here
//! is not `bincode` — it is deliberately a readable text protocol, so these
//! types serialize to/from `String` rather than to bytes via `serde`.
//!
//! ### Persistence
//! `database` implements the key=value flat-file record store the server
//! uses to persist per-player and per-game results.
//!
//! ## Design Philosophy
//!
//! ### Deterministic validation
//! Every type here validates on construction or on ingress (`Configuration`,
//! `Board::update_descriptor`) so that once a value exists it is safe to
//! operate on without re-checking invariants on every read.
//!
//! ### Errors, not panics
//! Fallible operations return `Result<_, GameError>`; nothing in this crate
//! calls `unwrap()`/`expect()` outside of tests.
//!
//! ## Usage Example
//!
//! ```rust
//! use shared::geometry::{Coordinate, Direction};
//! use shared::configuration::Configuration;
//! use shared::board::Board;
//!
//! let config = Configuration::classic();
//! let mut board = Board::new(1, "alice".to_string(), &config);
//! board.add_random_ships(&config, 0).unwrap();
//! assert_eq!(board.ship_point_count(), config.point_goal());
//! ```

pub mod board;
pub mod configuration;
pub mod database;
pub mod error;
pub mod geometry;
pub mod message;
pub mod ship;

pub use board::Board;
pub use configuration::Configuration;
pub use error::GameError;
pub use geometry::{Coordinate, Direction, Rectangle};
pub use message::{ClientMessage, ServerMessage};
pub use ship::Ship;
